//! Lays out a small scene program for every target and binds a few of
//! its parameters through a shader cursor.
//!
//! Usage: `loupe-demos [d3d11|d3d12|vulkan|cpu]`

use std::sync::Arc;

use anyhow::{self as any, anyhow, Context};
use cursor::{
    BindableResource, DescriptorWrite, ParameterSink, ShaderCursor,
};
use entity::Session;
use layout::{BindingType, Target, TargetDesc, TargetFormat, TargetProgram};
use log::{debug, info, warn};

mod report;
mod scene;

const ALL_FORMATS: [TargetFormat; 4] = [
    TargetFormat::D3D11,
    TargetFormat::D3D12,
    TargetFormat::Vulkan,
    TargetFormat::Cpu,
];

fn parse_format(name: &str) -> any::Result<TargetFormat> {
    match name.to_ascii_lowercase().as_str() {
        "d3d11" => Ok(TargetFormat::D3D11),
        "d3d12" => Ok(TargetFormat::D3D12),
        "vulkan" => Ok(TargetFormat::Vulkan),
        "cpu" => Ok(TargetFormat::Cpu),
        _ => Err(anyhow!("unknown target `{}`", name)),
    }
}

#[derive(Debug)]
struct Texture(&'static str);

impl BindableResource for Texture {
    fn binding_type(&self) -> BindingType {
        BindingType::Texture
    }
}

/// Collects ordinary data into a staging buffer and logs descriptor
/// writes.
#[derive(Debug, Default)]
struct Staging {
    data: Vec<u8>,
    writes: usize,
    /// Set when a write would extend past the addressable range.
    overflowed: bool,
}

impl ParameterSink<usize> for Staging {
    fn write_bytes(&mut self, offset: u32, data: &[u8]) {
        let start = offset as usize;
        let end = match start.checked_add(data.len()) {
            Some(end) => end,
            None => {
                warn!("dropping {} bytes written at {}", data.len(), offset);
                self.overflowed = true;
                return;
            },
        };
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(data);
    }

    fn write_descriptor(&mut self, write: DescriptorWrite<'_, usize>) {
        info!("set {}: {} {}[{}] <- {:?}", write.set, write.binding_type,
            write.binding, write.array_element, write.resource);
        self.writes += 1;
    }
}

/// Fills in the light block the way a renderer would each frame.
fn bind_light(program: &TargetProgram) -> any::Result<()> {
    let sets: Vec<usize> = (0..program.descriptor_sets().len()).collect();
    let root = ShaderCursor::new(program.type_layout(), &sets);
    let light = root.into_field_by_name("gLight")?.sub_object()?;
    let space = light.space_offset() as usize;
    debug!("gLight: binding range {}, space offset {}",
        light.range.binding_range_index, space);

    let block = light.type_layout();
    let sets: Vec<usize> = (0..block.descriptor_sets().len())
        .map(|i| space + i)
        .collect();
    let cursor = ShaderCursor::new(block, &sets);
    let mut staging = Staging::default();

    let intensity: Vec<u8> = [1.0f32, 0.9, 0.8].iter()
        .flat_map(|x| x.to_ne_bytes().to_vec())
        .collect();
    cursor.into_field_by_name("intensity")?
        .write_ordinary_bytes(&mut staging, &intensity)?;
    cursor.into_field_by_name("shadowMap")?
        .write_binding(&mut staging, &Texture("shadow.png"))?;
    any::ensure!(!staging.overflowed, "staged data overflowed");

    println!("gLight: {} bytes staged, {} descriptor writes",
        staging.data.len(), staging.writes);
    Ok(())
}

fn run() -> any::Result<()> {
    let formats = match std::env::args().nth(1) {
        Some(name) => vec![parse_format(&name)?],
        None => ALL_FORMATS.to_vec(),
    };

    let mut session = Session::new();
    let program = scene::build(&mut session).context("building scene")?;
    let session = Arc::new(session);

    for format in formats {
        let target = Target::new(Arc::clone(&session), TargetDesc::new(format));
        let program = target.specialize_program(&program)
            .with_context(|| format!("laying out program for {}", format))?;
        report::print_program(&program);
        if format != TargetFormat::Cpu {
            bind_light(&program)
                .with_context(|| format!("binding gLight on {}", format))?;
        }
        debug!("{}: {} cached layouts", format, target.cached_layout_count());
    }

    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}
