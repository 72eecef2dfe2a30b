#![allow(dead_code)]

use std::sync::Arc;

use entity::{EntityId, ScalarType, Session};
use loupe_layout::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn targets(session: Session) -> Vec<Target> {
    let session = Arc::new(session);
    [TargetFormat::D3D11, TargetFormat::D3D12, TargetFormat::Vulkan,
        TargetFormat::Cpu]
        .iter()
        .map(|&format| Target::new(Arc::clone(&session), TargetDesc::new(format)))
        .collect()
}

pub fn target(session: Session, format: TargetFormat) -> Target {
    Target::new(Arc::new(session), TargetDesc::new(format))
}

/// A grab bag of types covering every layout kind.
pub struct Zoo {
    pub types: Vec<EntityId>,
    pub light: EntityId,
    pub outer: EntityId,
}

pub fn zoo(session: &mut Session) -> Zoo {
    let float = session.scalar(ScalarType::Float32);
    let int = session.scalar(ScalarType::Int32);
    let half3 = session.vector(ScalarType::Float16, 3);
    let float4 = session.vector(ScalarType::Float32, 4);
    let float3x3 = session.matrix(ScalarType::Float32, 3, 3);
    let tex = session.texture_2d();
    let sampler = session.sampler_state();
    let textures = session.array(tex, 6);
    let floats = session.array(float, 5);
    let light = session.add_struct(None, "Light", &[
        ("color", float4),
        ("shadowMap", tex),
        ("range", float),
        ("cookieMap", tex),
    ]);
    let mixed = session.add_struct(None, "Mixed", &[
        ("a", int),
        ("b", half3),
        ("c", float3x3),
        ("d", floats),
        ("e", sampler),
        ("f", textures),
    ]);
    let lights = session.array(light, 3);
    let cb = session.constant_buffer(light);
    let block = session.parameter_block(mixed);
    let outer = session.add_struct(None, "Outer", &[
        ("x", float),
        ("lights", lights),
        ("cb", cb),
        ("block", block),
        ("y", float4),
    ]);
    let empty = session.add_struct(None, "Empty", &[]);
    Zoo {
        types: vec![
            float, int, half3, float4, float3x3, tex, sampler, textures, floats,
            light, mixed, lights, cb, block, outer, empty,
        ],
        light,
        outer,
    }
}
