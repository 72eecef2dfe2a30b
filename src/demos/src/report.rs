use std::fmt::Write as _;

use layout::{
    EntryPointLayout, ResourceKind, TargetProgram, TypeLayout, VarLayout,
};

fn describe_var(var: &VarLayout) -> String {
    let mut out = String::new();
    for (kind, offset) in var.offsets().iter() {
        let size = var.type_layout().size(kind);
        let _ = match kind {
            ResourceKind::Bytes =>
                write!(out, " bytes {}+{}", offset.index, size),
            ResourceKind::RegisterSpace =>
                write!(out, " space {}", offset.index),
            _ => write!(out, " {} {} (space {}) x{}",
                kind, offset.index, offset.space, size),
        };
    }
    if let Some(semantic) = var.semantic() {
        let _ = write!(out, " : {}{} ({:?})",
            semantic.name, semantic.index, semantic.kind);
    }
    out
}

fn print_sets(layout: &TypeLayout) {
    for (i, set) in layout.descriptor_sets().iter().enumerate() {
        println!("  set {} (space offset {}):", i, set.space_offset);
        for range in set.ranges.iter() {
            println!("    {:<16} {:<22} index {} count {}",
                range.kind.to_string(), range.binding_type.to_string(),
                range.index_offset, range.descriptor_count);
        }
    }
}

fn print_entry_point(entry: &EntryPointLayout) {
    println!("entry point `{}` ({}):", entry.name(), entry.stage());
    for param in entry.params().iter() {
        println!("  {:<12}{}", param.name().unwrap_or("?"), describe_var(param));
    }
    if let Some(result) = entry.result_var_layout() {
        println!("  {:<12}{}", "<result>", describe_var(result));
    }
    print_sets(entry.type_layout());
}

pub(crate) fn print_program(program: &TargetProgram) {
    println!("== {} ==", program.desc().format);
    println!("globals:");
    for param in program.params().iter() {
        println!("  {:<12}{}", param.name().unwrap_or("?"), describe_var(param));
    }
    print_sets(program.type_layout());
    for entry in program.entry_points().iter() {
        print_entry_point(entry);
    }
}
