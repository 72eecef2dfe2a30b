use std::sync::Arc;

use entity::{EntityId, ScalarType, Session};
use loupe_layout::*;
use more_asserts::assert_ge;

mod common;

use common::*;

#[test]
fn consumed_kind_agrees_with_consumed_kinds() {
    init_logging();
    let mut session = Session::new();
    let zoo = zoo(&mut session);
    for target in targets(session) {
        for &ty in zoo.types.iter() {
            let layout = target.get_type_layout(ty, LayoutRules::Default)
                .unwrap();
            let kinds: Vec<_> = layout.consumed_kinds().collect();
            let expected = match kinds.len() {
                0 => ResourceKind::None,
                1 => kinds[0],
                _ => ResourceKind::Mixed,
            };
            assert_eq!(layout.consumed_kind(), expected, "{:?}", layout.ty());
        }
    }
}

#[test]
fn strides_cover_sizes() {
    init_logging();
    let mut session = Session::new();
    let zoo = zoo(&mut session);
    for target in targets(session) {
        for &rules in &[LayoutRules::Default, LayoutRules::ConstantBuffer,
            LayoutRules::StructuredBuffer]
        {
            for &ty in zoo.types.iter() {
                let layout = target.get_type_layout(ty, rules).unwrap();
                let kind = ResourceKind::Bytes;
                assert_ge!(layout.stride(kind), layout.size(kind));
                assert_eq!(layout.stride(kind) % layout.alignment(kind), 0);
            }
        }
    }
}

#[test]
fn layouts_are_idempotent() {
    init_logging();
    let mut session = Session::new();
    let zoo = zoo(&mut session);
    let mut target = target(session, TargetFormat::Vulkan);

    let first = target.get_type_layout(zoo.outer, LayoutRules::Default)
        .unwrap();
    let second = target.get_type_layout(zoo.outer, LayoutRules::Default)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    target.commit();
    let third = target.get_type_layout(zoo.outer, LayoutRules::Default)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &third));

    // A separate target computes equal values from scratch
    let other = Target::new(Arc::clone(target.session()),
        TargetDesc::new(TargetFormat::Vulkan));
    let fresh = other.get_type_layout(zoo.outer, LayoutRules::Default)
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(first.sizes(), fresh.sizes());
    for (a, b) in first.fields().iter().zip(fresh.fields().iter()) {
        assert_eq!(a.offsets(), b.offsets());
        assert_eq!(a.type_layout().sizes(), b.type_layout().sizes());
    }
    assert_eq!(first.descriptor_sets(), fresh.descriptor_sets());
}

#[test]
fn var_layouts_through_entities() {
    init_logging();
    let mut session = Session::new();
    let module = session.add_module("globals");
    let float = session.scalar(ScalarType::Float32);
    let time = session.add_global(module, "time", float, Default::default());
    let target = target(session, TargetFormat::D3D12);

    let layout = target.get_entity_layout(time, LayoutRules::Default).unwrap();
    let var = layout.as_var().unwrap();
    assert_eq!(var.name(), Some("time"));
    assert_eq!(var.type_layout().size_bytes(), Ok(4));
    assert!(target.get_entity_layout(module, LayoutRules::Default).is_err());
}

#[test]
fn nested_struct_offsets() {
    init_logging();
    let mut session = Session::new();
    let float = session.scalar(ScalarType::Float32);
    let a = session.add_struct(None, "A", &[("x", float)]);
    let b = session.add_struct(None, "B", &[("y", float), ("a", a)]);
    let c = session.add_struct(None, "C", &[("z", float), ("b", b)]);
    let cb = session.constant_buffer(c);
    let target = target(session, TargetFormat::D3D11);

    let a = target.get_type_layout(a, LayoutRules::ConstantBuffer).unwrap();
    assert_eq!(a.field(0).unwrap().offset_bytes(), Ok(0));

    let cb = target.get_type_layout(cb, LayoutRules::Default).unwrap();
    let x = VarLayoutChain::for_type(target.format(), cb)
        .field_by_name("b").unwrap()
        .field_by_name("a").unwrap()
        .field_by_name("x").unwrap();
    assert_eq!(x.location(ResourceKind::Bytes).index, 32);
}

#[test]
fn constant_buffer_element_offsets() {
    init_logging();
    let mut session = Session::new();
    let float = session.scalar(ScalarType::Float32);
    let tex = session.texture_2d();
    let a = session.add_struct(None, "A", &[
        ("x", float),
        ("t", tex),
        ("y", float),
    ]);
    let cb = session.constant_buffer(a);
    let textures = session.array(tex, 10);
    let s = session.add_struct(None, "S", &[("ts", textures), ("cb", cb)]);
    let target = target(session, TargetFormat::D3D11);

    let layout = target.get_type_layout(s, LayoutRules::Default).unwrap();
    let chain = VarLayoutChain::for_type(target.format(), layout)
        .field_by_name("cb").unwrap();
    let t = chain.field_by_name("t").unwrap();
    assert_eq!(t.location(ResourceKind::ShaderResource).index, 10);
    assert_eq!(chain.container_location(ResourceKind::ConstantBuffer)
        .unwrap().index, 0);
}

fn covered_fields(layout: &TypeLayout) -> Vec<EntityId> {
    layout.fields().iter()
        .enumerate()
        .filter(|&(i, _)| {
            let start = layout.binding_range_offset_for_field(i).unwrap();
            let end = layout.binding_range_offset_for_field(i + 1)
                .unwrap_or_else(|_| layout.binding_ranges().len());
            start < end
        })
        .filter_map(|(_, field)| field.var())
        .collect()
}

#[test]
fn binding_ranges_partition_fields() {
    init_logging();
    let mut session = Session::new();
    let zoo = zoo(&mut session);
    for target in targets(session) {
        for &ty in &[zoo.light, zoo.outer] {
            let layout = target.get_type_layout(ty, LayoutRules::Default)
                .unwrap();
            let expected: Vec<_> = layout.fields().iter()
                .filter(|field| {
                    let layout = field.type_layout();
                    layout.consumed_kinds().next().is_some()
                        && !layout.is_ordinary_data()
                })
                .filter_map(|field| field.var())
                .collect();
            assert_eq!(covered_fields(&layout), expected, "{}", target.format());
        }
    }
}

#[test]
fn nested_array_linearization() {
    init_logging();
    let mut session = Session::new();
    let tex = session.texture_2d();
    let row = session.array(tex, 4);
    let grid = session.array(row, 3);
    let flat = session.array(tex, 12);
    for target in targets(session) {
        let format = target.format();
        let chain = |ty| VarLayoutChain::for_type(format,
            target.get_type_layout(ty, LayoutRules::Default).unwrap());
        let nested = chain(grid).element(2).unwrap().element(1).unwrap();
        let flat = chain(flat).element(9).unwrap();
        assert_eq!(nested.array_index(), 9);
        assert_eq!(nested.array_index(), flat.array_index());
        for kind in flat.type_layout().consumed_kinds() {
            assert_eq!(nested.location(kind), flat.location(kind), "{}", format);
        }
    }
}

#[test]
fn chain_agrees_with_direct_fields() {
    init_logging();
    let mut session = Session::new();
    let zoo = zoo(&mut session);
    for target in targets(session) {
        let layout = target.get_type_layout(zoo.outer, LayoutRules::Default)
            .unwrap();
        let root = VarLayoutChain::for_type(target.format(), Arc::clone(&layout));
        for (i, field) in layout.fields().iter().enumerate() {
            let chained = root.field(i).unwrap();
            let direct = field.type_layout();
            let via_chain = chained.type_layout();
            assert!(Arc::ptr_eq(direct, via_chain));
            assert_eq!(via_chain.sizes(), direct.sizes());
            assert_eq!(via_chain.stride(ResourceKind::Bytes),
                direct.stride(ResourceKind::Bytes));
            assert_eq!(chained.var_layout().offsets(), field.offsets());
            for (kind, offset) in field.offsets().iter() {
                assert_eq!(chained.location(kind).index,
                    root.location(kind).index + offset.index);
            }
        }
    }
}

#[test]
fn vulkan_program_sets() {
    init_logging();
    let mut session = Session::new();
    let module = session.add_module("main");
    let tex = session.texture_2d();
    let float = session.scalar(ScalarType::Float32);
    let light = session.add_struct(Some(module), "Light", &[
        ("range", float),
        ("shadowMap", tex),
    ]);
    let block = session.parameter_block(light);
    session.add_global(module, "env", tex, Default::default());
    session.add_global(module, "light", block, Default::default());
    let program = session.link(&[module]).unwrap();
    let target = target(session, TargetFormat::Vulkan);
    let program = target.specialize_program(&program).unwrap();

    let shadow = program.chain()
        .field_by_name("light").unwrap()
        .field_by_name("shadowMap").unwrap()
        .absolute_var_layout();
    assert_eq!(shadow.binding_index(), Ok(1));
    assert_eq!(shadow.binding_space(), Ok(1));
    let env = program.find_param("env").unwrap();
    assert_eq!((env.binding_index(), env.binding_space()), (Ok(0), Ok(0)));
}

#[test]
fn d3d12_combined_sampler() {
    init_logging();
    let mut session = Session::new();
    let module = session.add_module("main");
    let combined = session.combined_texture_sampler(
        entity::ResourceShape::Texture2D);
    let samplers = session.array(combined, 2);
    session.add_global(module, "albedo", samplers, Default::default());
    let program = session.link(&[module]).unwrap();
    let target = target(session, TargetFormat::D3D12);
    let program = target.specialize_program(&program).unwrap();

    let range = &program.binding_ranges()[0];
    assert_eq!(range.binding_type, BindingType::CombinedTextureSampler);
    assert_eq!(range.binding_count, 2);
    let descriptors: Vec<_> = range.descriptor_ranges(program.type_layout())
        .iter()
        .map(|range| (range.binding_type, range.descriptor_count))
        .collect();
    assert_eq!(descriptors, [
        (BindingType::Texture, 2),
        (BindingType::Sampler, 2),
    ]);

    let albedo = program.chain().field(0).unwrap().element(1).unwrap();
    assert_eq!(albedo.location(ResourceKind::ShaderResource).index, 1);
    assert_eq!(albedo.location(ResourceKind::SamplerState).index, 1);
}

#[test]
fn navigation_errors() {
    init_logging();
    let mut session = Session::new();
    let zoo = zoo(&mut session);
    let target = target(session, TargetFormat::D3D11);
    let light = target.get_type_layout(zoo.light, LayoutRules::Default)
        .unwrap();

    assert_eq!(light.field(4).unwrap_err(),
        Error::FieldIndexOutOfRange { index: 4, count: 4 });
    assert_eq!(light.find_field_index("missing").unwrap_err(),
        Error::UnknownName("missing".to_owned()));
    assert!(matches!(light.size_bytes(),
        Err(Error::AmbiguousResourceKind { kind: ResourceKind::Mixed })));
    let chain = VarLayoutChain::for_type(target.format(), light);
    assert_eq!(chain.element(0).unwrap_err(), Error::NotAnArray);
    assert_eq!(chain.field(0).unwrap().field(0).unwrap_err(),
        Error::NotAnAggregate);
}

#[test]
fn concurrent_requests_share_layouts() {
    init_logging();
    let mut session = Session::new();
    let zoo = zoo(&mut session);
    let target = Arc::new(target(session, TargetFormat::D3D12));

    let threads: Vec<_> = (0..4).map(|_| {
        let target = Arc::clone(&target);
        let outer = zoo.outer;
        std::thread::spawn(move || {
            target.get_type_layout(outer, LayoutRules::Default).unwrap()
        })
    }).collect();
    let layouts: Vec<_> = threads.into_iter()
        .map(|thread| thread.join().unwrap())
        .collect();
    for layout in &layouts[1..] {
        assert!(Arc::ptr_eq(&layouts[0], layout));
    }
}
