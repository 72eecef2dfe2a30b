use std::sync::Arc;

use entity::{EntityId, ScalarType, Session};

use crate::*;

pub(crate) fn target(session: Session, format: TargetFormat) -> Target {
    Target::new(Arc::new(session), TargetDesc::new(format))
}

pub(crate) fn float(session: &mut Session) -> EntityId {
    session.scalar(ScalarType::Float32)
}

/// `struct A { float x; }`, `struct B { float y; A a; }`,
/// `struct C { float z; B b; }`
pub(crate) fn nested_structs(session: &mut Session) -> [EntityId; 3] {
    let float = float(session);
    let a = session.add_struct(None, "A", &[("x", float)]);
    let b = session.add_struct(None, "B", &[("y", float), ("a", a)]);
    let c = session.add_struct(None, "C", &[("z", float), ("b", b)]);
    [a, b, c]
}

/// `struct Light { float3 intensity; Texture2D shadowMap; float radius;
/// Texture2D cookieMap; }`
pub(crate) fn light(session: &mut Session) -> EntityId {
    let float = float(session);
    let float3 = session.vector(ScalarType::Float32, 3);
    let tex = session.texture_2d();
    session.add_struct(None, "Light", &[
        ("intensity", float3),
        ("shadowMap", tex),
        ("radius", float),
        ("cookieMap", tex),
    ])
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Scene {
    pub(crate) module: EntityId,
    pub(crate) material: EntityId,
    pub(crate) model: EntityId,
    pub(crate) light: EntityId,
    pub(crate) g_model: EntityId,
    pub(crate) g_light: EntityId,
}

/// ```text
/// struct MaterialParams { Texture2D diffuseMap; Texture2D specularMap; }
/// struct ModelParams { float4x4 modelMatrix; MaterialParams material; }
/// struct LightParams { float3 dir; float3 intensity; Texture2D shadowMap; }
/// ParameterBlock<ModelParams> gModel;
/// ParameterBlock<LightParams> gLight;
/// ```
pub(crate) fn scene(session: &mut Session) -> Scene {
    let module = session.add_module("scene");
    let tex = session.texture_2d();
    let float3 = session.vector(ScalarType::Float32, 3);
    let float4x4 = session.matrix(ScalarType::Float32, 4, 4);

    let material = session.add_struct(Some(module), "MaterialParams", &[
        ("diffuseMap", tex),
        ("specularMap", tex),
    ]);
    let model = session.add_struct(Some(module), "ModelParams", &[
        ("modelMatrix", float4x4),
        ("material", material),
    ]);
    let light = session.add_struct(Some(module), "LightParams", &[
        ("dir", float3),
        ("intensity", float3),
        ("shadowMap", tex),
    ]);

    let model_block = session.parameter_block(model);
    let light_block = session.parameter_block(light);
    let g_model = session.add_global(
        module, "gModel", model_block, Default::default());
    let g_light = session.add_global(
        module, "gLight", light_block, Default::default());
    Scene { module, material, model, light, g_model, g_light }
}
