use anyhow as any;
use entity::{EntityId, Program, ScalarType, Session, Stage, VarModifiers};

/// ```text
/// struct MaterialParams { Texture2D diffuseMap; Texture2D specularMap; }
/// struct ModelParams { float4x4 modelMatrix; MaterialParams material; }
/// struct LightParams { float3 dir; float3 intensity; Texture2D shadowMap; }
///
/// ParameterBlock<ModelParams> gModel;
/// ParameterBlock<LightParams> gLight;
/// SamplerState gSampler;
/// float gTime;
///
/// float4 fragmentMain(float2 uv : TEXCOORD0, uniform float exposure)
///     : SV_Target;
/// ```
pub(crate) fn build(session: &mut Session) -> any::Result<Program> {
    let module = session.add_module("scene");
    let float = session.scalar(ScalarType::Float32);
    let float2 = session.vector(ScalarType::Float32, 2);
    let float3 = session.vector(ScalarType::Float32, 3);
    let float4 = session.vector(ScalarType::Float32, 4);
    let float4x4 = session.matrix(ScalarType::Float32, 4, 4);
    let tex = session.texture_2d();
    let sampler = session.sampler_state();

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

    let globals: [(&str, EntityId); 4] = [
        ("gModel", session.parameter_block(model)),
        ("gLight", session.parameter_block(light)),
        ("gSampler", sampler),
        ("gTime", float),
    ];
    for &(name, ty) in globals.iter() {
        session.add_global(module, name, ty, VarModifiers::empty());
    }

    let func = session.add_function(module, "fragmentMain", &[
        ("uv", float2, VarModifiers::empty()),
        ("exposure", float, VarModifiers::UNIFORM),
    ], Some(float4));
    let uv = session.func(func)?.params[0];
    session.set_semantic(uv, "TEXCOORD0")?;
    session.set_semantic(func, "SV_Target")?;
    let entry = session.add_entry_point(module, func, Stage::Fragment)?;
    Ok(session.link(&[module, entry])?)
}
