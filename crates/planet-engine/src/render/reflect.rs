//! WGSL front-end: parse, validate and reflect one shader stage.
//!
//! Reflection extracts what linking needs: the entry point, the layout of the
//! `@group(0) @binding(0)` uniform struct, and the location-bound inputs and
//! outputs of the entry point.
//!
//! Resource bindings are restricted to the layout every backend provides:
//! the uniform block at `@group(0) @binding(0)`, `texture_2d<f32>` units at
//! `@group(1) @binding(0..=3)` and a filtering sampler at `@group(1) @binding(4)`.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{
    AddressSpace, Binding, Handle, ImageClass, ImageDimension, Module, Scalar, ScalarKind, Type,
    TypeInner, VectorSize,
};

use super::backend::ShaderStage;
use super::vocab::UniformKind;

/// A member of the reflected uniform block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformMember {
    pub name: String,
    pub offset: u32,
    /// `None` when the WGSL type has no vocabulary counterpart.
    pub kind: Option<UniformKind>,
    /// WGSL-like spelling of the declared type.
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformBlock {
    pub size: u32,
    pub members: Vec<UniformMember>,
}

/// A location-bound entry point input or output.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Varying {
    pub location: u32,
    pub name: Option<String>,
    pub ty: String,
}

/// Reflection of one validated stage.
#[derive(Debug, Clone)]
pub(crate) struct StageInfo {
    pub entry_point: String,
    pub uniform_block: Option<UniformBlock>,
    pub inputs: Vec<Varying>,
    pub outputs: Vec<Varying>,
}

/// Parses, validates and reflects `source` as a `stage` module.
///
/// The error is a rendered diagnostic suitable for logging as-is.
pub(crate) fn reflect_stage(stage: ShaderStage, source: &str) -> Result<StageInfo, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    check_resource_layout(&module)?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let Some(ep) = module.entry_points.iter().find(|ep| ep.stage == wanted) else {
        return Err(format!("module has no @{stage} entry point"));
    };

    let mut inputs = Vec::new();
    for arg in &ep.function.arguments {
        collect_varyings(&module, arg.ty, arg.binding.as_ref(), arg.name.as_deref(), &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = &ep.function.result {
        collect_varyings(&module, result.ty, result.binding.as_ref(), None, &mut outputs);
    }

    Ok(StageInfo {
        entry_point: ep.name.clone(),
        uniform_block: uniform_block(&module)?,
        inputs,
        outputs,
    })
}

fn uniform_block(module: &Module) -> Result<Option<UniformBlock>, String> {
    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Uniform {
            continue;
        }
        let Some(rb) = var.binding.as_ref() else { continue };
        if rb.group != 0 || rb.binding != 0 {
            continue;
        }

        let TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
            return Err("uniform at @group(0) @binding(0) must be a struct".to_string());
        };

        let members = members
            .iter()
            .filter_map(|m| {
                let name = m.name.clone()?;
                let inner = &module.types[m.ty].inner;
                Some(UniformMember {
                    name,
                    offset: m.offset,
                    kind: uniform_kind(inner),
                    ty: describe(inner),
                })
            })
            .collect();

        return Ok(Some(UniformBlock { size: *span, members }));
    }
    Ok(None)
}

fn check_resource_layout(module: &Module) -> Result<(), String> {
    for (_, var) in module.global_variables.iter() {
        let Some(rb) = var.binding.as_ref() else { continue };
        let inner = &module.types[var.ty].inner;
        let supported = match (rb.group, rb.binding) {
            (0, 0) => var.space == AddressSpace::Uniform,
            (1, 0..=3) => matches!(
                inner,
                TypeInner::Image {
                    dim: ImageDimension::D2,
                    arrayed: false,
                    class: ImageClass::Sampled { kind: ScalarKind::Float, multi: false },
                }
            ),
            (1, 4) => matches!(inner, TypeInner::Sampler { comparison: false }),
            _ => false,
        };
        if !supported {
            let name = var.name.as_deref().unwrap_or("<unnamed>");
            return Err(format!(
                "unsupported resource `{name}` at @group({}) @binding({})",
                rb.group, rb.binding
            ));
        }
    }
    Ok(())
}

fn collect_varyings(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    name: Option<&str>,
    out: &mut Vec<Varying>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(Varying {
            location: *location,
            name: name.map(str::to_owned),
            ty: describe(&module.types[ty].inner),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    collect_varyings(module, m.ty, m.binding.as_ref(), m.name.as_deref(), out);
                }
            }
        }
    }
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match *inner {
        TypeInner::Matrix { columns: VectorSize::Quad, rows: VectorSize::Quad, scalar }
            if scalar == Scalar::F32 =>
        {
            Some(UniformKind::Mat4)
        }
        TypeInner::Vector { size: VectorSize::Quad, scalar } if scalar == Scalar::F32 => {
            Some(UniformKind::Vec4)
        }
        TypeInner::Vector { size: VectorSize::Tri, scalar } if scalar == Scalar::F32 => {
            Some(UniformKind::Vec3)
        }
        TypeInner::Vector { size: VectorSize::Bi, scalar } if scalar == Scalar::I32 => {
            Some(UniformKind::IVec2)
        }
        TypeInner::Scalar(scalar) if scalar == Scalar::I32 => Some(UniformKind::Int),
        TypeInner::Scalar(scalar) if scalar == Scalar::F32 => Some(UniformKind::Float),
        _ => None,
    }
}

fn describe(inner: &TypeInner) -> String {
    match *inner {
        TypeInner::Scalar(s) => scalar_name(s).to_string(),
        TypeInner::Vector { size, scalar } => format!("vec{}<{}>", dim(size), scalar_name(scalar)),
        TypeInner::Matrix { columns, rows, scalar } => {
            format!("mat{}x{}<{}>", dim(columns), dim(rows), scalar_name(scalar))
        }
        _ => "<composite>".to_string(),
    }
}

fn dim(size: VectorSize) -> u8 {
    match size {
        VectorSize::Bi => 2,
        VectorSize::Tri => 3,
        VectorSize::Quad => 4,
    }
}

fn scalar_name(s: Scalar) -> &'static str {
    match (s.kind, s.width) {
        (ScalarKind::Float, 4) => "f32",
        (ScalarKind::Float, 2) => "f16",
        (ScalarKind::Float, 8) => "f64",
        (ScalarKind::Sint, 4) => "i32",
        (ScalarKind::Uint, 4) => "u32",
        (ScalarKind::Bool, _) => "bool",
        _ => "scalar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    time: i32,
    water_color: vec3<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) nor: vec4<f32>,
};

@vertex
fn vs_main(@location(0) vs_pos: vec4<f32>, @location(1) vs_nor: vec4<f32>) -> VsOut {
    var out: VsOut;
    out.clip = u.view_proj * u.model * vs_pos;
    out.nor = vs_nor * f32(u.time) + vec4<f32>(u.water_color, 0.0);
    return out;
}
"#;

    #[test]
    fn reflects_uniform_offsets() {
        let info = reflect_stage(ShaderStage::Vertex, VS).unwrap();
        let block = info.uniform_block.unwrap();
        let offsets: Vec<(&str, u32)> =
            block.members.iter().map(|m| (m.name.as_str(), m.offset)).collect();
        // vec3 aligns to 16 bytes after the i32 at 128.
        assert_eq!(offsets, vec![("model", 0), ("view_proj", 64), ("time", 128), ("water_color", 144)]);
        assert_eq!(block.size, 160);
        assert_eq!(block.members[3].kind, Some(UniformKind::Vec3));
    }

    #[test]
    fn reflects_vertex_inputs_and_struct_outputs() {
        let info = reflect_stage(ShaderStage::Vertex, VS).unwrap();
        assert_eq!(info.entry_point, "vs_main");
        let inputs: Vec<(Option<&str>, u32)> =
            info.inputs.iter().map(|v| (v.name.as_deref(), v.location)).collect();
        assert_eq!(inputs, vec![(Some("vs_pos"), 0), (Some("vs_nor"), 1)]);
        assert_eq!(info.outputs.len(), 1);
        assert_eq!(info.outputs[0].ty, "vec4<f32>");
    }

    #[test]
    fn wrong_stage_is_rejected() {
        let err = reflect_stage(ShaderStage::Fragment, VS).unwrap_err();
        assert!(err.contains("fragment"), "{err}");
    }

    #[test]
    fn syntax_errors_carry_a_diagnostic() {
        let err = reflect_stage(ShaderStage::Vertex, "fn broken( {").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn texture_units_follow_the_fixed_layout() {
        let ok = r#"
@group(1) @binding(0) var tex0: texture_2d<f32>;
@group(1) @binding(4) var samp: sampler;
@fragment fn fs_main() -> @location(0) vec4<f32> {
    return textureSample(tex0, samp, vec2<f32>(0.5, 0.5));
}
"#;
        assert!(reflect_stage(ShaderStage::Fragment, ok).is_ok());

        let bad = ok.replace("@group(1) @binding(0)", "@group(2) @binding(0)");
        let err = reflect_stage(ShaderStage::Fragment, &bad).unwrap_err();
        assert!(err.contains("tex0"), "{err}");
    }

    #[test]
    fn module_without_uniforms_has_no_block() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let info = reflect_stage(ShaderStage::Fragment, src).unwrap();
        assert!(info.uniform_block.is_none());
        assert_eq!(info.outputs[0].location, 0);
    }
}
