use std::collections::BTreeMap;

use glam::{IVec2, Mat4, Vec3, Vec4};

use super::backend::{Backend, ProgramDesc, ProgramId, ShaderStage, StageDesc};
use super::context::RenderContext;
use super::controls::{unit_rgb, ControlBundle};
use super::drawable::Drawable;
use super::reflect::{reflect_stage, StageInfo, UniformMember};
use super::vocab::{AttributeName, UniformKind, UniformName};

/// Failure to build a shader program. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("program `{label}` failed to link:\n{log}")]
    Link { label: String, log: String },
}

/// One validated stage.
#[derive(Debug, Clone)]
pub struct Shader {
    stage: ShaderStage,
    source: String,
    info: StageInfo,
}

impl Shader {
    /// Parses and validates `source` as a `stage` module.
    pub fn compile(stage: ShaderStage, source: impl Into<String>) -> Result<Self, ShaderError> {
        let source = source.into();
        let info = reflect_stage(stage, &source).map_err(|log| ShaderError::Compile { stage, log })?;
        Ok(Self { stage, source, info })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.info.entry_point
    }
}

/// Resolved location of a uniform inside a program's uniform block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Resolved vertex input location.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeSlot {
    pub location: u32,
}

/// A linked program and its slot table.
///
/// Slots are resolved once in [`ShaderProgram::link`]; an absent slot turns
/// the matching setter into a no-op. The program handle is owned exclusively
/// by this value.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    uniforms: [Option<UniformSlot>; UniformName::COUNT],
    attributes: [Option<AttributeSlot>; 3],
    uniform_size: u32,
}

impl ShaderProgram {
    /// Links a vertex and a fragment stage into a program.
    ///
    /// Fails when the stages disagree on the uniform block layout, when a
    /// fragment input is not produced by the vertex stage, or when a
    /// vocabulary name is declared with the wrong type.
    pub fn link<B: Backend>(
        ctx: &mut RenderContext<B>,
        label: &str,
        vertex: &Shader,
        fragment: &Shader,
    ) -> Result<Self, ShaderError> {
        let link_err = |log: String| ShaderError::Link {
            label: label.to_string(),
            log,
        };

        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err(link_err(format!(
                "expected vertex + fragment stages, got {} + {}",
                vertex.stage, fragment.stage
            )));
        }

        let (members, uniform_size) = merge_uniform_blocks(&vertex.info, &fragment.info).map_err(link_err)?;
        check_interface(&vertex.info, &fragment.info).map_err(link_err)?;

        let mut uniforms = [None; UniformName::COUNT];
        for member in members.values() {
            let Some(name) = UniformName::from_ident(&member.name) else {
                log::debug!("program `{label}`: uniform `{}` is outside the vocabulary", member.name);
                continue;
            };
            if member.kind != Some(name.kind()) {
                return Err(link_err(format!(
                    "uniform `{}` declared as {}, expected {}",
                    member.name,
                    member.ty,
                    name.kind().wgsl()
                )));
            }
            uniforms[name.index()] = Some(UniformSlot {
                offset: member.offset,
                kind: name.kind(),
            });
        }

        let mut attributes = [None; 3];
        let mut attribute_locations = Vec::with_capacity(vertex.info.inputs.len());
        for input in &vertex.info.inputs {
            let ident = input.name.as_deref().unwrap_or("<unnamed>");
            let Some(attr) = AttributeName::from_ident(ident) else {
                return Err(link_err(format!(
                    "vertex input `{ident}` at location {} is not a known attribute",
                    input.location
                )));
            };
            if input.ty != "vec4<f32>" {
                return Err(link_err(format!(
                    "attribute `{ident}` declared as {}, expected vec4<f32>",
                    input.ty
                )));
            }
            attributes[attr.index()] = Some(AttributeSlot { location: input.location });
            attribute_locations.push(input.location);
        }
        attribute_locations.sort_unstable();

        let desc = ProgramDesc {
            label,
            vertex: StageDesc {
                source: &vertex.source,
                entry_point: &vertex.info.entry_point,
            },
            fragment: StageDesc {
                source: &fragment.source,
                entry_point: &fragment.info.entry_point,
            },
            uniform_size,
            attribute_locations,
        };
        let id = ctx.backend_mut().create_program(&desc).map_err(link_err)?;

        let resolved = uniforms.iter().filter(|s| s.is_some()).count();
        log::info!("linked program `{label}` ({resolved} uniforms, {uniform_size} byte block)");

        Ok(Self {
            id,
            label: label.to_string(),
            uniforms,
            attributes,
            uniform_size,
        })
    }

    /// Compiles both stages and links them.
    pub fn from_sources<B: Backend>(
        ctx: &mut RenderContext<B>,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let vertex = Shader::compile(ShaderStage::Vertex, vertex_source)?;
        let fragment = Shader::compile(ShaderStage::Fragment, fragment_source)?;
        Self::link(ctx, label, &vertex, &fragment)
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn uniform_size(&self) -> u32 {
        self.uniform_size
    }

    pub fn uniform_slot(&self, name: UniformName) -> Option<UniformSlot> {
        self.uniforms[name.index()]
    }

    pub fn attribute_slot(&self, name: AttributeName) -> Option<AttributeSlot> {
        self.attributes[name.index()]
    }

    /// Whether the program declares `name`.
    pub fn declares(&self, name: UniformName) -> bool {
        self.uniform_slot(name).is_some()
    }

    /// Activates this program; elided when it is already active.
    pub fn bind<B: Backend>(&self, ctx: &mut RenderContext<B>) {
        ctx.use_program(self.id);
    }

    fn write<B: Backend>(&self, ctx: &mut RenderContext<B>, name: UniformName, kind: UniformKind, bytes: &[u8]) {
        self.bind(ctx);
        if name.kind() != kind {
            log::warn!(
                "program `{}`: `{}` is {}, ignoring {} write",
                self.label,
                name.ident(),
                name.kind().wgsl(),
                kind.wgsl()
            );
            return;
        }
        let Some(slot) = self.uniforms[name.index()] else {
            return;
        };
        ctx.backend_mut().upload_uniform(slot.offset, bytes);
    }

    /// Writes a matrix uniform.
    ///
    /// For [`UniformName::ModelInvTr`], `m` is the model matrix and the
    /// uploaded value is `inverse(transpose(m))`.
    pub fn set_matrix<B: Backend>(&self, ctx: &mut RenderContext<B>, name: UniformName, m: Mat4) {
        let m = if name == UniformName::ModelInvTr {
            m.transpose().inverse()
        } else {
            m
        };
        self.write(ctx, name, UniformKind::Mat4, bytemuck::bytes_of(&m.to_cols_array()));
    }

    pub fn set_vec4<B: Backend>(&self, ctx: &mut RenderContext<B>, name: UniformName, v: Vec4) {
        self.write(ctx, name, UniformKind::Vec4, bytemuck::bytes_of(&v.to_array()));
    }

    pub fn set_vec3<B: Backend>(&self, ctx: &mut RenderContext<B>, name: UniformName, v: Vec3) {
        self.write(ctx, name, UniformKind::Vec3, bytemuck::bytes_of(&v.to_array()));
    }

    pub fn set_ivec2<B: Backend>(&self, ctx: &mut RenderContext<B>, name: UniformName, v: IVec2) {
        self.write(ctx, name, UniformKind::IVec2, bytemuck::bytes_of(&v.to_array()));
    }

    pub fn set_int<B: Backend>(&self, ctx: &mut RenderContext<B>, name: UniformName, v: i32) {
        self.write(ctx, name, UniformKind::Int, bytemuck::bytes_of(&v));
    }

    pub fn set_float<B: Backend>(&self, ctx: &mut RenderContext<B>, name: UniformName, v: f32) {
        self.write(ctx, name, UniformKind::Float, bytemuck::bytes_of(&v));
    }

    /// Uploads the model matrix and, when declared, its inverse transpose.
    pub fn set_model_matrix<B: Backend>(&self, ctx: &mut RenderContext<B>, model: Mat4) {
        self.set_matrix(ctx, UniformName::Model, model);
        if self.declares(UniformName::ModelInvTr) {
            self.set_matrix(ctx, UniformName::ModelInvTr, model);
        }
    }

    pub fn set_view_proj_matrix<B: Backend>(&self, ctx: &mut RenderContext<B>, vp: Mat4) {
        self.set_matrix(ctx, UniformName::ViewProj, vp);
    }

    pub fn set_inv_view_proj_matrix<B: Backend>(&self, ctx: &mut RenderContext<B>, ivp: Mat4) {
        self.set_matrix(ctx, UniformName::InvViewProj, ivp);
    }

    pub fn set_screen_dimensions<B: Backend>(&self, ctx: &mut RenderContext<B>, width: u32, height: u32) {
        let dims = IVec2::new(width.min(i32::MAX as u32) as i32, height.min(i32::MAX as u32) as i32);
        self.set_ivec2(ctx, UniformName::Dimensions, dims);
    }

    pub fn set_geometry_color<B: Backend>(&self, ctx: &mut RenderContext<B>, color: Vec4) {
        self.set_vec4(ctx, UniformName::Color, color);
    }

    pub fn set_eye_position<B: Backend>(&self, ctx: &mut RenderContext<B>, eye: Vec4) {
        self.set_vec4(ctx, UniformName::Eye, eye);
    }

    /// Frame counter, not wall time.
    pub fn set_time<B: Backend>(&self, ctx: &mut RenderContext<B>, frame: i32) {
        self.set_int(ctx, UniformName::Time, frame);
    }

    /// Tells the program that texture unit `unit` (0..=3) is bound.
    ///
    /// Units outside that range are ignored.
    pub fn set_texture<B: Backend>(&self, ctx: &mut RenderContext<B>, unit: u32) {
        self.bind(ctx);
        let Some(&name) = UniformName::TEXTURE_UNITS.get(unit as usize) else {
            return;
        };
        self.set_int(ctx, name, unit as i32);
    }

    /// Uploads every declared control uniform from `bundle`, colors in 0–1.
    pub fn push_controls<B: Backend>(&self, ctx: &mut RenderContext<B>, bundle: &ControlBundle) {
        self.set_float(ctx, UniformName::WaterOpacity, bundle.water.opacity);
        self.set_float(ctx, UniformName::WaterLevel, bundle.water.level);
        self.set_vec3(ctx, UniformName::WaterColor, unit_rgb(bundle.water.color));
        self.set_vec3(ctx, UniformName::BedrockColor1, unit_rgb(bundle.bedrock_color1));
        self.set_vec3(ctx, UniformName::BedrockColor2, unit_rgb(bundle.bedrock_color2));
        self.set_vec3(ctx, UniformName::SandColor, unit_rgb(bundle.sand_color));
        self.set_float(ctx, UniformName::ShoreLevel, bundle.shore_level);
        self.set_float(ctx, UniformName::Elevation, bundle.elevation);
        self.set_float(ctx, UniformName::NoiseScale, bundle.noise_scale);
    }

    /// Issues one indexed draw of `drawable` with this program.
    ///
    /// Attributes enabled here are disabled again before returning, on every path.
    pub fn draw<B: Backend>(&self, ctx: &mut RenderContext<B>, drawable: &dyn Drawable) {
        self.bind(ctx);

        let mut enabled = EnabledAttributes::new(ctx.backend_mut());
        let streams = [
            (AttributeName::Position, drawable.positions()),
            (AttributeName::Normal, drawable.normals()),
        ];
        for (name, buffer) in streams {
            if let (Some(slot), Some(buffer)) = (self.attributes[name.index()], buffer) {
                enabled.enable(slot.location, buffer);
            }
        }

        let count = drawable.element_count();
        if count == 0 {
            return;
        }

        enabled.backend.bind_index_buffer(drawable.indices());
        enabled.backend.draw_elements(drawable.topology(), count);
    }
}

/// Disables every attribute it enabled when dropped.
struct EnabledAttributes<'a, B: Backend> {
    backend: &'a mut B,
    locations: [Option<u32>; 3],
}

impl<'a, B: Backend> EnabledAttributes<'a, B> {
    fn new(backend: &'a mut B) -> Self {
        Self {
            backend,
            locations: [None; 3],
        }
    }

    fn enable(&mut self, location: u32, buffer: super::backend::BufferId) {
        self.backend.enable_attribute(location, buffer);
        if let Some(free) = self.locations.iter_mut().find(|l| l.is_none()) {
            *free = Some(location);
        }
    }
}

impl<B: Backend> Drop for EnabledAttributes<'_, B> {
    fn drop(&mut self) {
        for location in self.locations.iter().flatten() {
            self.backend.disable_attribute(*location);
        }
    }
}

fn merge_uniform_blocks(
    vertex: &StageInfo,
    fragment: &StageInfo,
) -> Result<(BTreeMap<String, UniformMember>, u32), String> {
    let mut merged: BTreeMap<String, UniformMember> = BTreeMap::new();
    let mut size = 0;

    for block in [&vertex.uniform_block, &fragment.uniform_block].into_iter().flatten() {
        size = size.max(block.size);
        for member in &block.members {
            match merged.get(&member.name) {
                Some(existing) if existing.offset != member.offset || existing.ty != member.ty => {
                    return Err(format!(
                        "uniform `{}` differs between stages ({} at {} vs {} at {})",
                        member.name, existing.ty, existing.offset, member.ty, member.offset
                    ));
                }
                Some(_) => {}
                None => {
                    merged.insert(member.name.clone(), member.clone());
                }
            }
        }
    }

    Ok((merged, size))
}

fn check_interface(vertex: &StageInfo, fragment: &StageInfo) -> Result<(), String> {
    for input in &fragment.inputs {
        let name = input.name.as_deref().unwrap_or("<unnamed>");
        match vertex.outputs.iter().find(|o| o.location == input.location) {
            None => {
                return Err(format!(
                    "fragment input `{name}` at location {} is not written by the vertex stage",
                    input.location
                ));
            }
            Some(out) if out.ty != input.ty => {
                return Err(format!(
                    "location {}: vertex writes {}, fragment reads {}",
                    input.location, out.ty, input.ty
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{BufferId, Topology};
    use crate::render::recording::{Call, RecordingBackend};

    const VS: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    model_inv_tr: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    time: i32,
    texture0: i32,
    water_opacity: f32,
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
    out.nor = u.model_inv_tr * vs_nor;
    return out;
}
"#;

    const FS: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    model_inv_tr: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    time: i32,
    texture0: i32,
    water_opacity: f32,
    water_color: vec3<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;

@fragment
fn fs_main(@location(0) nor: vec4<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(u.water_color * nor.xyz, u.water_opacity);
}
"#;

    struct Quad {
        normals: bool,
        count: u32,
    }

    impl Drawable for Quad {
        fn positions(&self) -> Option<BufferId> {
            Some(BufferId(10))
        }
        fn normals(&self) -> Option<BufferId> {
            self.normals.then_some(BufferId(11))
        }
        fn indices(&self) -> BufferId {
            BufferId(12)
        }
        fn element_count(&self) -> u32 {
            self.count
        }
        fn topology(&self) -> Topology {
            Topology::Triangles
        }
        fn model_matrix(&self) -> Mat4 {
            Mat4::IDENTITY
        }
        fn set_model_matrix(&mut self, _model: Mat4) {}
    }

    fn linked() -> (RenderContext<RecordingBackend>, ShaderProgram) {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let program = ShaderProgram::from_sources(&mut ctx, "test", VS, FS).unwrap();
        (ctx, program)
    }

    #[test]
    fn link_resolves_declared_slots_only() {
        let (_, p) = linked();
        assert_eq!(p.uniform_slot(UniformName::Model).map(|s| s.offset), Some(0));
        assert_eq!(p.uniform_slot(UniformName::ViewProj).map(|s| s.offset), Some(128));
        assert!(p.declares(UniformName::WaterColor));
        assert!(!p.declares(UniformName::InvViewProj));
        assert!(!p.declares(UniformName::Elevation));
        assert_eq!(p.attribute_slot(AttributeName::Normal), Some(AttributeSlot { location: 1 }));
        assert_eq!(p.attribute_slot(AttributeName::Color), None);
    }

    #[test]
    fn absent_setters_are_silent_no_ops() {
        let (mut ctx, p) = linked();
        p.bind(&mut ctx);
        ctx.backend_mut().clear_calls();

        p.set_float(&mut ctx, UniformName::Elevation, 1.5);
        p.set_inv_view_proj_matrix(&mut ctx, Mat4::IDENTITY);
        p.set_screen_dimensions(&mut ctx, 640, 480);

        assert!(ctx.backend().calls().is_empty());
        assert_eq!(ctx.active_program(), Some(p.id()));
    }

    #[test]
    fn bind_twice_activates_once() {
        let (mut ctx, p) = linked();
        p.bind(&mut ctx);
        p.bind(&mut ctx);
        assert_eq!(ctx.backend().count(|c| matches!(c, Call::UseProgram(_))), 1);
    }

    #[test]
    fn setters_bind_first() {
        let (mut ctx, p) = linked();
        p.set_time(&mut ctx, 7);
        assert_eq!(ctx.backend().calls().last(), Some(&Call::UploadUniform {
            program: p.id(),
            offset: p.uniform_slot(UniformName::Time).unwrap().offset,
            bytes: 7i32.to_ne_bytes().to_vec(),
        }));
        assert_eq!(ctx.active_program(), Some(p.id()));
    }

    #[test]
    fn model_inverse_transpose_is_derived_per_call() {
        let (mut ctx, p) = linked();
        let model = Mat4::from_scale(Vec3::new(2.0, 4.0, 8.0));
        p.set_model_matrix(&mut ctx, model);

        let offset = p.uniform_slot(UniformName::ModelInvTr).unwrap().offset;
        let bytes = ctx.backend().uniform_bytes(p.id());
        let uploaded: [f32; 16] = bytemuck::pod_read_unaligned(&bytes[offset as usize..offset as usize + 64]);
        let expected = model.transpose().inverse().to_cols_array();
        assert_eq!(uploaded, expected);
        assert_eq!(uploaded[0], 0.5);
    }

    #[test]
    fn push_controls_converts_colors() {
        let (mut ctx, p) = linked();
        let mut bundle = ControlBundle::default();
        bundle.water.color = [255, 0, 51];
        bundle.water.opacity = 0.25;
        p.push_controls(&mut ctx, &bundle);

        let off = p.uniform_slot(UniformName::WaterColor).unwrap().offset;
        let b = ctx.backend();
        assert_eq!(b.uniform_f32(p.id(), off), Some(1.0));
        assert_eq!(b.uniform_f32(p.id(), off + 4), Some(0.0));
        assert_eq!(b.uniform_f32(p.id(), off + 8), Some(0.2));
        let op = p.uniform_slot(UniformName::WaterOpacity).unwrap().offset;
        assert_eq!(b.uniform_f32(p.id(), op), Some(0.25));
    }

    #[test]
    fn set_texture_ignores_out_of_range_units() {
        let (mut ctx, p) = linked();
        p.set_texture(&mut ctx, 0);
        p.set_texture(&mut ctx, 1); // not declared
        p.set_texture(&mut ctx, 9);
        assert_eq!(ctx.backend().count(|c| matches!(c, Call::UploadUniform { .. })), 1);
    }

    #[test]
    fn mismatched_setter_kind_is_ignored() {
        let (mut ctx, p) = linked();
        p.set_float(&mut ctx, UniformName::Time, 3.0);
        assert_eq!(ctx.backend().count(|c| matches!(c, Call::UploadUniform { .. })), 0);
    }

    #[test]
    fn draw_brackets_attributes_symmetrically() {
        let (mut ctx, p) = linked();
        p.draw(&mut ctx, &Quad { normals: false, count: 6 });

        let calls = ctx.backend().calls();
        let enabled = calls.iter().filter(|c| matches!(c, Call::EnableAttribute { .. })).count();
        let disabled: Vec<&Call> = calls.iter().filter(|c| matches!(c, Call::DisableAttribute(_))).collect();
        assert_eq!(enabled, 1);
        assert_eq!(disabled, vec![&Call::DisableAttribute(0)]);
        assert_eq!(ctx.backend().draws(), vec![(p.id(), Topology::Triangles, 6)]);
        assert_eq!(calls.last(), Some(&Call::DisableAttribute(0)));
    }

    #[test]
    fn empty_draw_still_disables() {
        let (mut ctx, p) = linked();
        p.draw(&mut ctx, &Quad { normals: true, count: 0 });
        let b = ctx.backend();
        assert!(b.draws().is_empty());
        assert_eq!(b.count(|c| matches!(c, Call::EnableAttribute { .. })), 2);
        assert_eq!(b.count(|c| matches!(c, Call::DisableAttribute(_))), 2);
    }

    #[test]
    fn type_mismatch_fails_link() {
        let vs = VS.replace("time: i32", "time: f32").replace("texture0: i32", "texture0: f32");
        let fs = FS.replace("time: i32", "time: f32").replace("texture0: i32", "texture0: f32");
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let err = ShaderProgram::from_sources(&mut ctx, "bad", &vs, &fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err}");
    }

    #[test]
    fn stage_layout_disagreement_fails_link() {
        let fs = FS.replace("    eye: vec4<f32>,\n", "");
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let err = ShaderProgram::from_sources(&mut ctx, "split", VS, &fs).unwrap_err();
        assert!(err.to_string().contains("differs between stages"), "{err}");
    }

    #[test]
    fn unmatched_fragment_input_fails_link() {
        let fs = FS.replace("@location(0) nor", "@location(3) nor");
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let err = ShaderProgram::from_sources(&mut ctx, "iface", VS, &fs).unwrap_err();
        assert!(err.to_string().contains("location 3"), "{err}");
    }

    #[test]
    fn compile_errors_are_fatal() {
        let err = Shader::compile(ShaderStage::Vertex, "this is not wgsl").unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn backend_link_failure_carries_log() {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        ctx.backend_mut().fail_next_link("driver says no");
        let err = ShaderProgram::from_sources(&mut ctx, "drv", VS, FS).unwrap_err();
        assert!(err.to_string().contains("driver says no"));
    }
}
