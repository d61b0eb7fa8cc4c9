use super::backend::Backend;
use super::context::RenderContext;
use super::drawable::Drawable;
use super::shader::ShaderProgram;
use super::vocab::UniformName;
use crate::camera::Camera;

/// Sequences one pass: camera matrices, then one draw per drawable.
///
/// Depth and blend state belong to the caller and are set on the
/// [`RenderContext`] around each `render` call.
#[derive(Debug, Clone)]
pub struct Renderer {
    clear_color: [f32; 4],
    viewport: (u32, u32),
}

impl Renderer {
    pub fn new(clear_color: [f32; 4]) -> Self {
        Self {
            clear_color,
            viewport: (1, 1),
        }
    }

    /// Clears color (to the construction color) and depth.
    pub fn clear<B: Backend>(&self, ctx: &mut RenderContext<B>) {
        let backend = ctx.backend_mut();
        backend.set_clear_color(self.clear_color);
        backend.clear();
    }

    pub fn set_viewport<B: Backend>(&mut self, ctx: &mut RenderContext<B>, width: u32, height: u32) {
        self.viewport = (width, height);
        ctx.backend_mut().set_viewport(width, height);
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Draws `drawables` in order with `shader`.
    pub fn render<B: Backend>(
        &self,
        ctx: &mut RenderContext<B>,
        camera: &Camera,
        shader: &ShaderProgram,
        drawables: &[&dyn Drawable],
    ) {
        shader.set_view_proj_matrix(ctx, camera.view_proj());
        if shader.declares(UniformName::InvViewProj) {
            shader.set_inv_view_proj_matrix(ctx, camera.inv_view_proj());
        }

        for drawable in drawables {
            shader.set_model_matrix(ctx, drawable.model_matrix());
            shader.draw(ctx, *drawable);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3, Vec4};

    use super::*;
    use crate::render::backend::Topology;
    use crate::render::drawable::{Mesh, MeshData};
    use crate::render::recording::{Call, RecordingBackend};

    const VS: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    view_proj: mat4x4<f32>,
};
@group(0) @binding(0) var<uniform> u: Uniforms;

@vertex
fn vs_main(@location(0) vs_pos: vec4<f32>) -> @builtin(position) vec4<f32> {
    return u.view_proj * u.model * vs_pos;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

    fn mesh(ctx: &mut RenderContext<RecordingBackend>, count: usize) -> Mesh {
        let data = MeshData {
            positions: vec![Vec4::W; count],
            normals: Vec::new(),
            indices: (0..count as u32).collect(),
            topology: Topology::Triangles,
        };
        Mesh::upload(ctx, "m", &data)
    }

    #[test]
    fn render_preserves_drawable_order() {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let shader = ShaderProgram::from_sources(&mut ctx, "flat", VS, FS).unwrap();
        let a = mesh(&mut ctx, 3);
        let mut b = mesh(&mut ctx, 6);
        b.set_model_matrix(Mat4::from_translation(Vec3::X));

        let camera = Camera::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO);
        let renderer = Renderer::new([0.0, 0.0, 0.0, 1.0]);
        renderer.render(&mut ctx, &camera, &shader, &[&a, &b]);

        let counts: Vec<u32> = ctx.backend().draws().iter().map(|d| d.2).collect();
        assert_eq!(counts, vec![3, 6]);
        assert_eq!(ctx.activations(), 1);

        let model_offset = shader.uniform_slot(UniformName::Model).unwrap().offset;
        assert_eq!(ctx.backend().uniform_f32(shader.id(), model_offset + 48), Some(1.0));
    }

    #[test]
    fn inverse_view_proj_is_optional() {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let shader = ShaderProgram::from_sources(&mut ctx, "flat", VS, FS).unwrap();
        let camera = Camera::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO);
        Renderer::new([0.0; 4]).render(&mut ctx, &camera, &shader, &[]);

        // view_proj only.
        assert_eq!(ctx.backend().count(|c| matches!(c, Call::UploadUniform { .. })), 1);
    }

    #[test]
    fn clear_uses_construction_color() {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let mut renderer = Renderer::new([0.1, 0.2, 0.3, 1.0]);
        renderer.set_viewport(&mut ctx, 800, 600);
        renderer.clear(&mut ctx);
        assert_eq!(ctx.backend().calls(), &[
            Call::SetViewport(800, 600),
            Call::SetClearColor([0.1, 0.2, 0.3, 1.0]),
            Call::Clear,
        ]);
    }
}
