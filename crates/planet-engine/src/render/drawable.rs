use glam::{Mat4, Vec4};

use super::backend::{Backend, BufferId, BufferKind, Topology};
use super::context::RenderContext;

/// Geometry consumed by the rendering core.
///
/// The core never looks at how the buffers were produced; it only asks for
/// handles, the element count and the topology.
pub trait Drawable {
    /// Position buffer (vec4 per vertex), if provided.
    fn positions(&self) -> Option<BufferId>;

    /// Normal buffer (vec4 per vertex), if provided.
    fn normals(&self) -> Option<BufferId>;

    fn indices(&self) -> BufferId;

    fn element_count(&self) -> u32;

    fn topology(&self) -> Topology;

    fn model_matrix(&self) -> Mat4;

    fn set_model_matrix(&mut self, model: Mat4);
}

/// CPU-side geometry ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec4>,
    pub normals: Vec<Vec4>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Uploaded geometry with its own model matrix.
#[derive(Debug, Clone)]
pub struct Mesh {
    positions: BufferId,
    normals: Option<BufferId>,
    indices: BufferId,
    count: u32,
    topology: Topology,
    model: Mat4,
}

impl Mesh {
    /// Uploads `data`. Normals are skipped when the data has none.
    pub fn upload<B: Backend>(ctx: &mut RenderContext<B>, label: &str, data: &MeshData) -> Self {
        let backend = ctx.backend_mut();

        let positions = backend.create_buffer(
            BufferKind::Vertex,
            &format!("{label} positions"),
            bytemuck::cast_slice(&data.positions),
        );
        let normals = (!data.normals.is_empty()).then(|| {
            backend.create_buffer(
                BufferKind::Vertex,
                &format!("{label} normals"),
                bytemuck::cast_slice(&data.normals),
            )
        });
        let indices = backend.create_buffer(
            BufferKind::Index,
            &format!("{label} indices"),
            bytemuck::cast_slice(&data.indices),
        );

        log::debug!(
            "uploaded mesh `{label}`: {} vertices, {} indices",
            data.vertex_count(),
            data.indices.len()
        );

        Self {
            positions,
            normals,
            indices,
            count: data.indices.len() as u32,
            topology: data.topology,
            model: Mat4::IDENTITY,
        }
    }
}

impl Drawable for Mesh {
    fn positions(&self) -> Option<BufferId> {
        Some(self.positions)
    }

    fn normals(&self) -> Option<BufferId> {
        self.normals
    }

    fn indices(&self) -> BufferId {
        self.indices
    }

    fn element_count(&self) -> u32 {
        self.count
    }

    fn topology(&self) -> Topology {
        self.topology
    }

    fn model_matrix(&self) -> Mat4 {
        self.model
    }

    fn set_model_matrix(&mut self, model: Mat4) {
        self.model = model;
    }
}
