//! GPU command seam.
//!
//! The rendering core (`ShaderProgram`, `Renderer`) talks to the GPU only
//! through [`Backend`]. `WgpuBackend` records and encodes real wgpu work;
//! `RecordingBackend` records calls for headless tests.

use std::fmt;

/// Handle to a linked program owned by a backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ProgramId(pub u32);

/// Handle to a vertex or index buffer owned by a backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u32);

/// Handle to a 2D RGBA texture owned by a backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(pub u32);

/// Pipeline stage of a single shader module.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Primitive topology of an indexed draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Topology {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    LineStrip,
    Points,
}

/// Usage of a buffer created through [`Backend::create_buffer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    /// Per-vertex attribute data (four `f32` per vertex).
    Vertex,
    /// `u32` element indices.
    Index,
}

/// One compiled stage handed to the backend at link time.
#[derive(Debug, Clone, Copy)]
pub struct StageDesc<'a> {
    pub source: &'a str,
    pub entry_point: &'a str,
}

/// Everything a backend needs to create a program.
#[derive(Debug, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub vertex: StageDesc<'a>,
    pub fragment: StageDesc<'a>,
    /// Size in bytes of the merged `@group(0) @binding(0)` uniform block, 0 if absent.
    pub uniform_size: u32,
    /// Declared vertex input locations, in ascending order.
    pub attribute_locations: Vec<u32>,
}

/// Low-level GPU command surface.
///
/// Semantics follow an immediate-mode API: uniform uploads target the program
/// activated by the last `use_program` call, enabled attributes and the bound
/// index buffer persist until changed, and `draw_elements` consumes the current
/// state.
pub trait Backend {
    /// Creates a program from two validated stages.
    ///
    /// The error string is the backend's diagnostic log.
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, String>;

    /// Makes `program` the target of uniform uploads and draws.
    fn use_program(&mut self, program: ProgramId);

    /// Writes `bytes` at `offset` into the active program's uniform block.
    fn upload_uniform(&mut self, offset: u32, bytes: &[u8]);

    fn create_buffer(&mut self, kind: BufferKind, label: &str, bytes: &[u8]) -> BufferId;

    /// Sources the vertex input at `location` from `buffer` (4 × f32, tightly packed).
    fn enable_attribute(&mut self, location: u32, buffer: BufferId);

    fn disable_attribute(&mut self, location: u32);

    fn bind_index_buffer(&mut self, buffer: BufferId);

    /// Issues one indexed draw with `count` `u32` indices.
    fn draw_elements(&mut self, topology: Topology, count: u32);

    /// Uploads an RGBA8 image. `rgba.len()` must equal `width * height * 4`.
    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId;

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    fn set_clear_color(&mut self, color: [f32; 4]);

    /// Clears color and depth.
    fn clear(&mut self);

    fn set_viewport(&mut self, width: u32, height: u32);

    fn set_depth_test(&mut self, enabled: bool);

    /// Toggles straight-alpha blending (`src_alpha`, `1 - src_alpha`).
    fn set_blend(&mut self, enabled: bool);
}
