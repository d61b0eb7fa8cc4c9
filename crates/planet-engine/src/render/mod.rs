//! Rendering core.
//!
//! `ShaderProgram`s are linked from WGSL stages and talk to the GPU through a
//! [`Backend`]. Program activation goes through a [`RenderContext`], which owns
//! the single active-program cell and elides redundant binds.
//!
//! Convention:
//! - Positions and normals are `vec4<f32>` per vertex, indices are `u32`.
//! - Uniform and attribute names come from a fixed vocabulary ([`UniformName`],
//!   [`AttributeName`]); a program may declare any subset of it.

mod backend;
mod context;
mod controls;
mod drawable;
#[cfg(any(test, feature = "testing"))]
mod recording;
mod reflect;
mod renderer;
mod shader;
mod texture;
mod vocab;
mod wgpu_backend;

pub use backend::{
    Backend, BufferId, BufferKind, ProgramDesc, ProgramId, ShaderStage, StageDesc, TextureId,
    Topology,
};
pub use context::RenderContext;
pub use controls::{
    channel_value, set_channel, unit_rgb, Channel, ControlBundle, ControlField, Rgb255, WaterControls,
};
pub use drawable::{Drawable, Mesh, MeshData};
#[cfg(any(test, feature = "testing"))]
pub use recording::{Call, RecordingBackend};
pub use renderer::Renderer;
pub use shader::{AttributeSlot, Shader, ShaderError, ShaderProgram, UniformSlot};
pub use texture::Texture;
pub use vocab::{AttributeName, UniformKind, UniformName};
pub use wgpu_backend::{WgpuBackend, DEPTH_FORMAT};
