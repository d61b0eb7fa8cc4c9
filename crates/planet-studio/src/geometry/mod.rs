//! Procedural meshes: the planet sphere, the fallback cube and the sky quad.

mod cube;
mod icosphere;
mod sky;

pub use cube::cube;
pub use icosphere::{icosphere, vertex_count, MAX_SUBDIVISIONS};
pub use sky::{sky_quad, SKY_DEPTH};
