use glam::Vec4;
use planet_engine::render::{MeshData, Topology};

/// Clip-space depth of the sky quad, just inside the far plane.
pub const SKY_DEPTH: f32 = 0.9999;

/// Full-screen quad in clip space. Positions only; the sky program rebuilds
/// view rays from them.
pub fn sky_quad() -> MeshData {
    MeshData {
        positions: vec![
            Vec4::new(-1.0, -1.0, SKY_DEPTH, 1.0),
            Vec4::new(1.0, -1.0, SKY_DEPTH, 1.0),
            Vec4::new(1.0, 1.0, SKY_DEPTH, 1.0),
            Vec4::new(-1.0, 1.0, SKY_DEPTH, 1.0),
        ],
        normals: Vec::new(),
        indices: vec![0, 1, 2, 0, 2, 3],
        topology: Topology::Triangles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_the_viewport() {
        let quad = sky_quad();
        assert!(quad.normals.is_empty());
        let (min, max) = quad
            .positions
            .iter()
            .fold((Vec4::splat(f32::MAX), Vec4::splat(f32::MIN)), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        assert_eq!((min.x, min.y, max.x, max.y), (-1.0, -1.0, 1.0, 1.0));
    }
}
