use glam::Vec3;
use planet_engine::render::{MeshData, Topology};

/// Face normal plus two in-plane axes with `u × v = normal`, so corners wind
/// counter-clockwise seen from outside.
const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::Y, Vec3::Z),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::Z, Vec3::X),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::Y, Vec3::X),
];

/// Axis-aligned cube centered on the origin with half-extent 1.
///
/// 24 vertices so each face carries its own flat normal.
pub fn cube() -> MeshData {
    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u, v) in FACES {
        let base = positions.len() as u32;
        for corner in [normal - u - v, normal + u - v, normal + u + v, normal - u + v] {
            positions.push(corner.extend(1.0));
            normals.push(normal.extend(0.0));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData {
        positions,
        normals,
        indices,
        topology: Topology::Triangles,
    }
}
