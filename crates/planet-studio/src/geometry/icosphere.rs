use std::collections::HashMap;

use glam::Vec3;
use planet_engine::render::{MeshData, Topology};

/// Highest subdivision level accepted; level 7 is already ~164k vertices.
pub const MAX_SUBDIVISIONS: u32 = 7;

const FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Unit icosphere: an icosahedron whose faces are split `subdivisions` times,
/// every vertex pushed back onto the sphere.
///
/// Normals equal positions (w = 0). Levels above [`MAX_SUBDIVISIONS`] are clamped.
pub fn icosphere(subdivisions: u32) -> MeshData {
    let subdivisions = subdivisions.min(MAX_SUBDIVISIONS);
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;

    let mut vertices: Vec<Vec3> = [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
    .into_iter()
    .map(Vec3::normalize)
    .collect();

    let mut faces = FACES.to_vec();

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::with_capacity(faces.len() * 3 / 2);
        let mut next = Vec::with_capacity(faces.len() * 4);

        for [a, b, c] in faces {
            let ab = midpoint(&mut vertices, &mut midpoints, a, b);
            let bc = midpoint(&mut vertices, &mut midpoints, b, c);
            let ca = midpoint(&mut vertices, &mut midpoints, c, a);
            next.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }

    MeshData {
        positions: vertices.iter().map(|v| v.extend(1.0)).collect(),
        normals: vertices.iter().map(|v| v.extend(0.0)).collect(),
        indices: faces.into_iter().flatten().collect(),
        topology: Topology::Triangles,
    }
}

fn midpoint(vertices: &mut Vec<Vec3>, cache: &mut HashMap<(u32, u32), u32>, a: u32, b: u32) -> u32 {
    let key = (a.min(b), a.max(b));
    *cache.entry(key).or_insert_with(|| {
        let mid = (vertices[a as usize] + vertices[b as usize]).normalize();
        vertices.push(mid);
        (vertices.len() - 1) as u32
    })
}

/// Vertex count of an icosphere at `subdivisions`: `10 * 4^n + 2`.
pub fn vertex_count(subdivisions: u32) -> usize {
    10 * 4usize.pow(subdivisions.min(MAX_SUBDIVISIONS)) + 2
}
