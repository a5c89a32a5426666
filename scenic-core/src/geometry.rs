/// Built-in primitive shapes
use crate::algebra::Vec3;
use crate::mesh::Mesh;

/// Faces of the box as (normal, corners), each corner a sign per axis.
/// Two counter-clockwise triangles per face, seen from outside.
const BOX_FACES: [([f32; 3], [[f32; 3]; 6]); 6] = [
    // front
    (
        [0.0, 0.0, 1.0],
        [
            [-1.0, 1.0, 1.0], [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0],
            [-1.0, 1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0],
        ],
    ),
    // right
    (
        [1.0, 0.0, 0.0],
        [
            [1.0, 1.0, 1.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0],
            [1.0, 1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0],
        ],
    ),
    // back
    (
        [0.0, 0.0, -1.0],
        [
            [1.0, 1.0, -1.0], [1.0, -1.0, -1.0], [-1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0],
        ],
    ),
    // left
    (
        [-1.0, 0.0, 0.0],
        [
            [-1.0, 1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0],
            [-1.0, 1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0],
        ],
    ),
    // top
    (
        [0.0, 1.0, 0.0],
        [
            [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0],
            [-1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0],
        ],
    ),
    // bottom
    (
        [0.0, -1.0, 0.0],
        [
            [-1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0],
            [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0],
        ],
    ),
];

pub const DEFAULT_BOX_SIZE: [f32; 3] = [10.0, 10.0, 10.0];

/// Axis-aligned box centred on the origin with flat per-face normals.
///
/// Corners are not shared between faces, so the mesh has 36 vertices
/// and a sequential index list.
pub fn box_mesh(size: &Vec3) -> Mesh {
    let half = size / 2.0;
    let mut mesh = Mesh::new();

    for (normal, corners) in BOX_FACES.iter() {
        for corner in corners {
            mesh.positions.extend_from_slice(&[
                corner[0] * half.x,
                corner[1] * half.y,
                corner[2] * half.z,
            ]);
            mesh.normals.extend_from_slice(normal);
        }
    }
    mesh.indices = (0..mesh.vertex_count() as u32).collect();

    mesh
}
