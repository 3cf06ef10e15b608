//! Mesh compaction after the collapse loop

use lodcrate_core::{is_degenerate_face, Point3d, TriangleMesh};

const INVALID: usize = usize::MAX;

/// Rewrite working buffers into a dense mesh.
///
/// Surviving vertices keep their relative order. Faces that are dead,
/// degenerate, or still touch a deleted vertex are dropped.
pub fn compact(
    positions: &[Point3d],
    deleted: &[bool],
    faces: &[[usize; 3]],
    face_alive: &[bool],
) -> TriangleMesh {
    let mut old_to_new = vec![INVALID; positions.len()];
    let mut vertices = Vec::with_capacity(positions.len());
    for (i, p) in positions.iter().enumerate() {
        if !deleted[i] {
            old_to_new[i] = vertices.len();
            vertices.push(p.cast::<f32>());
        }
    }

    let faces = faces
        .iter()
        .zip(face_alive)
        .filter(|(_, alive)| **alive)
        .filter_map(|(face, _)| {
            let mapped = face.map(|v| old_to_new[v]);
            if mapped.contains(&INVALID) || is_degenerate_face(&mapped) {
                None
            } else {
                Some(mapped)
            }
        })
        .collect();

    TriangleMesh::from_vertices_and_faces(vertices, faces)
}
