//! Mesh data structures and the flat-buffer boundary

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::point::*;

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
}

/// Canonical undirected edge key: `(min, max)`.
#[inline]
pub fn canonical_edge(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Whether a face repeats a vertex index.
#[inline]
pub fn is_degenerate_face(f: &[usize; 3]) -> bool {
    f[0] == f[1] || f[1] == f[2] || f[0] == f[2]
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Build a mesh from flat coordinate triples and flat index triples.
    ///
    /// Fails if either buffer length is not a multiple of three, or if any
    /// index is outside `[0, vertex_count)`.
    pub fn from_flat_buffers(positions: &[f32], indices: &[u32]) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(Error::InvalidData(format!(
                "Position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidData(format!(
                "Index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|c| Point3f::new(c[0], c[1], c[2]))
            .collect();
        let faces = indices
            .chunks_exact(3)
            .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
            .collect();

        let mesh = Self { vertices, faces };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Check that every face index refers to an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();
        for (face, tri) in self.faces.iter().enumerate() {
            for (corner, &index) in tri.iter().enumerate() {
                if index >= vertex_count {
                    return Err(Error::IndexOutOfRange {
                        face,
                        corner,
                        index,
                        vertex_count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Vertex positions as a flat `[x0, y0, z0, x1, ...]` slice
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Face indices as a flat `[a0, b0, c0, a1, ...]` buffer
    pub fn indices_flat(&self) -> Vec<u32> {
        self.faces
            .iter()
            .flat_map(|f| f.iter().map(|&i| i as u32))
            .collect()
    }

    /// Number of faces incident on each canonical edge
    pub fn edge_face_counts(&self) -> HashMap<(usize, usize), usize> {
        self.faces
            .iter()
            .flat_map(|f| {
                [
                    canonical_edge(f[0], f[1]),
                    canonical_edge(f[1], f[2]),
                    canonical_edge(f[2], f[0]),
                ]
            })
            .counts()
    }

    /// Whether any face repeats a vertex index
    pub fn has_degenerate_faces(&self) -> bool {
        self.faces.iter().any(is_degenerate_face)
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
