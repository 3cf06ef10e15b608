//! Undirected edge registry
//!
//! Every edge is keyed by its canonical `(min, max)` vertex pair and remembers
//! the triangles incident on it, its cached collapse candidate, and its
//! lifecycle state.

use std::collections::{BTreeSet, HashMap};

use lodcrate_core::{canonical_edge, is_degenerate_face, Error, Point3d, Result};

use crate::quadric::Quadric;

pub type EdgeId = usize;

/// Lifecycle of an edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    /// Cost is current and the edge is queued.
    Pending,
    /// Not queued right now (failed the topology guard or is a preserved
    /// boundary); re-queued when its neighbourhood changes.
    Parked,
    /// Consumed or invalidated. Terminal.
    Collapsed,
}

#[derive(Debug, Clone)]
pub struct EdgeRecord {
    pub v1: usize,
    pub v2: usize,
    /// Incident face indices in discovery order.
    pub triangles: Vec<usize>,
    pub cost: f64,
    pub position: Point3d,
    /// Sum of the endpoint quadrics the cost was computed from.
    pub quadric: Quadric,
    pub state: EdgeState,
    /// Bumped on every re-queue so older queue entries can be told apart.
    pub generation: u32,
}

impl EdgeRecord {
    fn new(v1: usize, v2: usize) -> Self {
        Self {
            v1,
            v2,
            triangles: Vec::with_capacity(2),
            cost: f64::INFINITY,
            position: Point3d::origin(),
            quadric: Quadric::zero(),
            state: EdgeState::Parked,
            generation: 0,
        }
    }

    pub fn key(&self) -> (usize, usize) {
        (self.v1, self.v2)
    }

    pub fn is_boundary(&self) -> bool {
        self.triangles.len() == 1
    }

    /// The faces that define this edge's neighbourhood. Non-manifold edges
    /// use the first two found.
    pub fn incident_pair(&self) -> &[usize] {
        &self.triangles[..self.triangles.len().min(2)]
    }

    pub fn is_live(&self) -> bool {
        self.state != EdgeState::Collapsed
    }
}

/// Keyed collection of edge records with per-vertex adjacency.
#[derive(Debug, Clone, Default)]
pub struct EdgeRegistry {
    records: Vec<EdgeRecord>,
    index: HashMap<(usize, usize), EdgeId>,
    vertex_edges: Vec<Vec<EdgeId>>,
}

impl EdgeRegistry {
    /// Derive the edge set of a triangle list.
    ///
    /// Out-of-range indices are rejected. Faces that already repeat a vertex
    /// contribute no edges.
    pub fn build(faces: &[[usize; 3]], vertex_count: usize) -> Result<Self> {
        let mut registry = Self {
            records: Vec::with_capacity(faces.len() * 3 / 2),
            index: HashMap::with_capacity(faces.len() * 3 / 2),
            vertex_edges: vec![Vec::new(); vertex_count],
        };

        for (fi, face) in faces.iter().enumerate() {
            for (corner, &index) in face.iter().enumerate() {
                if index >= vertex_count {
                    return Err(Error::IndexOutOfRange {
                        face: fi,
                        corner,
                        index,
                        vertex_count,
                    });
                }
            }
            if !is_degenerate_face(face) {
                registry.register_face(fi, face);
            }
        }

        Ok(registry)
    }

    /// Record `face` against each of its three edges.
    pub fn register_face(&mut self, fi: usize, face: &[usize; 3]) {
        for j in 0..3 {
            let (a, b) = (face[j], face[(j + 1) % 3]);
            if a != b {
                self.add_incidence(a, b, fi);
            }
        }
    }

    /// Get or create the edge `(a, b)` and note that `face` touches it.
    pub fn add_incidence(&mut self, a: usize, b: usize, face: usize) -> EdgeId {
        let key = canonical_edge(a, b);
        let id = match self.index.get(&key) {
            Some(&id) => id,
            None => {
                let id = self.records.len();
                self.records.push(EdgeRecord::new(key.0, key.1));
                self.index.insert(key, id);
                self.vertex_edges[key.0].push(id);
                self.vertex_edges[key.1].push(id);
                id
            }
        };
        let triangles = &mut self.records[id].triangles;
        if !triangles.contains(&face) {
            triangles.push(face);
        }
        id
    }

    /// Mark an edge collapsed and drop it from the lookup structures.
    pub fn retire(&mut self, id: EdgeId) {
        let record = &mut self.records[id];
        if record.state == EdgeState::Collapsed {
            return;
        }
        record.state = EdgeState::Collapsed;
        let (v1, v2) = record.key();
        self.index.remove(&(v1, v2));
        self.vertex_edges[v1].retain(|&e| e != id);
        self.vertex_edges[v2].retain(|&e| e != id);
    }

    pub fn get(&self, id: EdgeId) -> &EdgeRecord {
        &self.records[id]
    }

    pub fn get_mut(&mut self, id: EdgeId) -> &mut EdgeRecord {
        &mut self.records[id]
    }

    pub fn find(&self, a: usize, b: usize) -> Option<EdgeId> {
        self.index.get(&canonical_edge(a, b)).copied()
    }

    /// Total records ever created, including retired ones.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.index.len()
    }

    /// Live edges, in creation order.
    pub fn live_edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_live())
    }

    /// Live edges touching `v`.
    pub fn edges_of(&self, v: usize) -> &[EdgeId] {
        &self.vertex_edges[v]
    }

    /// Vertices joined to `v` by a live edge.
    pub fn neighbors(&self, v: usize) -> BTreeSet<usize> {
        self.vertex_edges[v]
            .iter()
            .map(|&e| {
                let r = &self.records[e];
                if r.v1 == v {
                    r.v2
                } else {
                    r.v1
                }
            })
            .collect()
    }

    pub fn is_boundary_vertex(&self, v: usize) -> bool {
        self.vertex_edges[v]
            .iter()
            .any(|&e| self.records[e].is_boundary())
    }
}
