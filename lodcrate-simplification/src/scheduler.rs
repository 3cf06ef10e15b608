//! Greedy collapse scheduler
//!
//! [`DecimationContext`] owns every piece of mutable state for one
//! decimation call: working positions and quadrics, the face list, the edge
//! registry and the priority queue. Each [`DecimationContext::step`] pops the
//! cheapest candidate and either discards it (stale), parks it (topology
//! guard) or collapses it, after which the edges around the surviving vertex
//! are rebuilt and rescored.

use std::collections::{BTreeSet, HashSet};

use rayon::prelude::*;
use tracing::{debug, trace};

use lodcrate_core::{is_degenerate_face, Error, Point3d, Result, TriangleMesh};

use crate::cancel::CancellationToken;
use crate::compact::compact;
use crate::config::DecimationConfig;
use crate::cost::{evaluate_collapse, CollapseCost};
use crate::edge_registry::{EdgeId, EdgeRegistry, EdgeState};
use crate::quadric::{accumulate_vertex_quadrics, Quadric};
use crate::queue::{new_queue, CollapseQueue, QueueEntry};
use crate::result::Termination;

/// Outcome of a single scheduler step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Collapsed { removed_faces: usize },
    /// Candidate refused by the topology guard and parked
    Rejected,
    /// Superseded or dead entry discarded
    Skipped,
    /// Cheapest candidate is above `max_error`; it stays queued
    ThresholdExceeded,
    Exhausted,
}

/// Per-call decimation state.
pub struct DecimationContext {
    positions: Vec<Point3d>,
    quadrics: Vec<Quadric>,
    deleted: Vec<bool>,
    faces: Vec<[usize; 3]>,
    face_alive: Vec<bool>,
    /// Faces touching each vertex; may hold dead faces until pruned
    vertex_faces: Vec<Vec<usize>>,
    registry: EdgeRegistry,
    queue: Box<dyn CollapseQueue>,
    live_faces: usize,
    config: DecimationConfig,
    collapses: usize,
    rejected: usize,
    skipped: usize,
}

impl DecimationContext {
    /// Build quadrics, the edge registry and the initial queue for `mesh`.
    ///
    /// Faces that already repeat a vertex index are dropped up front.
    pub fn new(mesh: &TriangleMesh, config: DecimationConfig) -> Result<Self> {
        config.validate()?;
        let vertex_count = mesh.vertex_count();
        let registry = EdgeRegistry::build(&mesh.faces, vertex_count)?;

        let positions: Vec<Point3d> = mesh.vertices.iter().map(|p| p.cast::<f64>()).collect();
        let faces = mesh.faces.clone();
        let face_alive: Vec<bool> = faces.iter().map(|f| !is_degenerate_face(f)).collect();

        let live: Vec<[usize; 3]> = faces
            .iter()
            .zip(&face_alive)
            .filter(|(_, alive)| **alive)
            .map(|(f, _)| *f)
            .collect();
        let quadrics = accumulate_vertex_quadrics(&positions, &live);

        let mut vertex_faces = vec![Vec::new(); vertex_count];
        for (fi, face) in faces.iter().enumerate() {
            if face_alive[fi] {
                for &v in face {
                    vertex_faces[v].push(fi);
                }
            }
        }

        let mut ctx = Self {
            positions,
            quadrics,
            deleted: vec![false; vertex_count],
            live_faces: live.len(),
            faces,
            face_alive,
            vertex_faces,
            registry,
            queue: new_queue(config.queue_strategy),
            config,
            collapses: 0,
            rejected: 0,
            skipped: 0,
        };
        ctx.score_all();

        debug!(
            vertices = vertex_count,
            faces = ctx.live_faces,
            edges = ctx.registry.live_count(),
            queued = ctx.queue.len(),
            "Decimation context ready"
        );
        Ok(ctx)
    }

    fn score_all(&mut self) {
        let candidates: Vec<(EdgeId, usize, usize)> = self
            .registry
            .live_edges()
            .map(|(id, r)| (id, r.v1, r.v2))
            .collect();

        let quadrics = &self.quadrics;
        let positions = &self.positions;
        let eval = |&(id, v1, v2): &(EdgeId, usize, usize)| {
            (
                id,
                evaluate_collapse(&quadrics[v1], &quadrics[v2], &positions[v1], &positions[v2]),
            )
        };
        let scored: Vec<(EdgeId, CollapseCost)> = if self.config.parallel_scoring {
            candidates.par_iter().map(eval).collect()
        } else {
            candidates.iter().map(eval).collect()
        };

        for (id, cc) in scored {
            self.enqueue(id, &cc);
        }
    }

    fn rescore(&mut self, id: EdgeId) {
        let (v1, v2) = self.registry.get(id).key();
        let cc = evaluate_collapse(
            &self.quadrics[v1],
            &self.quadrics[v2],
            &self.positions[v1],
            &self.positions[v2],
        );
        self.enqueue(id, &cc);
    }

    /// Cache a fresh candidate on the edge and queue it, or park it when
    /// boundary preservation forbids the collapse.
    fn enqueue(&mut self, id: EdgeId, cc: &CollapseCost) {
        let (v1, v2) = self.registry.get(id).key();
        let on_boundary =
            self.registry.is_boundary_vertex(v1) || self.registry.is_boundary_vertex(v2);

        let record = self.registry.get_mut(id);
        record.generation = record.generation.wrapping_add(1);
        record.position = cc.position;
        record.quadric = cc.quadric;
        record.cost = cc.cost;

        if on_boundary && self.config.preserve_boundary {
            record.state = EdgeState::Parked;
            self.queue.remove(id);
            return;
        }
        if on_boundary {
            record.cost += self.config.boundary_penalty;
        }
        record.state = EdgeState::Pending;
        self.queue.push(QueueEntry {
            edge: id,
            cost: record.cost,
            generation: record.generation,
        });
    }

    /// Pop and process one queue entry.
    pub fn step(&mut self) -> Step {
        let Some(entry) = self.queue.pop() else {
            return Step::Exhausted;
        };

        let record = self.registry.get(entry.edge);
        if record.state != EdgeState::Pending || record.generation != entry.generation {
            self.skipped += 1;
            return Step::Skipped;
        }

        if let Some(max_error) = self.config.max_error {
            if entry.cost > max_error {
                self.queue.push(entry);
                return Step::ThresholdExceeded;
            }
        }

        let (v1, v2) = record.key();
        if self.deleted[v1] || self.deleted[v2] {
            self.registry.retire(entry.edge);
            self.skipped += 1;
            return Step::Skipped;
        }

        if !self.collapse_allowed(entry.edge) {
            self.registry.get_mut(entry.edge).state = EdgeState::Parked;
            self.rejected += 1;
            return Step::Rejected;
        }

        let removed_faces = self.collapse(entry.edge);
        Step::Collapsed { removed_faces }
    }

    /// Run until the live face count is at most `target` or no candidate
    /// remains.
    pub fn run(
        &mut self,
        target: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<Termination> {
        let interval = self.config.cancel_check_interval.max(1);
        let mut iterations = 0usize;
        loop {
            if self.live_faces <= target {
                return Ok(Termination::TargetReached);
            }
            if let Some(token) = cancel {
                if iterations % interval == 0 && token.is_cancelled() {
                    debug!(collapses = self.collapses, "Decimation cancelled");
                    return Err(Error::Cancelled {
                        collapses: self.collapses,
                    });
                }
            }
            iterations += 1;

            match self.step() {
                Step::Exhausted => return Ok(Termination::QueueExhausted),
                Step::ThresholdExceeded => return Ok(Termination::ErrorThresholdExceeded),
                Step::Collapsed { .. } | Step::Rejected | Step::Skipped => {}
            }
        }
    }

    /// Topology guard: link condition plus a check against folding two
    /// faces onto the same vertex triple.
    ///
    /// Non-manifold edges are judged by their first two faces, so any extra
    /// fin shows up as a surplus common neighbour and the edge is refused.
    fn collapse_allowed(&self, id: EdgeId) -> bool {
        let record = self.registry.get(id);
        let (v1, v2) = record.key();

        // Merging two rim vertices across the surface pinches it
        if !record.is_boundary()
            && self.registry.is_boundary_vertex(v1)
            && self.registry.is_boundary_vertex(v2)
        {
            return false;
        }

        let apices: BTreeSet<usize> = record
            .incident_pair()
            .iter()
            .filter_map(|&f| self.faces[f].iter().copied().find(|&v| v != v1 && v != v2))
            .collect();
        let n1 = self.registry.neighbors(v1);
        let n2 = self.registry.neighbors(v2);
        let common: BTreeSet<usize> = n1.intersection(&n2).copied().collect();
        if common != apices {
            return false;
        }

        !self.would_fold(v1, v2)
    }

    /// Whether moving `v2` onto `v1` would make a face coincide with one of
    /// `v1`'s existing faces.
    fn would_fold(&self, v1: usize, v2: usize) -> bool {
        let sorted = |mut f: [usize; 3]| {
            f.sort_unstable();
            f
        };
        let existing: HashSet<[usize; 3]> = self.vertex_faces[v1]
            .iter()
            .filter(|&&f| self.face_alive[f] && !self.faces[f].contains(&v2))
            .map(|&f| sorted(self.faces[f]))
            .collect();

        self.vertex_faces[v2]
            .iter()
            .filter(|&&f| self.face_alive[f] && !self.faces[f].contains(&v1))
            .any(|&f| {
                let moved = self.faces[f].map(|v| if v == v2 { v1 } else { v });
                existing.contains(&sorted(moved))
            })
    }

    /// Merge `v2` into `v1` and return the number of faces removed.
    fn collapse(&mut self, id: EdgeId) -> usize {
        let (v1, v2, position, merged) = {
            let r = self.registry.get(id);
            (r.v1, r.v2, r.position, r.quadric)
        };

        self.positions[v1] = position;
        self.quadrics[v1] = merged;
        self.deleted[v2] = true;

        // Every edge on either endpoint is rebuilt from v1's faces below
        let stale: Vec<EdgeId> = self
            .registry
            .edges_of(v1)
            .iter()
            .chain(self.registry.edges_of(v2))
            .copied()
            .collect();
        for e in stale {
            self.registry.retire(e);
            self.queue.remove(e);
        }

        let moved = std::mem::take(&mut self.vertex_faces[v2]);
        let mut removed = 0;
        for f in moved {
            if !self.face_alive[f] {
                continue;
            }
            let face = &mut self.faces[f];
            for v in face.iter_mut() {
                if *v == v2 {
                    *v = v1;
                }
            }
            if is_degenerate_face(face) {
                self.face_alive[f] = false;
                removed += 1;
            } else {
                self.vertex_faces[v1].push(f);
            }
        }
        let face_alive = &self.face_alive;
        self.vertex_faces[v1].retain(|&f| face_alive[f]);
        self.live_faces -= removed;

        for &f in &self.vertex_faces[v1] {
            self.registry.register_face(f, &self.faces[f]);
        }

        self.collapses += 1;
        trace!(
            kept = v1,
            removed_vertex = v2,
            removed_faces = removed,
            live_faces = self.live_faces,
            "Collapsed edge"
        );

        self.refresh_around(v1);
        removed
    }

    /// Rescore every edge touching `v` or one of its neighbours.
    fn refresh_around(&mut self, v: usize) {
        let mut touched: BTreeSet<EdgeId> = self.registry.edges_of(v).iter().copied().collect();
        for n in self.registry.neighbors(v) {
            touched.extend(self.registry.edges_of(n).iter().copied());
        }
        for id in touched {
            self.rescore(id);
        }
    }

    pub fn live_triangle_count(&self) -> usize {
        self.live_faces
    }

    /// Faces still present in the working mesh.
    pub fn live_faces(&self) -> impl Iterator<Item = &[usize; 3]> {
        self.faces
            .iter()
            .zip(&self.face_alive)
            .filter(|(_, alive)| **alive)
            .map(|(f, _)| f)
    }

    pub fn is_deleted(&self, v: usize) -> bool {
        self.deleted[v]
    }

    pub fn position(&self, v: usize) -> &Point3d {
        &self.positions[v]
    }

    pub fn quadric(&self, v: usize) -> &Quadric {
        &self.quadrics[v]
    }

    pub fn registry(&self) -> &EdgeRegistry {
        &self.registry
    }

    /// Queue entries held, superseded ones included.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn collapses_performed(&self) -> usize {
        self.collapses
    }

    pub fn collapses_rejected(&self) -> usize {
        self.rejected
    }

    pub fn stale_entries_skipped(&self) -> usize {
        self.skipped
    }

    /// Compact the working state into the output mesh.
    pub fn into_mesh(self) -> TriangleMesh {
        compact(&self.positions, &self.deleted, &self.faces, &self.face_alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueStrategy;
    use approx::assert_relative_eq;
    use lodcrate_core::Point3f;

    fn make_tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    fn make_plane_grid(size: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                vertices.push(Point3f::new(x as f32, y as f32, 0.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                faces.push([tl, bl, tr]);
                faces.push([tr, bl, br]);
            }
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    fn serial() -> DecimationConfig {
        DecimationConfig::default().with_parallel_scoring(false)
    }

    fn assert_consistent(ctx: &DecimationContext) {
        let mut count = 0;
        for face in ctx.live_faces() {
            count += 1;
            assert!(!is_degenerate_face(face));
            for &v in face {
                assert!(!ctx.is_deleted(v), "live face {:?} references deleted vertex", face);
            }
        }
        assert_eq!(count, ctx.live_triangle_count());
        for (_, edge) in ctx.registry().live_edges() {
            assert!(!ctx.is_deleted(edge.v1) && !ctx.is_deleted(edge.v2));
        }
    }

    #[test]
    fn test_context_construction() {
        let ctx = DecimationContext::new(&make_tetrahedron(), serial()).unwrap();
        assert_eq!(ctx.live_triangle_count(), 4);
        assert_eq!(ctx.registry().live_count(), 6);
        assert_eq!(ctx.queue_len(), 6);
        for (_, edge) in ctx.registry().live_edges() {
            assert_eq!(edge.state, EdgeState::Pending);
            assert!(edge.cost >= 0.0);
            assert_eq!(edge.quadric, *ctx.quadric(edge.v1) + *ctx.quadric(edge.v2));
        }
    }

    #[test]
    fn test_vertex_quadric_is_sum_of_incident_planes() {
        let mesh = make_plane_grid(3);
        let ctx = DecimationContext::new(&mesh, serial()).unwrap();
        // Flat grid: every quadric measures distance to z = 0 only
        for v in 0..mesh.vertex_count() {
            let q = ctx.quadric(v);
            assert_relative_eq!(q.evaluate(&Point3d::new(3.0, -7.0, 0.0)), 0.0, epsilon = 1e-9);
            assert!(q.evaluate(&Point3d::new(0.0, 0.0, 1.0)) > 0.0);
        }
    }

    #[test]
    fn test_tetrahedron_rejects_every_collapse() {
        let mut ctx = DecimationContext::new(&make_tetrahedron(), serial()).unwrap();
        let termination = ctx.run(2, None).unwrap();
        assert_eq!(termination, Termination::QueueExhausted);
        assert_eq!(ctx.live_triangle_count(), 4);
        assert_eq!(ctx.collapses_performed(), 0);
        assert_eq!(ctx.collapses_rejected(), 6);
    }

    #[test]
    fn test_single_step_on_grid() {
        let mut ctx = DecimationContext::new(&make_plane_grid(4), serial()).unwrap();
        let before = ctx.live_triangle_count();
        loop {
            match ctx.step() {
                Step::Collapsed { removed_faces } => {
                    assert!(removed_faces >= 1);
                    assert_eq!(ctx.live_triangle_count(), before - removed_faces);
                    break;
                }
                Step::Exhausted => panic!("grid should have a collapsible edge"),
                _ => {}
            }
        }
        assert_consistent(&ctx);
    }

    #[test]
    fn test_face_count_never_increases() {
        let mut ctx = DecimationContext::new(&make_plane_grid(6), serial()).unwrap();
        let mut previous = ctx.live_triangle_count();
        while ctx.step() != Step::Exhausted {
            let current = ctx.live_triangle_count();
            assert!(current <= previous);
            previous = current;
            assert_consistent(&ctx);
            if current <= 10 {
                break;
            }
        }
    }

    #[test]
    fn test_collapse_moves_survivor_to_cached_position() {
        let mut ctx = DecimationContext::new(&make_plane_grid(4), serial()).unwrap();
        let snapshot: Vec<(usize, usize, Point3d, Quadric)> = ctx
            .registry()
            .live_edges()
            .map(|(_, e)| (e.v1, e.v2, e.position, e.quadric))
            .collect();
        loop {
            if let Step::Collapsed { .. } = ctx.step() {
                break;
            }
        }
        let deleted: Vec<usize> = (0..16).filter(|&v| ctx.is_deleted(v)).collect();
        assert_eq!(deleted.len(), 1);
        assert!(snapshot.iter().any(|(v1, v2, position, quadric)| {
            *v2 == deleted[0]
                && !ctx.is_deleted(*v1)
                && ctx.position(*v1) == position
                && ctx.quadric(*v1) == quadric
        }));
    }

    #[test]
    fn test_preserve_boundary_parks_boundary_edges() {
        let config = serial().with_preserve_boundary(true);
        let ctx = DecimationContext::new(&make_plane_grid(3), config).unwrap();
        // Only the centre vertex is interior, and all its edges reach the rim
        assert_eq!(ctx.queue_len(), 0);
        for (_, edge) in ctx.registry().live_edges() {
            assert_eq!(edge.state, EdgeState::Parked);
        }
    }

    #[test]
    fn test_boundary_penalty_raises_cost() {
        let plain = DecimationContext::new(&make_plane_grid(3), serial()).unwrap();
        let penalised =
            DecimationContext::new(&make_plane_grid(3), serial().with_boundary_penalty(10.0))
                .unwrap();
        for ((_, a), (_, b)) in plain.registry().live_edges().zip(penalised.registry().live_edges()) {
            assert_relative_eq!(b.cost, a.cost + 10.0);
        }
    }

    #[test]
    fn test_max_error_stops_loop() {
        let mesh = make_tetrahedron();
        let mut ctx = DecimationContext::new(&mesh, serial().with_max_error(-1.0)).unwrap();
        assert_eq!(ctx.run(0, None).unwrap(), Termination::ErrorThresholdExceeded);
        assert_eq!(ctx.live_triangle_count(), 4);
    }

    #[test]
    fn test_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let mut ctx = DecimationContext::new(&make_plane_grid(5), serial()).unwrap();
        let err = ctx.run(0, Some(&token)).unwrap_err();
        assert_eq!(err, Error::Cancelled { collapses: 0 });
    }

    #[test]
    fn test_lazy_queue_skips_stale_entries() {
        let config = serial().with_queue_strategy(QueueStrategy::Lazy);
        let mut ctx = DecimationContext::new(&make_plane_grid(6), config).unwrap();
        ctx.run(0, None).unwrap();
        assert!(ctx.collapses_performed() > 0);
        assert!(ctx.stale_entries_skipped() > 0);
        assert_consistent(&ctx);
    }

    #[test]
    fn test_degenerate_input_faces_dropped() {
        let mut mesh = make_tetrahedron();
        mesh.add_face([0, 0, 1]);
        let ctx = DecimationContext::new(&mesh, serial()).unwrap();
        assert_eq!(ctx.live_triangle_count(), 4);
        assert_eq!(ctx.into_mesh().face_count(), 4);
    }

    #[test]
    fn test_non_manifold_edge_refused() {
        // Three fins hinged on edge (0, 1)
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, -0.5, 0.8),
                Point3f::new(0.5, -0.5, -0.8),
            ],
            vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        );
        let mut ctx = DecimationContext::new(&mesh, serial()).unwrap();
        let hinge = ctx.registry().find(0, 1).unwrap();
        assert_eq!(ctx.registry().get(hinge).triangles.len(), 3);
        assert!(!ctx.collapse_allowed(hinge));

        let fin_edge = ctx.registry().find(0, 2).unwrap();
        assert!(ctx.collapse_allowed(fin_edge));

        loop {
            match ctx.step() {
                Step::Collapsed { removed_faces } => assert!(removed_faces <= 2),
                Step::Exhausted => break,
                _ => {}
            }
            assert_consistent(&ctx);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut mesh = make_tetrahedron();
        mesh.add_face([0, 1, 4]);
        assert!(matches!(
            DecimationContext::new(&mesh, serial()),
            Err(Error::IndexOutOfRange { index: 4, .. })
        ));
    }
}
