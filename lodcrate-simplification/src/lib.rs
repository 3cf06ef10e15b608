//! Quadric error mesh decimation
//!
//! This crate reduces the triangle count of an indexed triangle mesh by
//! greedy edge collapse ordered by the Garland-Heckbert quadric error
//! metric:
//! - Per-vertex error quadrics accumulated from incident face planes
//! - An edge registry with cached collapse candidates
//! - Indexed or lazy-deletion priority queues
//! - A topology guard that keeps manifold surfaces manifold
//! - Compaction of the surviving vertices and faces
//!
//! ```no_run
//! use lodcrate_core::TriangleMesh;
//! use lodcrate_simplification::decimate;
//!
//! # fn run(mesh: &TriangleMesh) -> lodcrate_core::Result<()> {
//! let result = decimate(mesh, 1000)?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod compact;
pub mod config;
pub mod cost;
pub mod decimate;
pub mod edge_registry;
pub mod quadric;
pub mod queue;
pub mod result;
pub mod scheduler;

pub use cancel::CancellationToken;
pub use config::{DecimationConfig, QueueStrategy};
pub use cost::{evaluate_collapse, CollapseCost};
pub use decimate::{decimate, QuadricDecimator};
pub use edge_registry::{EdgeId, EdgeRecord, EdgeRegistry, EdgeState};
pub use quadric::{Plane, Quadric};
pub use queue::{CollapseQueue, IndexedQueue, LazyQueue, QueueEntry};
pub use result::{DecimationResult, Termination};
pub use scheduler::{DecimationContext, Step};

use lodcrate_core::{Result, TriangleMesh};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh with target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh>;
}
