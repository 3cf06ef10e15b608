//! Result types for decimation

use std::fmt;

use lodcrate_core::TriangleMesh;

/// Why the collapse loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The input already had no more triangles than the target
    AlreadyBelowTarget,
    TargetReached,
    /// No collapsible edge remained before the target was reached
    QueueExhausted,
    /// The cheapest remaining collapse exceeded `max_error`
    ErrorThresholdExceeded,
}

impl Termination {
    /// Whether the output meets the requested triangle count.
    pub fn reached_target(&self) -> bool {
        matches!(self, Termination::AlreadyBelowTarget | Termination::TargetReached)
    }
}

/// Outcome of one decimation call.
#[derive(Debug, Clone)]
pub struct DecimationResult {
    pub mesh: TriangleMesh,
    pub original_triangles: usize,
    pub final_triangles: usize,
    pub collapses_performed: usize,
    /// Candidates refused by the topology guard
    pub collapses_rejected: usize,
    /// Superseded or dead queue entries discarded on pop
    pub stale_entries_skipped: usize,
    pub termination: Termination,
}

impl DecimationResult {
    /// Final / original triangle count.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_triangles == 0 {
            1.0
        } else {
            self.final_triangles as f64 / self.original_triangles as f64
        }
    }

    pub fn was_decimated(&self) -> bool {
        self.collapses_performed > 0
    }
}

impl fmt::Display for DecimationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Decimation: {} -> {} triangles ({:.1}% reduction, {} collapses, {:?})",
            self.original_triangles,
            self.final_triangles,
            (1.0 - self.reduction_ratio()) * 100.0,
            self.collapses_performed,
            self.termination
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(final_triangles: usize, collapses: usize) -> DecimationResult {
        DecimationResult {
            mesh: TriangleMesh::new(),
            original_triangles: 1000,
            final_triangles,
            collapses_performed: collapses,
            collapses_rejected: 3,
            stale_entries_skipped: 12,
            termination: Termination::TargetReached,
        }
    }

    #[test]
    fn test_reduction_ratio() {
        let result = sample(250, 375);
        assert!((result.reduction_ratio() - 0.25).abs() < 1e-12);
        assert!(result.was_decimated());
        assert!(!sample(1000, 0).was_decimated());
    }

    #[test]
    fn test_display() {
        let display = sample(500, 250).to_string();
        assert!(display.contains("1000 -> 500"));
        assert!(display.contains("50.0%"));
        assert!(display.contains("TargetReached"));
    }

    #[test]
    fn test_reached_target() {
        assert!(Termination::TargetReached.reached_target());
        assert!(Termination::AlreadyBelowTarget.reached_target());
        assert!(!Termination::QueueExhausted.reached_target());
        assert!(!Termination::ErrorThresholdExceeded.reached_target());
    }
}
