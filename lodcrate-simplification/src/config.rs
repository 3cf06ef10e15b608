//! Decimation configuration

use serde::{Deserialize, Serialize};

use lodcrate_core::{Error, Result};

/// Priority queue discipline used by the collapse scheduler.
///
/// Both produce the same mesh; they differ only in how superseded costs are
/// handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueueStrategy {
    /// Indexed heap with in-place priority updates and removal.
    #[default]
    Indexed,
    /// Binary heap that leaves superseded entries in place and skips them on pop.
    Lazy,
}

/// Parameters for quadric error decimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimationConfig {
    pub queue_strategy: QueueStrategy,
    /// Stop once the cheapest remaining collapse costs more than this
    pub max_error: Option<f64>,
    /// Never collapse an edge with a boundary endpoint
    pub preserve_boundary: bool,
    /// Extra cost added to boundary edges
    pub boundary_penalty: f64,
    /// Score the initial edge set on the rayon thread pool
    pub parallel_scoring: bool,
    /// Loop iterations between cancellation checks
    pub cancel_check_interval: usize,
}

impl Default for DecimationConfig {
    fn default() -> Self {
        Self {
            queue_strategy: QueueStrategy::Indexed,
            max_error: None,
            preserve_boundary: false,
            boundary_penalty: 0.0,
            parallel_scoring: true,
            cancel_check_interval: 256,
        }
    }
}

impl DecimationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_strategy(mut self, strategy: QueueStrategy) -> Self {
        self.queue_strategy = strategy;
        self
    }

    pub fn with_max_error(mut self, max_error: f64) -> Self {
        self.max_error = Some(max_error);
        self
    }

    pub fn with_preserve_boundary(mut self, preserve: bool) -> Self {
        self.preserve_boundary = preserve;
        self
    }

    pub fn with_boundary_penalty(mut self, penalty: f64) -> Self {
        self.boundary_penalty = penalty;
        self
    }

    pub fn with_parallel_scoring(mut self, parallel: bool) -> Self {
        self.parallel_scoring = parallel;
        self
    }

    pub fn with_cancel_check_interval(mut self, interval: usize) -> Self {
        self.cancel_check_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cancel_check_interval == 0 {
            return Err(Error::InvalidParameter(
                "cancel_check_interval must be greater than zero".to_string(),
            ));
        }
        if !self.boundary_penalty.is_finite() || self.boundary_penalty < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "boundary_penalty must be a finite non-negative number, got {}",
                self.boundary_penalty
            )));
        }
        if let Some(max_error) = self.max_error {
            if max_error.is_nan() {
                return Err(Error::InvalidParameter("max_error must not be NaN".to_string()));
            }
        }
        Ok(())
    }
}
