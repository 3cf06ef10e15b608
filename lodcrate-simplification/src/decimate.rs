//! Public decimation entry points

use tracing::info;

use lodcrate_core::{Error, Result, TriangleMesh};

use crate::cancel::CancellationToken;
use crate::config::DecimationConfig;
use crate::result::{DecimationResult, Termination};
use crate::scheduler::DecimationContext;
use crate::MeshSimplifier;

/// Quadric error metric decimator.
///
/// Repeatedly collapses the edge whose merged quadric has the lowest error
/// until the mesh has at most the requested number of triangles.
#[derive(Debug, Clone, Default)]
pub struct QuadricDecimator {
    pub config: DecimationConfig,
}

impl QuadricDecimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecimationConfig) -> Self {
        Self { config }
    }

    /// Reduce `mesh` to at most `target` triangles where the topology allows.
    pub fn decimate(&self, mesh: &TriangleMesh, target: i64) -> Result<DecimationResult> {
        self.run(mesh, target, None)
    }

    /// Like [`decimate`](Self::decimate), returning [`Error::Cancelled`] once
    /// `token` is cancelled.
    pub fn decimate_with_cancel(
        &self,
        mesh: &TriangleMesh,
        target: i64,
        token: &CancellationToken,
    ) -> Result<DecimationResult> {
        self.run(mesh, target, Some(token))
    }

    /// Decimate flat position / index buffers and return new flat buffers.
    pub fn decimate_buffers(
        &self,
        positions: &[f32],
        indices: &[u32],
        target: i64,
    ) -> Result<(Vec<f32>, Vec<u32>)> {
        let mesh = TriangleMesh::from_flat_buffers(positions, indices)?;
        let result = self.decimate(&mesh, target)?;
        Ok((
            result.mesh.positions_flat().to_vec(),
            result.mesh.indices_flat(),
        ))
    }

    fn run(
        &self,
        mesh: &TriangleMesh,
        target: i64,
        cancel: Option<&CancellationToken>,
    ) -> Result<DecimationResult> {
        if target < 0 {
            return Err(Error::NegativeTarget(target));
        }
        mesh.validate()?;
        self.config.validate()?;

        let target = usize::try_from(target).unwrap_or(usize::MAX);
        let original_triangles = mesh.face_count();

        if target >= original_triangles {
            info!(
                triangles = original_triangles,
                target_triangles = target,
                "Mesh already at or below target, skipping decimation"
            );
            return Ok(DecimationResult {
                mesh: mesh.clone(),
                original_triangles,
                final_triangles: original_triangles,
                collapses_performed: 0,
                collapses_rejected: 0,
                stale_entries_skipped: 0,
                termination: Termination::AlreadyBelowTarget,
            });
        }

        info!(
            vertices = mesh.vertex_count(),
            triangles = original_triangles,
            target_triangles = target,
            strategy = ?self.config.queue_strategy,
            "Starting quadric decimation"
        );

        let mut ctx = DecimationContext::new(mesh, self.config.clone())?;
        let termination = ctx.run(target, cancel)?;

        let collapses_performed = ctx.collapses_performed();
        let collapses_rejected = ctx.collapses_rejected();
        let stale_entries_skipped = ctx.stale_entries_skipped();
        let output = ctx.into_mesh();

        let result = DecimationResult {
            final_triangles: output.face_count(),
            mesh: output,
            original_triangles,
            collapses_performed,
            collapses_rejected,
            stale_entries_skipped,
            termination,
        };

        info!(
            triangles = result.final_triangles,
            vertices = result.mesh.vertex_count(),
            collapses = collapses_performed,
            rejected = collapses_rejected,
            termination = ?termination,
            "Decimation complete"
        );
        Ok(result)
    }
}

impl MeshSimplifier for QuadricDecimator {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        if !(0.0..=1.0).contains(&reduction_ratio) {
            return Err(Error::InvalidParameter(format!(
                "Reduction ratio must be between 0.0 and 1.0, got {}",
                reduction_ratio
            )));
        }
        let keep = (1.0 - f64::from(reduction_ratio)) * mesh.face_count() as f64;
        let target = keep.floor() as i64;
        Ok(self.decimate(mesh, target)?.mesh)
    }
}

/// Decimate `mesh` to at most `target` triangles with the default
/// configuration.
pub fn decimate(mesh: &TriangleMesh, target: i64) -> Result<DecimationResult> {
    QuadricDecimator::new().decimate(mesh, target)
}
