//! Error types for lodcrate

use thiserror::Error;

/// Main error type for lodcrate operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(
        "Face {face} corner {corner} references vertex {index}, but the mesh has only {vertex_count} vertices"
    )]
    IndexOutOfRange {
        face: usize,
        corner: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("Target triangle count must not be negative, got {0}")]
    NegativeTarget(i64),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Decimation cancelled after {collapses} collapses")]
    Cancelled { collapses: usize },
}

/// Result type alias for lodcrate operations
pub type Result<T> = std::result::Result<T, Error>;
