//! Core data structures for lodcrate
//!
//! This crate provides the fundamental types shared by the decimation engine:
//! point aliases, the indexed triangle mesh with its flat-buffer boundary,
//! and the common error type.

pub mod point;
pub mod mesh;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};

// Type aliases for easier imports
pub type Point = Point3f;
pub type Mesh = TriangleMesh;
