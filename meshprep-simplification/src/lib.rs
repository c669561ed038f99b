//! Mesh simplification and decimation algorithms
//!
//! This crate reduces mesh complexity while preserving important geometric
//! features:
//! - Edge collapse driven by quadric error metrics
//! - Budget-driven decimation used by the optimize pipeline

pub mod edge_collapse;
pub mod decimate;

pub use edge_collapse::*;
pub use decimate::*;

use meshprep_core::{Result, TriangleMesh};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh with target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh>;
}
