//! Core data structures and traits for meshprep
//!
//! This crate provides the fundamental types shared by every pipeline stage:
//! triangle meshes (indexed or raw), bounding volumes, transforms, the error
//! taxonomy and the per-stage outcome type.

pub mod point;
pub mod bounds;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod outcome;
pub mod scene;
pub mod error;

pub use point::*;
pub use bounds::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use outcome::*;
pub use scene::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4, UnitQuaternion};
