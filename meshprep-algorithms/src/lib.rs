//! # meshprep algorithms
//!
//! The geometry stages that run before and around decimation:
//! vertex welding (topology normalization), triangle counting, grounding,
//! physical-dimension solving and edge-preserving vertex splitting.

pub mod weld;
pub mod counting;
pub mod grounding;
pub mod dimension;
pub mod edge_split;

// Re-export commonly used items
pub use weld::*;
pub use counting::*;
pub use grounding::*;
pub use dimension::*;
pub use edge_split::*;
