//! # meshprep pipeline
//!
//! Sequences the mesh stages over a loaded scene:
//! - [`OptimizeOptions`]: the knobs of one optimize pass, parsable from JSON
//! - [`Orchestrator`]: per-node normalize, split, decimate, subdivide, resplit
//! - [`Asset`]: load/ground/optimize lifecycle with a busy lock and a
//!   generation counter
//! - [`PipelineObserver`]: host callbacks for grounding, readiness and busy state

pub mod options;
pub mod subdivision;
pub mod orchestrator;
pub mod observer;
pub mod asset;

pub use options::*;
pub use subdivision::*;
pub use orchestrator::*;
pub use observer::*;
pub use asset::*;
