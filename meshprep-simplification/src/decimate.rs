//! Budget-driven decimation
//!
//! Turns a triangle budget into a vertex target and hands it to the edge
//! collapse simplifier. The ratio is `budget / triangles`, clamped so a mesh
//! never loses more than 95% of its vertices in one pass.

use crate::edge_collapse::EdgeCollapseSimplifier;
use meshprep_algorithms::{triangle_count, weld_vertices, WeldOptions};
use meshprep_core::{Error, NoOpReason, StageOutcome, TriangleMesh};
use tracing::{info, warn};

/// Lower bound of the vertex keep ratio.
pub const MIN_VERTEX_RATIO: f32 = 0.05;

/// How a mesh will be reduced to meet a triangle budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecimationPlan {
    pub current_triangles: usize,
    pub current_vertices: usize,
    /// Fraction of vertices to keep, in `[MIN_VERTEX_RATIO, 1]`.
    pub ratio: f32,
    pub target_vertices: usize,
}

impl DecimationPlan {
    pub fn new(current_triangles: usize, current_vertices: usize, max_triangles: usize) -> Self {
        let ratio = if current_triangles == 0 {
            1.0
        } else {
            (max_triangles as f32 / current_triangles as f32).clamp(MIN_VERTEX_RATIO, 1.0)
        };
        let target_vertices = ((current_vertices as f64 * ratio as f64).floor() as usize).max(3);
        Self {
            current_triangles,
            current_vertices,
            ratio,
            target_vertices,
        }
    }
}

/// Reduces meshes to a triangle budget.
///
/// The collapse runs on position-welded topology: copies of a vertex made by
/// the edge splitter are merged first so both sides of a sharp edge move
/// together, and the output carries no split seams. Open boundaries may still
/// collapse, since imported assets are rarely closed and pinning every open
/// edge would leave most budgets unreachable.
#[derive(Debug, Clone)]
pub struct Decimator {
    simplifier: EdgeCollapseSimplifier,
    weld: WeldOptions,
}

impl Default for Decimator {
    fn default() -> Self {
        Self {
            simplifier: EdgeCollapseSimplifier::with_params(None, false, 100.0),
            weld: WeldOptions::default(),
        }
    }
}

impl Decimator {
    /// Weld tolerance used to merge seams before collapsing.
    pub fn with_weld(mut self, weld: WeldOptions) -> Self {
        self.weld = weld;
        self
    }

    /// Reduce `mesh` toward `max_triangles`.
    ///
    /// Meshes already within budget come back untouched. Otherwise the mesh is
    /// welded by position, raw or indexed, before collapsing. If the weld or
    /// the simplifier fails, the input comes back with normals and bounds
    /// recomputed.
    pub fn decimate(&self, mesh: TriangleMesh, max_triangles: usize) -> StageOutcome<TriangleMesh> {
        let current_triangles = triangle_count(&mesh);
        if current_triangles <= max_triangles {
            return StageOutcome::unchanged(mesh, NoOpReason::WithinBudget);
        }

        let welded = match weld_vertices(&mesh, self.weld) {
            Ok(welded) => welded,
            Err(error) => {
                warn!(%error, "weld before decimation failed, keeping original geometry");
                return fallback(mesh, error);
            }
        };
        let plan = DecimationPlan::new(current_triangles, welded.vertex_count(), max_triangles);

        match self.simplifier.collapse_to_vertex_count(&welded, plan.target_vertices) {
            Ok(mut reduced) => {
                reduced.recompute_derived();
                info!(
                    before = current_triangles,
                    after = reduced.face_count(),
                    welded_vertices = welded.vertex_count(),
                    target_vertices = plan.target_vertices,
                    ratio = plan.ratio,
                    "decimated mesh"
                );
                StageOutcome::Applied(reduced)
            }
            Err(error) => {
                warn!(%error, "decimation failed, keeping original geometry");
                fallback(mesh, Error::SimplifyFailure(error.to_string()))
            }
        }
    }
}

fn fallback(mut mesh: TriangleMesh, error: Error) -> StageOutcome<TriangleMesh> {
    mesh.recompute_derived();
    StageOutcome::fallback(mesh, error)
}
