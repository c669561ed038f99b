//! Optimize pass over a scene
//!
//! Each geometry-carrying node runs the same fixed sequence of stages on a
//! private copy of its mesh; the node's geometry is replaced once the whole
//! sequence is done. Independent nodes run in parallel.

use crate::options::OptimizeOptions;
use crate::subdivision::subdivide;
use meshprep_algorithms::{normalize_with, split_edges, triangle_count, WeldOptions};
use meshprep_core::{SceneNode, StageOutcome, StageStatus, TriangleMesh};
use meshprep_simplification::Decimator;
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, info, warn};

/// A step of the per-node sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Normalize,
    PreserveEdges,
    Decimate,
    RestoreEdges,
    Subdivide,
    CoarseSplit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Normalize => "normalize",
            Stage::PreserveEdges => "preserve-edges",
            Stage::Decimate => "decimate",
            Stage::RestoreEdges => "restore-edges",
            Stage::Subdivide => "subdivide",
            Stage::CoarseSplit => "coarse-split",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
}

/// What happened to one mesh node during a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub name: String,
    pub triangles_before: usize,
    pub triangles_after: usize,
    pub stages: Vec<StageRecord>,
}

impl NodeReport {
    pub fn status_of(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages.iter().find(|r| r.stage == stage).map(|r| &r.status)
    }

    /// Stages that fell back after an internal failure.
    pub fn fallbacks(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages
            .iter()
            .filter(|r| matches!(r.status, StageStatus::Fallback(_)))
    }
}

/// Result of optimizing a whole asset.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeReport {
    /// Generation counter after the pass.
    pub generation: u64,
    /// One entry per mesh node, depth-first.
    pub nodes: Vec<NodeReport>,
}

impl OptimizeReport {
    pub fn triangles_before(&self) -> usize {
        self.nodes.iter().map(|n| n.triangles_before).sum()
    }

    pub fn triangles_after(&self) -> usize {
        self.nodes.iter().map(|n| n.triangles_after).sum()
    }

    pub fn node(&self, name: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Runs the optimize sequence. Holds configuration only and can be shared
/// across assets and threads.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    decimator: Decimator,
    weld: WeldOptions,
}

impl Orchestrator {
    pub fn new(decimator: Decimator, weld: WeldOptions) -> Self {
        Self { decimator, weld }
    }

    /// Optimize every geometry-carrying node under `root`. Nodes without
    /// geometry are left untouched.
    pub fn optimize_scene(&self, root: &mut SceneNode, options: &OptimizeOptions) -> Vec<NodeReport> {
        let mut slots = root.mesh_slots_mut();
        debug!(nodes = slots.len(), "optimizing scene");
        slots
            .par_iter_mut()
            .map(|slot| self.optimize_node(slot.name, slot.geometry, options))
            .collect()
    }

    /// Optimize a single node's mesh in place.
    pub fn optimize_node(&self, name: &str, geometry: &mut TriangleMesh, options: &OptimizeOptions) -> NodeReport {
        let triangles_before = triangle_count(geometry);
        let (optimized, stages) = self.optimize_mesh(geometry.clone(), options);
        *geometry = optimized;
        let triangles_after = triangle_count(geometry);

        let report = NodeReport {
            name: name.to_string(),
            triangles_before,
            triangles_after,
            stages,
        };
        for record in report.fallbacks() {
            warn!(node = name, stage = %record.stage, status = ?record.status, "stage fell back");
        }
        info!(node = name, triangles_before, triangles_after, "optimized node");
        report
    }

    /// Run the stage sequence on an owned mesh.
    pub fn optimize_mesh(&self, mesh: TriangleMesh, options: &OptimizeOptions) -> (TriangleMesh, Vec<StageRecord>) {
        let mut stages = Vec::new();
        let mut mesh = mesh;

        if options.preserve_edges {
            mesh = record(&mut stages, Stage::Normalize, normalize_with(mesh, self.weld));
            mesh = record(
                &mut stages,
                Stage::PreserveEdges,
                split_edges(mesh, options.split_angle_deg),
            );
        }

        if let Some(budget) = options.triangle_budget() {
            let outcome = self.decimator.decimate(mesh, budget);
            let decimated = outcome.is_applied();
            mesh = record(&mut stages, Stage::Decimate, outcome);
            // Decimation merges split seams, so sharp edges are split again.
            if options.preserve_edges && decimated {
                mesh = record(
                    &mut stages,
                    Stage::RestoreEdges,
                    split_edges(mesh, options.split_angle_deg),
                );
            }
        }

        if options.subdivides() {
            mesh = record(
                &mut stages,
                Stage::Subdivide,
                subdivide(mesh, options.iterations, options.weight),
            );
        }

        if options.split {
            mesh = record(
                &mut stages,
                Stage::CoarseSplit,
                split_edges(mesh, options.split_angle_coarse_deg),
            );
            mesh.compute_vertex_normals();
        }

        mesh.recompute_derived();
        (mesh, stages)
    }
}

fn record(stages: &mut Vec<StageRecord>, stage: Stage, outcome: StageOutcome<TriangleMesh>) -> TriangleMesh {
    let (mesh, status) = outcome.into_parts();
    debug!(%stage, ?status, vertices = mesh.vertex_count(), "stage finished");
    stages.push(StageRecord { stage, status });
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshprep_core::{NoOpReason, Point3f};

    fn make_cube() -> TriangleMesh {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            [0, 2, 1], [0, 3, 2],
            [4, 5, 6], [4, 6, 7],
            [0, 1, 5], [0, 5, 4],
            [3, 6, 2], [3, 7, 6],
            [0, 4, 7], [0, 7, 3],
            [1, 2, 6], [1, 6, 5],
        ];
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    fn statuses(stages: &[StageRecord]) -> Vec<(Stage, StageStatus)> {
        stages.iter().map(|r| (r.stage, r.status.clone())).collect()
    }

    #[test]
    fn test_default_options_only_recompute() {
        let orchestrator = Orchestrator::default();
        let (mesh, stages) = orchestrator.optimize_mesh(make_cube(), &OptimizeOptions::default());
        assert!(stages.is_empty());
        assert_eq!(mesh.vertex_count(), 8);
        assert!(mesh.normals.is_some());
        assert!(mesh.bounding_box.is_some());
        assert!(mesh.bounding_sphere.is_some());
    }

    #[test]
    fn test_preserve_edges_on_raw_cube() {
        let orchestrator = Orchestrator::default();
        let options = OptimizeOptions::new().with_preserve_edges(30.0).flat_only();
        let (mesh, stages) = orchestrator.optimize_mesh(make_cube().to_non_indexed(), &options);
        assert_eq!(
            statuses(&stages),
            vec![
                (Stage::Normalize, StageStatus::Applied),
                (Stage::PreserveEdges, StageStatus::Applied),
            ]
        );
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn test_stage_order_and_no_ops() {
        let orchestrator = Orchestrator::default();
        let options = OptimizeOptions {
            max_triangles: Some(1_000),
            preserve_edges: true,
            split: true,
            iterations: 1,
            ..OptimizeOptions::default()
        };
        let (_, stages) = orchestrator.optimize_mesh(make_cube(), &options);
        assert_eq!(
            statuses(&stages),
            vec![
                (Stage::Normalize, StageStatus::Unchanged(NoOpReason::AlreadyIndexed)),
                (Stage::PreserveEdges, StageStatus::Applied),
                (Stage::Decimate, StageStatus::Unchanged(NoOpReason::WithinBudget)),
                (Stage::Subdivide, StageStatus::Unchanged(NoOpReason::SubdivisionReserved)),
                (Stage::CoarseSplit, StageStatus::Applied),
            ]
        );
    }

    #[test]
    fn test_coarse_split_needs_index() {
        let orchestrator = Orchestrator::default();
        let options = OptimizeOptions::new().with_coarse_split(60.0).flat_only();
        let (mesh, stages) = orchestrator.optimize_mesh(make_cube().to_non_indexed(), &options);
        assert_eq!(
            statuses(&stages),
            vec![(
                Stage::CoarseSplit,
                StageStatus::Unchanged(NoOpReason::SplitPreconditionUnmet)
            )]
        );
        assert_eq!(mesh.vertex_count(), 36);
        assert_eq!(mesh.normals.as_ref().map(|n| n.len()), Some(36));
    }

    #[test]
    fn test_scene_skips_transform_nodes() {
        let mut root = SceneNode::new("root")
            .with_child(SceneNode::with_geometry("a", make_cube().to_non_indexed()))
            .with_child(SceneNode::new("empty"))
            .with_child(SceneNode::with_geometry("b", make_cube()));
        let untouched = root.children[1].clone();

        let options = OptimizeOptions::new().with_preserve_edges(30.0);
        let reports = Orchestrator::default().optimize_scene(&mut root, &options);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name, "a");
        assert_eq!(reports[1].name, "b");
        assert!(reports.iter().all(|r| r.triangles_before == 12 && r.triangles_after == 12));
        assert_eq!(root.children[1], untouched);
        assert_eq!(root.find("a").and_then(|n| n.geometry.as_ref()).map(|m| m.vertex_count()), Some(24));
    }

    #[test]
    fn test_fallback_is_reported() {
        let mut mesh = make_cube();
        mesh.add_face([0, 1, 50]);
        let options = OptimizeOptions::new().with_preserve_edges(30.0);
        let mut geometry = mesh;
        let report = Orchestrator::default().optimize_node("broken", &mut geometry, &options);
        assert!(matches!(
            report.status_of(Stage::PreserveEdges),
            Some(StageStatus::Fallback(_))
        ));
        assert_eq!(report.fallbacks().count(), 1);
        assert_eq!(geometry.vertex_count(), 8);
    }
}
