//! Loaded asset lifecycle
//!
//! An [`Asset`] owns one scene and moves through
//! `Idle -> Loading -> Grounded -> (Optimizing -> Grounded)*`. The scene sits
//! behind an exclusive lock; an optimize pass holds it for its whole
//! duration, so a second pass, a reload or a read during the pass is
//! rejected with [`Error::Busy`] instead of waiting.

use crate::observer::{NoopObserver, PipelineObserver};
use crate::options::OptimizeOptions;
use crate::orchestrator::{OptimizeReport, Orchestrator};
use meshprep_algorithms::{ground, GroundingReport, ScaleState};
use meshprep_core::{Axis, Error, Result, SceneNode, StageOutcome, Transform3D};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetState {
    Idle,
    Loading,
    Grounded,
    Optimizing,
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetState::Idle => "idle",
            AssetState::Loading => "loading",
            AssetState::Grounded => "grounded",
            AssetState::Optimizing => "optimizing",
        };
        f.write_str(s)
    }
}

/// A loaded scene plus its grounding, scale and generation bookkeeping.
pub struct Asset {
    scene: Mutex<Option<SceneNode>>,
    state: Mutex<AssetState>,
    generation: AtomicU64,
    grounding: Mutex<Option<GroundingReport>>,
    scale: Mutex<ScaleState>,
    up: Axis,
    parent_world: Transform3D,
    observer: Arc<dyn PipelineObserver>,
}

impl Default for Asset {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .field("up", &self.up)
            .finish_non_exhaustive()
    }
}

impl Asset {
    /// An empty asset, Y up, attached directly under the world root.
    pub fn new() -> Self {
        Self {
            scene: Mutex::new(None),
            state: Mutex::new(AssetState::Idle),
            generation: AtomicU64::new(0),
            grounding: Mutex::new(None),
            scale: Mutex::new(ScaleState::default()),
            up: Axis::Y,
            parent_world: Transform3D::identity(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_up_axis(mut self, up: Axis) -> Self {
        self.up = up;
        self
    }

    /// World transform of the node the scene root is attached under.
    pub fn with_parent_world(mut self, parent_world: Transform3D) -> Self {
        self.parent_world = parent_world;
        self
    }

    pub fn state(&self) -> AssetState {
        *self.state.lock()
    }

    pub fn is_optimizing(&self) -> bool {
        self.state() == AssetState::Optimizing
    }

    /// Number of completed optimize passes since creation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Report from the most recent successful grounding.
    pub fn grounding(&self) -> Option<GroundingReport> {
        *self.grounding.lock()
    }

    pub fn scale(&self) -> ScaleState {
        *self.scale.lock()
    }

    fn set_state(&self, state: AssetState) {
        *self.state.lock() = state;
    }

    fn expect_state(&self, allowed: &[AssetState]) -> Result<()> {
        let found = self.state();
        if allowed.contains(&found) {
            return Ok(());
        }
        let expected = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(Error::InvalidState {
            expected,
            found: found.to_string(),
        })
    }

    /// Mark the start of an external load. A previously loaded scene stays
    /// in place until [`Asset::finish_load`] replaces it.
    pub fn begin_load(&self) -> Result<()> {
        let _scene = self.scene.try_lock().ok_or(Error::Busy)?;
        self.expect_state(&[AssetState::Idle, AssetState::Grounded])?;
        self.set_state(AssetState::Loading);
        Ok(())
    }

    /// Install the decoded scene and ground it.
    ///
    /// If grounding fails with [`Error::MalformedGeometry`] the scene is still
    /// installed, untranslated, and the asset becomes `Grounded`; the error is
    /// returned so the host can report it.
    pub fn finish_load(&self, mut scene: SceneNode) -> Result<GroundingReport> {
        let mut slot = self.scene.try_lock().ok_or(Error::Busy)?;
        self.expect_state(&[AssetState::Loading])?;

        let grounded = ground(&mut scene, &self.parent_world, self.up);
        self.scale.lock().set_scale(scene.transform.scale);
        info!(
            scene = %scene.name,
            mesh_nodes = scene.mesh_node_count(),
            "asset loaded"
        );
        *slot = Some(scene);
        self.set_state(AssetState::Grounded);

        match grounded {
            Ok(report) => {
                *self.grounding.lock() = Some(report);
                self.observer.on_grounded(&report);
                Ok(report)
            }
            Err(error) => {
                warn!(%error, "grounding skipped");
                *self.grounding.lock() = None;
                Err(error)
            }
        }
    }

    /// Convenience for a load whose decoding has already finished.
    pub fn load(&self, scene: SceneNode) -> Result<GroundingReport> {
        self.begin_load()?;
        self.finish_load(scene)
    }

    /// Drop the scene and return to `Idle`.
    pub fn unload(&self) -> Result<()> {
        let mut slot = self.scene.try_lock().ok_or(Error::Busy)?;
        *slot = None;
        *self.grounding.lock() = None;
        self.set_state(AssetState::Idle);
        Ok(())
    }

    /// Run one optimize pass over every mesh node.
    ///
    /// Fails with [`Error::Busy`] if another pass holds the scene, and with
    /// [`Error::InvalidState`] unless the asset is `Grounded`. On success the
    /// generation counter is incremented and the observer is told.
    pub fn optimize(&self, orchestrator: &Orchestrator, options: &OptimizeOptions) -> Result<OptimizeReport> {
        options.validate()?;
        let Some(mut slot) = self.scene.try_lock() else {
            warn!("optimize rejected, a pass is already running");
            return Err(Error::Busy);
        };
        self.expect_state(&[AssetState::Grounded])?;
        let scene = slot.as_mut().ok_or_else(|| Error::InvalidState {
            expected: AssetState::Grounded.to_string(),
            found: AssetState::Idle.to_string(),
        })?;

        let busy = BusyGuard::enter(self);
        let nodes = orchestrator.optimize_scene(scene, options);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        drop(busy);

        info!(generation, nodes = nodes.len(), "optimize pass finished");
        self.observer.on_ready(generation);
        Ok(OptimizeReport { generation, nodes })
    }

    /// Read the scene. Fails while a pass holds it.
    pub fn with_scene<R>(&self, f: impl FnOnce(&SceneNode) -> R) -> Result<R> {
        let slot = self.scene.try_lock().ok_or(Error::Busy)?;
        let scene = slot.as_ref().ok_or_else(|| Error::InvalidState {
            expected: AssetState::Grounded.to_string(),
            found: self.state().to_string(),
        })?;
        Ok(f(scene))
    }

    /// Scale the scene root so that `axis` measures `target` units, then
    /// ground it again.
    ///
    /// Out-of-range input leaves the scale unchanged and is reported as such.
    pub fn fit_dimension(&self, axis: Axis, target: f32) -> Result<StageOutcome<f32>> {
        let mut slot = self.scene.try_lock().ok_or(Error::Busy)?;
        self.expect_state(&[AssetState::Grounded])?;
        let base = self.grounding().map(|g| g.base).ok_or_else(|| {
            Error::MalformedGeometry("asset has no grounded geometry to measure".to_string())
        })?;
        let scene = slot.as_mut().ok_or_else(|| Error::InvalidState {
            expected: AssetState::Grounded.to_string(),
            found: AssetState::Idle.to_string(),
        })?;

        let outcome = self.scale.lock().fit_axis(axis, target, &base, 1.0);
        if let StageOutcome::Applied(scale) = outcome {
            scene.transform.scale = scale;
            let report = ground(scene, &self.parent_world, self.up)?;
            *self.grounding.lock() = Some(report);
            self.observer.on_grounded(&report);
        }
        Ok(outcome)
    }
}

/// Marks the asset as optimizing for as long as it lives.
struct BusyGuard<'a> {
    asset: &'a Asset,
}

impl<'a> BusyGuard<'a> {
    fn enter(asset: &'a Asset) -> Self {
        asset.set_state(AssetState::Optimizing);
        asset.observer.on_busy_changed(true);
        Self { asset }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.asset.set_state(AssetState::Grounded);
        self.asset.observer.on_busy_changed(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshprep_core::{NoOpReason, Point3f, TriangleMesh};

    fn make_box(min: Point3f, max: Point3f) -> TriangleMesh {
        let c = |x: bool, y: bool, z: bool| {
            Point3f::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };
        let vertices = vec![
            c(false, false, false),
            c(true, false, false),
            c(true, true, false),
            c(false, true, false),
            c(false, false, true),
            c(true, false, true),
            c(true, true, true),
            c(false, true, true),
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

    fn box_scene() -> SceneNode {
        SceneNode::new("root").with_child(SceneNode::with_geometry(
            "body",
            make_box(Point3f::new(0.0, 5.0, 0.0), Point3f::new(25.0, 15.0, 40.0)),
        ))
    }

    #[test]
    fn test_state_machine() {
        let asset = Asset::new();
        assert_eq!(asset.state(), AssetState::Idle);
        asset.begin_load().unwrap();
        assert_eq!(asset.state(), AssetState::Loading);
        assert!(matches!(asset.begin_load(), Err(Error::InvalidState { .. })));
        asset.finish_load(box_scene()).unwrap();
        assert_eq!(asset.state(), AssetState::Grounded);
        asset.unload().unwrap();
        assert_eq!(asset.state(), AssetState::Idle);
    }

    #[test]
    fn test_optimize_requires_grounded() {
        let asset = Asset::new();
        let result = asset.optimize(&Orchestrator::default(), &OptimizeOptions::default());
        assert!(matches!(result, Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_busy_while_locked() {
        let asset = Asset::new();
        asset.load(box_scene()).unwrap();
        let _held = asset.scene.lock();
        let result = asset.optimize(&Orchestrator::default(), &OptimizeOptions::default());
        assert!(matches!(result, Err(Error::Busy)));
        assert!(matches!(asset.begin_load(), Err(Error::Busy)));
    }

    #[test]
    fn test_optimize_bumps_generation() {
        let asset = Asset::new();
        asset.load(box_scene()).unwrap();
        let report = asset
            .optimize(&Orchestrator::default(), &OptimizeOptions::default())
            .unwrap();
        assert_eq!(report.generation, 1);
        assert_eq!(asset.generation(), 1);
        assert_eq!(asset.state(), AssetState::Grounded);
        assert!(!asset.is_optimizing());
    }

    #[test]
    fn test_fit_dimension_rescales_and_regrounds() {
        let asset = Asset::new();
        let report = asset.load(box_scene()).unwrap();
        assert_relative_eq!(report.base.x, 25.0);

        let outcome = asset.fit_dimension(Axis::X, 100.0).unwrap();
        assert!(outcome.is_applied());
        assert_relative_eq!(*outcome.value(), 4.0);

        let grounding = asset.grounding().unwrap();
        assert_relative_eq!(grounding.scaled.x, 100.0, epsilon = 1e-3);
        assert_relative_eq!(grounding.base.x, 25.0, epsilon = 1e-4);
        let min_y = asset
            .with_scene(|s| s.world_bounding_box(&Transform3D::identity()).unwrap().min.y)
            .unwrap();
        assert!(min_y.abs() < 1e-4);
    }

    #[test]
    fn test_fit_dimension_invalid_target() {
        let asset = Asset::new();
        asset.load(box_scene()).unwrap();
        let outcome = asset.fit_dimension(Axis::Y, -3.0).unwrap();
        assert_eq!(outcome.reason(), Some(NoOpReason::InvalidScaleInput));
        assert_relative_eq!(asset.scale().scale, 1.0);
    }

    #[test]
    fn test_malformed_scene_still_loads() {
        let asset = Asset::new();
        let scene = SceneNode::with_geometry(
            "flat",
            TriangleMesh::from_raw(vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)]),
        );
        assert!(matches!(asset.load(scene), Err(Error::MalformedGeometry(_))));
        assert_eq!(asset.state(), AssetState::Grounded);
        assert!(asset.grounding().is_none());
        assert_eq!(asset.with_scene(|s| s.name.clone()).unwrap(), "flat");
    }
}
