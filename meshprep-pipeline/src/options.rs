//! Optimize pass configuration

use meshprep_algorithms::{COARSE_SPLIT_ANGLE_DEG, DEFAULT_SPLIT_ANGLE_DEG};
use meshprep_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Options for one optimize pass. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizeOptions {
    /// Triangle budget per mesh node; `None` or 0 skips decimation.
    pub max_triangles: Option<usize>,
    /// Split sharp edges before decimating.
    pub preserve_edges: bool,
    pub split_angle_deg: f32,
    /// Run a coarser split after decimation.
    pub split: bool,
    pub split_angle_coarse_deg: f32,
    /// Skip the subdivision slot.
    pub flat_only: bool,
    /// Subdivision iterations, 0 or 1.
    pub iterations: u8,
    /// Subdivision smoothing weight in [0, 1].
    pub weight: f32,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_triangles: None,
            preserve_edges: false,
            split_angle_deg: DEFAULT_SPLIT_ANGLE_DEG,
            split: false,
            split_angle_coarse_deg: COARSE_SPLIT_ANGLE_DEG,
            flat_only: false,
            iterations: 0,
            weight: 0.5,
        }
    }
}

impl OptimizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate options sent by the host UI.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_max_triangles(mut self, max_triangles: usize) -> Self {
        self.max_triangles = Some(max_triangles);
        self
    }

    pub fn with_preserve_edges(mut self, angle_deg: f32) -> Self {
        self.preserve_edges = true;
        self.split_angle_deg = angle_deg;
        self
    }

    pub fn with_coarse_split(mut self, angle_deg: f32) -> Self {
        self.split = true;
        self.split_angle_coarse_deg = angle_deg;
        self
    }

    pub fn flat_only(mut self) -> Self {
        self.flat_only = true;
        self
    }

    /// Budget to decimate toward, if decimation should run.
    pub fn triangle_budget(&self) -> Option<usize> {
        self.max_triangles.filter(|&max| max > 0)
    }

    /// Whether the subdivision slot runs.
    pub fn subdivides(&self) -> bool {
        !self.flat_only && self.iterations > 0
    }

    pub fn validate(&self) -> Result<()> {
        for (name, angle) in [
            ("splitAngleDeg", self.split_angle_deg),
            ("splitAngleCoarseDeg", self.split_angle_coarse_deg),
        ] {
            if !angle.is_finite() || !(0.0..=180.0).contains(&angle) {
                return Err(Error::Config(format!(
                    "{name} must be within [0, 180] degrees, got {angle}"
                )));
            }
        }
        if self.iterations > 1 {
            return Err(Error::Config(format!(
                "iterations must be 0 or 1, got {}",
                self.iterations
            )));
        }
        if !(0.0..=1.0).contains(&self.weight) {
            return Err(Error::Config(format!(
                "weight must be within [0, 1], got {}",
                self.weight
            )));
        }
        Ok(())
    }
}
