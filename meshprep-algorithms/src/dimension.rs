//! Physical dimension solving
//!
//! Converts a target length along one axis into a uniform scale factor
//! relative to the model's unscaled (base) size. Nothing here touches mesh
//! data; the host applies the resulting scale to its transform.

use meshprep_core::{Axis, NoOpReason, StageOutcome, Vector3f};
use tracing::debug;

/// Smallest uniform scale the solver will produce.
pub const MIN_SCALE: f32 = 0.05;
/// Largest uniform scale the solver will produce.
pub const MAX_SCALE: f32 = 10.0;

/// Inclusive clamp range for uniform scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self {
            min: MIN_SCALE,
            max: MAX_SCALE,
        }
    }
}

impl ScaleRange {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Solve `target / base / existing` and clamp it into `range`.
///
/// Returns `None` when the target or base is non-positive or non-finite, or
/// when the existing scale makes the ratio non-finite or non-positive.
pub fn solve_uniform_scale(target: f32, base: f32, existing: f32, range: ScaleRange) -> Option<f32> {
    if !(target.is_finite() && base.is_finite()) || target <= 0.0 || base <= 0.0 {
        return None;
    }
    let raw = target / base / existing;
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Some(range.clamp(raw))
}

/// Current uniform scale of a model and the range it is kept in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleState {
    pub scale: f32,
    pub range: ScaleRange,
}

impl Default for ScaleState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            range: ScaleRange::default(),
        }
    }
}

impl ScaleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(range: ScaleRange) -> Self {
        Self {
            scale: range.clamp(1.0),
            range,
        }
    }

    /// Set the scale directly, clamped into the range.
    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() {
            self.scale = self.range.clamp(scale);
        }
    }

    /// Per-axis dimensions for the given base size at the current scale.
    pub fn dimensions(&self, base: &Vector3f) -> Vector3f {
        base * self.scale
    }

    /// Pick the scale that makes `axis` measure `target` units.
    ///
    /// On invalid input the current scale is kept and reported as unchanged.
    pub fn fit_axis(&mut self, axis: Axis, target: f32, base: &Vector3f, existing: f32) -> StageOutcome<f32> {
        match solve_uniform_scale(target, base[axis.index()], existing, self.range) {
            Some(scale) => {
                debug!(?axis, target, scale, "solved uniform scale");
                self.scale = scale;
                StageOutcome::Applied(scale)
            }
            None => StageOutcome::unchanged(self.scale, NoOpReason::InvalidScaleInput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_within_range() {
        let scale = solve_uniform_scale(100.0, 25.0, 1.0, ScaleRange::default()).unwrap();
        assert_relative_eq!(scale, 4.0);
    }

    #[test]
    fn test_solve_clamps_high() {
        let scale = solve_uniform_scale(500.0, 10.0, 1.0, ScaleRange::default()).unwrap();
        assert_relative_eq!(scale, 10.0);
    }

    #[test]
    fn test_solve_clamps_low() {
        let scale = solve_uniform_scale(1.0, 1000.0, 1.0, ScaleRange::default()).unwrap();
        assert_relative_eq!(scale, 0.05);
    }

    #[test]
    fn test_existing_scale_divides() {
        let scale = solve_uniform_scale(100.0, 25.0, 2.0, ScaleRange::default()).unwrap();
        assert_relative_eq!(scale, 2.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let range = ScaleRange::default();
        assert!(solve_uniform_scale(100.0, 0.0, 1.0, range).is_none());
        assert!(solve_uniform_scale(0.0, 25.0, 1.0, range).is_none());
        assert!(solve_uniform_scale(-5.0, 25.0, 1.0, range).is_none());
        assert!(solve_uniform_scale(f32::NAN, 25.0, 1.0, range).is_none());
        assert!(solve_uniform_scale(100.0, f32::INFINITY, 1.0, range).is_none());
        assert!(solve_uniform_scale(100.0, 25.0, 0.0, range).is_none());
    }

    #[test]
    fn test_fit_axis_updates_state() {
        let mut state = ScaleState::new();
        let base = Vector3f::new(25.0, 50.0, 10.0);
        let outcome = state.fit_axis(Axis::X, 100.0, &base, 1.0);
        assert!(outcome.is_applied());
        assert_relative_eq!(state.scale, 4.0);
        assert_relative_eq!(state.dimensions(&base), Vector3f::new(100.0, 200.0, 40.0));
    }

    #[test]
    fn test_fit_axis_keeps_scale_on_failure() {
        let mut state = ScaleState::new();
        state.set_scale(3.0);
        let outcome = state.fit_axis(Axis::Y, 100.0, &Vector3f::new(1.0, 0.0, 1.0), 1.0);
        assert_eq!(outcome.reason(), Some(NoOpReason::InvalidScaleInput));
        assert_relative_eq!(*outcome.value(), 3.0);
        assert_relative_eq!(state.scale, 3.0);
    }

    #[test]
    fn test_set_scale_clamps() {
        let mut state = ScaleState::with_range(ScaleRange { min: 0.5, max: 2.0 });
        state.set_scale(20.0);
        assert_relative_eq!(state.scale, 2.0);
    }
}
