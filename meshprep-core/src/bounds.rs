//! Axis-aligned bounding boxes, bounding spheres and the up axis

use crate::point::*;
use serde::{Deserialize, Serialize};

/// A world axis. `Y` is the default "up" axis when grounding a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    /// Component index of this axis (0, 1 or 2).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit vector along this axis.
    pub fn unit(self) -> Vector3f {
        let mut v = Vector3f::zeros();
        v[self.index()] = 1.0;
        v
    }
}

/// Minimal axis-aligned box enclosing a set of points.
///
/// A NaN coordinate in the input poisons the corresponding axis: both `min`
/// and `max` become NaN on that axis so callers can detect degenerate input
/// through [`BoundingBox::is_finite`] or [`BoundingBox::axis_is_finite`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3f,
    pub max: Point3f,
}

impl BoundingBox {
    pub fn new(min: Point3f, max: Point3f) -> Self {
        Self { min, max }
    }

    /// Box around the given points, `None` if there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3f>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first, first);
        let mut poisoned = [false; 3];
        for i in 0..3 {
            if first[i].is_nan() {
                poisoned[i] = true;
            }
        }
        for p in iter {
            for i in 0..3 {
                if poisoned[i] {
                    continue;
                }
                let c = p[i];
                if c.is_nan() {
                    poisoned[i] = true;
                    bbox.min[i] = f32::NAN;
                    bbox.max[i] = f32::NAN;
                    continue;
                }
                if c < bbox.min[i] {
                    bbox.min[i] = c;
                }
                if c > bbox.max[i] {
                    bbox.max[i] = c;
                }
            }
        }
        Some(bbox)
    }

    /// Grow the box so that it contains `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = if self.min[i].is_nan() || other.min[i].is_nan() {
                f32::NAN
            } else {
                self.min[i].min(other.min[i])
            };
            out.max[i] = if self.max[i].is_nan() || other.max[i].is_nan() {
                f32::NAN
            } else {
                self.max[i].max(other.max[i])
            };
        }
        out
    }

    pub fn size(&self) -> Vector3f {
        self.max - self.min
    }

    pub fn center(&self) -> Point3f {
        Point3f::from((self.min.coords + self.max.coords) * 0.5)
    }

    pub fn is_finite(&self) -> bool {
        (0..3).all(|i| self.axis_is_finite(i))
    }

    /// True when both bounds and the extent along `axis` are finite.
    pub fn axis_is_finite(&self, axis: usize) -> bool {
        let extent = self.max[axis] - self.min[axis];
        self.min[axis].is_finite() && self.max[axis].is_finite() && extent.is_finite()
    }
}

/// Sphere enclosing a set of points, centred on their bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Point3f,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn from_points(points: &[Point3f]) -> Option<Self> {
        let bbox = BoundingBox::from_points(points.iter().copied())?;
        let center = bbox.center();
        let radius = points
            .iter()
            .map(|p| (p - center).norm_squared())
            .fold(0.0f32, f32::max)
            .sqrt();
        Some(Self { center, radius })
    }
}
