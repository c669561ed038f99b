//! Core traits for meshprep

use crate::{bounds::BoundingBox, mesh::TriangleMesh, point::*, transform::Transform3D};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object in its local frame
    fn bounding_box(&self) -> Option<BoundingBox>;

    /// Get the bounding box after placing the object with `world`
    fn world_bounding_box(&self, world: &Transform3D) -> Option<BoundingBox>;

    /// Get the center point of the object
    fn center(&self) -> Option<Point3f> {
        self.bounding_box().map(|b| b.center())
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
            .or_else(|| BoundingBox::from_points(self.vertices.iter().copied()))
    }

    /// Every vertex is transformed, so the box is tight under rotation.
    fn world_bounding_box(&self, world: &Transform3D) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|v| world.transform_point(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn test_world_box_rotated() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let quarter_turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2);
        let world = Transform3D::from_translation_rotation(Vector3::zeros(), quarter_turn);
        let bbox = mesh.world_bounding_box(&world).unwrap();
        assert!((bbox.size().y - 2.0).abs() < 1e-5);
        assert!((bbox.size().x - 1.0).abs() < 1e-5);
        assert_eq!(mesh.center(), Some(Point3f::new(1.0, 0.5, 0.0)));
    }
}
