//! Grounding: rest the lowest point of a model on the up = 0 plane

use meshprep_core::{Axis, BoundingBox, Error, Result, SceneNode, Transform3D, Vector3f};
use tracing::debug;

/// Measurements reported to the host after grounding, in the asset's native
/// length unit (millimetres for printable models).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundingReport {
    /// World-space size including the node's own scale.
    pub scaled: Vector3f,
    /// Size with the node's uniform scale factored out.
    pub base: Vector3f,
    /// Up-axis distance the node was moved down by.
    pub offset: f32,
    /// World-space box after grounding.
    pub bounding_box: BoundingBox,
}

/// Translate `node` along `up` so that the lowest point of all geometry
/// under it sits at up = 0 in world space.
///
/// `parent_world` is the world transform of the node's parent. On
/// `Error::MalformedGeometry` the node is left untouched.
pub fn ground(node: &mut SceneNode, parent_world: &Transform3D, up: Axis) -> Result<GroundingReport> {
    let axis = up.index();
    let bbox = node.world_bounding_box(parent_world).ok_or_else(|| {
        Error::MalformedGeometry(format!(
            "node '{}' has no geometry with at least 3 vertices",
            node.name
        ))
    })?;
    if !bbox.axis_is_finite(axis) {
        return Err(Error::MalformedGeometry(format!(
            "node '{}' has a non-finite extent along the up axis",
            node.name
        )));
    }
    let parent_inverse = parent_world.inverse().ok_or_else(|| {
        Error::MalformedGeometry(format!(
            "parent transform of node '{}' is not invertible",
            node.name
        ))
    })?;

    let offset = bbox.min[axis];
    let world_shift = up.unit() * -offset;
    node.transform.translation += parent_inverse.transform_vector(&world_shift);

    let mut grounded = bbox;
    grounded.min[axis] -= offset;
    grounded.max[axis] -= offset;

    let scaled = bbox.size();
    let scale = node.transform.scale;
    let base = if scale.is_finite() && scale > 0.0 {
        scaled / scale
    } else {
        scaled
    };

    debug!(node = %node.name, offset, ?scaled, ?base, "grounded node");
    Ok(GroundingReport {
        scaled,
        base,
        offset,
        bounding_box: grounded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshprep_core::{NodeTransform, Point3f, TriangleMesh};

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

    fn world_box(node: &SceneNode, parent: &Transform3D) -> BoundingBox {
        node.world_bounding_box(parent).unwrap()
    }

    #[test]
    fn test_mesh_above_ground() {
        let mesh = make_box(Point3f::new(-2.0, 5.0, -3.0), Point3f::new(2.0, 9.0, 3.0));
        let mut node = SceneNode::with_geometry("model", mesh);
        let parent = Transform3D::identity();
        let before = world_box(&node, &parent);

        let report = ground(&mut node, &parent, Axis::Y).unwrap();
        let after = world_box(&node, &parent);

        assert_relative_eq!(report.offset, 5.0);
        assert!(after.min.y.abs() < 1e-6);
        assert_eq!(after.min.x, before.min.x);
        assert_eq!(after.max.x, before.max.x);
        assert_eq!(after.min.z, before.min.z);
        assert_eq!(after.max.z, before.max.z);
        assert_relative_eq!(report.scaled, Vector3f::new(4.0, 4.0, 6.0));
        assert_relative_eq!(report.bounding_box.min.y, 0.0);
    }

    #[test]
    fn test_mesh_below_ground_is_lifted() {
        let mesh = make_box(Point3f::new(0.0, -7.5, 0.0), Point3f::new(1.0, -1.0, 1.0));
        let mut node = SceneNode::with_geometry("model", mesh);
        let parent = Transform3D::identity();
        ground(&mut node, &parent, Axis::Y).unwrap();
        assert!(world_box(&node, &parent).min.y.abs() < 1e-6);
    }

    #[test]
    fn test_scaled_parent_and_node() {
        let mesh = make_box(Point3f::new(0.0, 1.0, 0.0), Point3f::new(10.0, 3.0, 10.0));
        let mut node = SceneNode::with_geometry("model", mesh).with_transform(NodeTransform {
            scale: 2.0,
            ..NodeTransform::identity()
        });
        let parent = Transform3D::translation(Vector3f::new(0.0, 4.0, 0.0)) * Transform3D::uniform_scaling(0.5);

        let report = ground(&mut node, &parent, Axis::Y).unwrap();
        assert!(world_box(&node, &parent).min.y.abs() < 1e-5);
        assert_relative_eq!(report.scaled, Vector3f::new(10.0, 2.0, 10.0), epsilon = 1e-5);
        assert_relative_eq!(report.base, Vector3f::new(5.0, 1.0, 5.0), epsilon = 1e-5);
    }

    #[test]
    fn test_z_up() {
        let mesh = make_box(Point3f::new(0.0, 0.0, 2.0), Point3f::new(1.0, 1.0, 3.0));
        let mut node = SceneNode::with_geometry("model", mesh);
        let parent = Transform3D::identity();
        ground(&mut node, &parent, Axis::Z).unwrap();
        let after = world_box(&node, &parent);
        assert!(after.min.z.abs() < 1e-6);
        assert_eq!(after.min.y, 0.0);
    }

    #[test]
    fn test_non_finite_leaves_node_untouched() {
        let mut mesh = make_box(Point3f::new(0.0, 1.0, 0.0), Point3f::new(1.0, 2.0, 1.0));
        mesh.vertices[3].y = f32::NAN;
        let mut node = SceneNode::with_geometry("model", mesh);
        let result = ground(&mut node, &Transform3D::identity(), Axis::Y);
        assert!(matches!(result, Err(Error::MalformedGeometry(_))));
        assert_eq!(node.transform, NodeTransform::identity());
    }

    #[test]
    fn test_degenerate_mesh_is_malformed() {
        let mesh = TriangleMesh::from_raw(vec![Point3f::origin(), Point3f::new(0.0, 1.0, 0.0)]);
        let mut node = SceneNode::with_geometry("tiny", mesh);
        let result = ground(&mut node, &Transform3D::identity(), Axis::Y);
        assert!(matches!(result, Err(Error::MalformedGeometry(_))));
    }
}
