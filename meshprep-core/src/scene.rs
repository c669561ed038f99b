//! Minimal scene graph: transform nodes that may carry geometry

use crate::bounds::BoundingBox;
use crate::mesh::TriangleMesh;
use crate::point::*;
use crate::traits::Drawable;
use crate::transform::Transform3D;
use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

/// Local placement of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTransform {
    pub translation: Vector3f,
    pub rotation: UnitQuaternion<f32>,
    /// Uniform scale factor
    pub scale: f32,
}

impl NodeTransform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3f::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: 1.0,
        }
    }

    pub fn from_translation(translation: Vector3f) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn to_matrix(&self) -> Transform3D {
        Transform3D::from_translation_rotation_scale(self.translation, self.rotation, self.scale)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// A node of the host's scene graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub transform: NodeTransform,
    pub geometry: Option<TriangleMesh>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// A transform-only node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A node carrying geometry
    pub fn with_geometry(name: impl Into<String>, geometry: TriangleMesh) -> Self {
        Self {
            name: name.into(),
            geometry: Some(geometry),
            ..Self::default()
        }
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first visit of the subtree with each node's world transform.
    pub fn visit<F>(&self, parent_world: &Transform3D, f: &mut F)
    where
        F: FnMut(&SceneNode, &Transform3D),
    {
        let world = *parent_world * self.transform.to_matrix();
        f(self, &world);
        for child in &self.children {
            child.visit(&world, f);
        }
    }

    /// Mutable access to the geometry of every node in the subtree.
    pub fn mesh_slots_mut(&mut self) -> Vec<MeshSlot<'_>> {
        let mut out = Vec::new();
        collect_mesh_slots(self, &mut out);
        out
    }

    /// Number of nodes in the subtree that carry geometry.
    pub fn mesh_node_count(&self) -> usize {
        let mut count = 0;
        self.visit(&Transform3D::identity(), &mut |node, _| {
            if node.geometry.is_some() {
                count += 1;
            }
        });
        count
    }

    /// World-space box of all geometry under this node. Meshes with fewer
    /// than 3 vertices cannot form a triangle and are ignored.
    pub fn world_bounding_box(&self, parent_world: &Transform3D) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;
        self.visit(parent_world, &mut |node, world| {
            let Some(mesh) = node.geometry.as_ref() else {
                return;
            };
            if mesh.vertex_count() < 3 {
                return;
            }
            if let Some(b) = mesh.world_bounding_box(world) {
                bbox = Some(match bbox {
                    Some(acc) => acc.union(&b),
                    None => b,
                });
            }
        });
        bbox
    }

    /// Find a node in the subtree by name.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

/// A geometry-carrying node borrowed out of the tree, depth-first order.
#[derive(Debug)]
pub struct MeshSlot<'a> {
    pub name: &'a str,
    pub geometry: &'a mut TriangleMesh,
}

fn collect_mesh_slots<'a>(node: &'a mut SceneNode, out: &mut Vec<MeshSlot<'a>>) {
    let SceneNode {
        name,
        geometry,
        children,
        ..
    } = node;
    if let Some(geometry) = geometry.as_mut() {
        out.push(MeshSlot {
            name: name.as_str(),
            geometry,
        });
    }
    for child in children.iter_mut() {
        collect_mesh_slots(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f32) -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, offset, 0.0),
                Point3f::new(1.0, offset, 0.0),
                Point3f::new(0.0, offset + 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    fn make_scene() -> SceneNode {
        SceneNode::new("root")
            .with_child(SceneNode::with_geometry("a", triangle(0.0)))
            .with_child(
                SceneNode::new("group")
                    .with_transform(NodeTransform::from_translation(Vector3f::new(0.0, 10.0, 0.0)))
                    .with_child(SceneNode::with_geometry("b", triangle(2.0))),
            )
    }

    #[test]
    fn test_mesh_nodes() {
        let mut scene = make_scene();
        assert_eq!(scene.mesh_node_count(), 2);
        let names: Vec<String> = scene.mesh_slots_mut().iter().map(|s| s.name.to_string()).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_world_box_includes_parent_transforms() {
        let scene = make_scene();
        let bbox = scene.world_bounding_box(&Transform3D::identity()).unwrap();
        assert_eq!(bbox.min.y, 0.0);
        assert_eq!(bbox.max.y, 13.0);
    }

    #[test]
    fn test_find() {
        let scene = make_scene();
        assert!(scene.find("b").is_some());
        assert!(scene.find("missing").is_none());
    }
}
