//! Mesh data structures and functionality

use crate::bounds::{BoundingBox, BoundingSphere};
use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh, either indexed or raw.
///
/// Indexed meshes store a vertex array plus a triangle list referencing it.
/// Raw meshes (`faces == None`) give every triangle its own three
/// consecutive vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Option<Vec<[usize; 3]>>,
    pub normals: Option<Vec<Vector3f>>,
    pub bounding_box: Option<BoundingBox>,
    pub bounding_sphere: Option<BoundingSphere>,
}

impl TriangleMesh {
    /// Create a new empty indexed mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Some(Vec::new()),
            normals: None,
            bounding_box: None,
            bounding_sphere: None,
        }
    }

    /// Create an indexed mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces: Some(faces),
            normals: None,
            bounding_box: None,
            bounding_sphere: None,
        }
    }

    /// Create a raw (non-indexed) mesh where each run of 3 vertices is a triangle
    pub fn from_raw(vertices: Vec<Point3f>) -> Self {
        Self {
            vertices,
            faces: None,
            normals: None,
            bounding_box: None,
            bounding_sphere: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_indexed(&self) -> bool {
        self.faces.is_some()
    }

    /// Number of index entries (3 per triangle), 0 for raw meshes
    pub fn index_count(&self) -> usize {
        self.faces.as_ref().map_or(0, |f| f.len() * 3)
    }

    /// Number of triangles in the stored layout: faces when indexed,
    /// vertex-count / 3 otherwise.
    pub fn face_count(&self) -> usize {
        match &self.faces {
            Some(faces) => faces.len(),
            None => self.vertices.len() / 3,
        }
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.face_count() == 0
    }

    /// Iterate the vertex triples of every triangle, in either layout.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let raw = if self.faces.is_none() {
            self.vertices.len() / 3
        } else {
            0
        };
        self.faces
            .iter()
            .flatten()
            .copied()
            .chain((0..raw).map(|t| [3 * t, 3 * t + 1, 3 * t + 2]))
    }

    /// Check that every index references an existing vertex.
    pub fn validate_indices(&self) -> Result<()> {
        let n = self.vertices.len();
        if let Some(faces) = &self.faces {
            for (fi, face) in faces.iter().enumerate() {
                if let Some(&bad) = face.iter().find(|&&i| i >= n) {
                    return Err(Error::InvalidData(format!(
                        "face {fi} references vertex {bad}, mesh has {n} vertices"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Add a face to an indexed mesh; raw meshes become indexed over their
    /// existing triangles first.
    pub fn add_face(&mut self, face: [usize; 3]) {
        if self.faces.is_none() {
            self.faces = Some(self.triangles().collect());
        }
        if let Some(faces) = self.faces.as_mut() {
            faces.push(face);
        }
    }

    /// Calculate face normals. Degenerate triangles get a zero normal.
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.triangles()
            .map(|face| match self.corners(face) {
                Some([v0, v1, v2]) => (v1 - v0)
                    .cross(&(v2 - v0))
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vector3f::zeros),
                None => Vector3f::zeros(),
            })
            .collect()
    }

    /// Recompute per-vertex normals as the area-weighted average of the
    /// adjoining face normals. Vertices with no valid face get a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3f::zeros(); self.vertices.len()];
        for face in self.triangles() {
            let Some([v0, v1, v2]) = self.corners(face) else {
                continue;
            };
            let weighted = (v1 - v0).cross(&(v2 - v0));
            if !weighted.iter().all(|c| c.is_finite()) {
                continue;
            }
            for &i in &face {
                normals[i] += weighted;
            }
        }
        for n in normals.iter_mut() {
            *n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros);
        }
        self.normals = Some(normals);
    }

    pub fn compute_bounding_box(&mut self) {
        self.bounding_box = BoundingBox::from_points(self.vertices.iter().copied());
    }

    pub fn compute_bounding_sphere(&mut self) {
        self.bounding_sphere = BoundingSphere::from_points(&self.vertices);
    }

    /// Recompute normals, bounding sphere and bounding box.
    pub fn recompute_derived(&mut self) {
        self.compute_vertex_normals();
        self.compute_bounding_sphere();
        self.compute_bounding_box();
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Expand into a raw mesh with three vertices per triangle.
    pub fn to_non_indexed(&self) -> TriangleMesh {
        let mut vertices = Vec::with_capacity(self.face_count() * 3);
        let mut normals = self
            .normals
            .as_ref()
            .map(|_| Vec::with_capacity(self.face_count() * 3));
        for face in self.triangles() {
            for i in face {
                if let Some(&v) = self.vertices.get(i) {
                    vertices.push(v);
                    if let (Some(out), Some(src)) = (normals.as_mut(), self.normals.as_ref()) {
                        out.push(src.get(i).copied().unwrap_or_else(Vector3f::zeros));
                    }
                }
            }
        }
        let mut mesh = TriangleMesh::from_raw(vertices);
        mesh.normals = normals.filter(|n| n.len() == mesh.vertices.len());
        mesh
    }

    fn corners(&self, face: [usize; 3]) -> Option<[Point3f; 3]> {
        Some([
            *self.vertices.get(face[0])?,
            *self.vertices.get(face[1])?,
            *self.vertices.get(face[2])?,
        ])
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
