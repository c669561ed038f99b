//! Triangle counting

use crate::weld::{weld_vertices, WeldOptions};
use meshprep_core::TriangleMesh;

/// Number of triangles in `mesh` after normalization.
///
/// Indexed meshes report index-count / 3; raw meshes are welded first and fall
/// back to vertex-count / 3 when the weld fails. Meshes with fewer than 3
/// vertices have no triangles.
pub fn triangle_count(mesh: &TriangleMesh) -> usize {
    if mesh.vertex_count() < 3 {
        return 0;
    }
    if mesh.is_indexed() {
        return mesh.index_count() / 3;
    }
    match weld_vertices(mesh, WeldOptions::default()) {
        Ok(welded) => welded.index_count() / 3,
        Err(_) => mesh.vertex_count() / 3,
    }
}
