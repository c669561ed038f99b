//! Topology normalization by vertex welding
//!
//! Raw meshes are turned into indexed meshes by merging vertices that lie
//! within the weld tolerance of each other, found through a hash grid whose
//! cell size is the tolerance. The weld never drops triangles, so the
//! triangle count is unchanged by it.

use meshprep_core::{
    is_finite_point, Error, NoOpReason, Point3f, Result, StageOutcome, TriangleMesh, Vector3f,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Positional tolerance for merging vertices, in world units.
pub const WELD_TOLERANCE: f32 = 1e-4;

/// Options controlling the weld.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldOptions {
    pub tolerance: f32,
}

impl Default for WeldOptions {
    fn default() -> Self {
        Self {
            tolerance: WELD_TOLERANCE,
        }
    }
}

/// Normalize a mesh with the default tolerance.
pub fn normalize(mesh: TriangleMesh) -> StageOutcome<TriangleMesh> {
    normalize_with(mesh, WeldOptions::default())
}

/// Return an indexed version of `mesh`.
///
/// Already-indexed meshes and meshes with fewer than 3 vertices are returned
/// untouched. If the weld fails the original mesh comes back as a fallback.
pub fn normalize_with(mesh: TriangleMesh, options: WeldOptions) -> StageOutcome<TriangleMesh> {
    if mesh.is_indexed() {
        return StageOutcome::unchanged(mesh, NoOpReason::AlreadyIndexed);
    }
    if mesh.vertex_count() < 3 {
        return StageOutcome::unchanged(mesh, NoOpReason::TooFewVertices);
    }
    match weld_vertices(&mesh, options) {
        Ok(welded) => StageOutcome::Applied(welded),
        Err(error) => {
            warn!(%error, "vertex weld failed, keeping unwelded mesh");
            StageOutcome::fallback(mesh, error)
        }
    }
}

/// Merge vertices closer than the tolerance into an indexed mesh.
///
/// Raw meshes are read three vertices per triangle; indexed meshes keep their
/// faces and have split copies of a position merged back together. A vertex
/// joins the nearest already-welded vertex within `tolerance`, searching its
/// own grid cell and the 26 around it, otherwise it starts a new one. Welded
/// vertices keep the position of the first vertex that created them and the
/// renormalized average of the merged normals.
pub fn weld_vertices(mesh: &TriangleMesh, options: WeldOptions) -> Result<TriangleMesh> {
    if !(options.tolerance.is_finite() && options.tolerance > 0.0) {
        return Err(Error::WeldFailure(format!(
            "tolerance must be positive and finite, got {}",
            options.tolerance
        )));
    }
    let vertex_count = mesh.vertex_count();
    if !mesh.is_indexed() && vertex_count % 3 != 0 {
        return Err(Error::WeldFailure(format!(
            "raw mesh has {vertex_count} vertices, not a multiple of 3"
        )));
    }
    mesh.validate_indices().map_err(|e| Error::WeldFailure(e.to_string()))?;
    if let Some(normals) = &mesh.normals {
        if normals.len() != vertex_count {
            return Err(Error::WeldFailure(format!(
                "{} normals for {} vertices",
                normals.len(),
                vertex_count
            )));
        }
    }

    let inv_cell = 1.0 / options.tolerance as f64;
    let max_dist_sq = options.tolerance * options.tolerance;
    let mut cells: HashMap<Cell, Vec<usize>> = HashMap::with_capacity(vertex_count);
    let mut remap = Vec::with_capacity(vertex_count);
    let mut vertices: Vec<Point3f> = Vec::new();
    let mut normal_sums: Option<Vec<Vector3f>> = mesh.normals.as_ref().map(|_| Vec::new());

    for (idx, position) in mesh.vertices.iter().enumerate() {
        if !is_finite_point(position) {
            return Err(Error::WeldFailure(format!(
                "vertex {idx} has a non-finite position"
            )));
        }
        let key = cell_of(position, inv_cell);
        let nearest = neighbourhood(key)
            .filter_map(|cell| cells.get(&cell))
            .flatten()
            .map(|&v| ((vertices[v] - *position).norm_squared(), v))
            .filter(|&(d, _)| d <= max_dist_sq)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let target = match nearest {
            Some((_, v)) => v,
            None => {
                vertices.push(*position);
                if let Some(sums) = normal_sums.as_mut() {
                    sums.push(Vector3f::zeros());
                }
                let v = vertices.len() - 1;
                cells.entry(key).or_default().push(v);
                v
            }
        };
        if let (Some(sums), Some(normals)) = (normal_sums.as_mut(), mesh.normals.as_ref()) {
            sums[target] += normals[idx];
        }
        remap.push(target);
    }

    let faces: Vec<[usize; 3]> = mesh
        .triangles()
        .map(|[a, b, c]| [remap[a], remap[b], remap[c]])
        .collect();

    debug!(
        before = vertex_count,
        after = vertices.len(),
        triangles = faces.len(),
        "welded vertices"
    );

    let mut welded = TriangleMesh::from_vertices_and_faces(vertices, faces);
    if let Some(sums) = normal_sums {
        welded.set_normals(
            sums.into_iter()
                .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros))
                .collect(),
        );
    }
    welded.bounding_box = mesh.bounding_box;
    welded.bounding_sphere = mesh.bounding_sphere;
    Ok(welded)
}

type Cell = (i64, i64, i64);

#[inline]
fn cell_of(p: &Point3f, inv_cell: f64) -> Cell {
    let q = |c: f32| (c as f64 * inv_cell).floor() as i64;
    (q(p.x), q(p.y), q(p.z))
}

/// The cell itself and its 26 neighbours. Two points within one cell width
/// of each other always land in adjacent cells.
fn neighbourhood((x, y, z): Cell) -> impl Iterator<Item = Cell> {
    (-1..=1).flat_map(move |dx| {
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (x + dx, y + dy, z + dz)))
    })
}
