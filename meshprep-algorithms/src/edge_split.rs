//! Edge-preserving vertex splitting
//!
//! Around every vertex the incident triangles are grouped into smooth fans:
//! two triangles sharing an edge belong to the same fan when the angle between
//! their face normals is within the threshold. Each fan beyond the first gets
//! its own copy of the vertex, so sharp edges keep distinct normals through
//! shading and decimation.

use itertools::Itertools;
use meshprep_core::{is_finite_point, Error, NoOpReason, Result, StageOutcome, TriangleMesh, Vector3f};
use tracing::{debug, warn};

/// Dihedral threshold used when edge preservation runs before decimation.
pub const DEFAULT_SPLIT_ANGLE_DEG: f32 = 30.0;
/// Coarser threshold used by the optional pass after decimation.
pub const COARSE_SPLIT_ANGLE_DEG: f32 = 60.0;

/// Split `mesh` along edges sharper than `angle_deg`.
///
/// Meshes that are not indexed, or have fewer than 3 vertices or indices, are
/// returned unchanged. Missing normals are computed first. On an internal
/// failure the original geometry comes back with freshly computed normals and
/// bounds.
pub fn split_edges(mesh: TriangleMesh, angle_deg: f32) -> StageOutcome<TriangleMesh> {
    if !mesh.is_indexed() || mesh.vertex_count() < 3 || mesh.index_count() < 3 {
        return StageOutcome::unchanged(mesh, NoOpReason::SplitPreconditionUnmet);
    }
    let mut mesh = mesh;
    if mesh.normals.is_none() {
        mesh.compute_vertex_normals();
    }
    match split_vertices(&mesh, angle_deg) {
        Ok(mut split) => {
            split.recompute_derived();
            StageOutcome::Applied(split)
        }
        Err(error) => {
            warn!(%error, angle_deg, "edge split failed, keeping original geometry");
            mesh.recompute_derived();
            StageOutcome::fallback(mesh, error)
        }
    }
}

fn split_vertices(mesh: &TriangleMesh, angle_deg: f32) -> Result<TriangleMesh> {
    if !angle_deg.is_finite() || !(0.0..=180.0).contains(&angle_deg) {
        return Err(Error::SplitFailure(format!(
            "angle must be within [0, 180] degrees, got {angle_deg}"
        )));
    }
    mesh.validate_indices()
        .map_err(|e| Error::SplitFailure(e.to_string()))?;
    if let Some(idx) = mesh.vertices.iter().position(|p| !is_finite_point(p)) {
        return Err(Error::SplitFailure(format!("vertex {idx} has a non-finite position")));
    }

    let faces = mesh.faces.as_deref().unwrap_or_default();
    let face_normals = mesh.calculate_face_normals();
    let cos_threshold = angle_deg.to_radians().cos();
    let smooth = |a: usize, b: usize| {
        let (na, nb) = (face_normals[a], face_normals[b]);
        if na == Vector3f::zeros() || nb == Vector3f::zeros() {
            return true;
        }
        na.dot(&nb) >= cos_threshold
    };

    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); mesh.vertex_count()];
    for (fi, face) in faces.iter().enumerate() {
        for &v in face.iter().unique() {
            incident[v].push(fi);
        }
    }

    let mut vertices = mesh.vertices.clone();
    let mut normals = mesh.normals.clone();
    let mut new_faces = faces.to_vec();
    let mut duplicated = 0usize;

    for (v, fan) in incident.iter().enumerate() {
        if fan.len() < 2 {
            continue;
        }
        // (neighbour vertex, local face slot) pairs; faces listing the same
        // neighbour share the edge (v, neighbour).
        let spokes: Vec<(usize, usize)> = fan
            .iter()
            .enumerate()
            .flat_map(|(slot, &fi)| {
                faces[fi]
                    .iter()
                    .filter(move |&&w| w != v)
                    .map(move |&w| (w, slot))
            })
            .sorted_unstable()
            .collect();

        let mut groups = DisjointSet::new(fan.len());
        for (_, edge) in &spokes.iter().group_by(|(w, _)| *w) {
            for ((_, a), (_, b)) in edge.tuple_windows() {
                if smooth(fan[*a], fan[*b]) {
                    groups.union(*a, *b);
                }
            }
        }

        let mut copies: Vec<(usize, usize)> = Vec::new();
        for slot in 0..fan.len() {
            let root = groups.find(slot);
            let target = match copies.iter().find(|(r, _)| *r == root) {
                Some(&(_, index)) => index,
                None => {
                    let index = if copies.is_empty() {
                        v
                    } else {
                        vertices.push(vertices[v]);
                        if let Some(normals) = normals.as_mut() {
                            let n = normals.get(v).copied().unwrap_or_else(Vector3f::zeros);
                            normals.push(n);
                        }
                        duplicated += 1;
                        vertices.len() - 1
                    };
                    copies.push((root, index));
                    index
                }
            };
            if target != v {
                for corner in new_faces[fan[slot]].iter_mut() {
                    if *corner == v {
                        *corner = target;
                    }
                }
            }
        }
    }

    debug!(angle_deg, duplicated, "split sharp edges");

    let mut split = TriangleMesh::from_vertices_and_faces(vertices, new_faces);
    split.normals = normals.filter(|n| n.len() == split.vertices.len());
    Ok(split)
}

/// Union-find over the faces of one vertex fan.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}
