//! Edge collapse simplification
//!
//! Implements iterative edge collapse mesh simplification using a half-edge
//! data structure for efficient topology operations and quadric error metrics
//! (QEM) for error-driven edge prioritization. Collapses that break the link
//! condition or flip a surrounding triangle are rejected.

use crate::MeshSimplifier;
use meshprep_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
use nalgebra::{Matrix4, Vector4};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const INVALID: usize = usize::MAX;

// ============================================================
// Half-Edge Data Structure
// ============================================================

#[derive(Debug, Clone)]
struct HalfEdge {
    target: usize,
    twin: usize,
    next: usize,
    prev: usize,
    face: usize,
}

/// Half-edge mesh for topology-aware edge collapse operations.
struct HalfEdgeMesh {
    half_edges: Vec<HalfEdge>,
    /// One outgoing half-edge per vertex (INVALID if removed)
    vertex_edge: Vec<usize>,
    /// One half-edge per face (INVALID if removed)
    face_edge: Vec<usize>,
    active_face_count: usize,
    active_vertex_count: usize,
    positions: Vec<Point3f>,
    normals: Option<Vec<Vector3f>>,
    quadrics: Vec<Matrix4<f64>>,
    vertex_removed: Vec<bool>,
}

impl HalfEdgeMesh {
    /// Build from a mesh whose indices have already been validated.
    fn from_triangle_mesh(mesh: &TriangleMesh) -> Self {
        let nv = mesh.vertices.len();
        let nf = mesh.face_count();

        let mut half_edges = Vec::with_capacity(nf * 3);
        let mut vertex_edge = vec![INVALID; nv];
        let mut face_edge = Vec::with_capacity(nf);

        for (fi, face) in mesh.triangles().enumerate() {
            let base = fi * 3;
            for j in 0..3usize {
                half_edges.push(HalfEdge {
                    target: face[(j + 1) % 3],
                    twin: INVALID,
                    next: base + (j + 1) % 3,
                    prev: base + (j + 2) % 3,
                    face: fi,
                });
                if vertex_edge[face[j]] == INVALID {
                    vertex_edge[face[j]] = base + j;
                }
            }
            face_edge.push(base);
        }

        // Build twin pointers; non-manifold edges keep the first pairing only
        let mut edge_map: HashMap<(usize, usize), usize> = HashMap::with_capacity(nf * 3);
        for (he_idx, he) in half_edges.iter().enumerate() {
            let src = half_edges[he.prev].target;
            edge_map.entry((src, he.target)).or_insert(he_idx);
        }
        for he_idx in 0..half_edges.len() {
            if half_edges[he_idx].twin != INVALID {
                continue;
            }
            let src = half_edges[half_edges[he_idx].prev].target;
            let tgt = half_edges[he_idx].target;
            if let Some(&twin_idx) = edge_map.get(&(tgt, src)) {
                if twin_idx != he_idx && half_edges[twin_idx].twin == INVALID {
                    half_edges[he_idx].twin = twin_idx;
                    half_edges[twin_idx].twin = he_idx;
                }
            }
        }

        let active_vertex_count = vertex_edge.iter().filter(|&&e| e != INVALID).count();
        let mut hem = HalfEdgeMesh {
            half_edges,
            vertex_edge,
            face_edge,
            active_face_count: nf,
            active_vertex_count,
            positions: mesh.vertices.clone(),
            normals: mesh.normals.clone().filter(|n| n.len() == nv),
            quadrics: vec![Matrix4::zeros(); nv],
            vertex_removed: vec![false; nv],
        };
        hem.initialize_quadrics();
        hem
    }

    #[inline]
    fn source(&self, he: usize) -> usize {
        self.half_edges[self.half_edges[he].prev].target
    }

    fn compute_plane(v0: &Point3f, v1: &Point3f, v2: &Point3f) -> Vector4<f64> {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let n = e1.cross(&e2).normalize();
        if !n.iter().all(|x| x.is_finite()) {
            return Vector4::new(0.0, 0.0, 1.0, 0.0);
        }
        let d = -n.dot(&v0.coords);
        Vector4::new(n.x as f64, n.y as f64, n.z as f64, d as f64)
    }

    fn plane_to_quadric(p: &Vector4<f64>) -> Matrix4<f64> {
        let (a, b, c, d) = (p[0], p[1], p[2], p[3]);
        Matrix4::new(
            a * a, a * b, a * c, a * d,
            a * b, b * b, b * c, b * d,
            a * c, b * c, c * c, c * d,
            a * d, b * d, c * d, d * d,
        )
    }

    fn initialize_quadrics(&mut self) {
        for fi in 0..self.face_edge.len() {
            let he0 = self.face_edge[fi];
            if he0 == INVALID {
                continue;
            }
            let he1 = self.half_edges[he0].next;
            let v0 = self.source(he0);
            let v1 = self.half_edges[he0].target;
            let v2 = self.half_edges[he1].target;
            let plane =
                Self::compute_plane(&self.positions[v0], &self.positions[v1], &self.positions[v2]);
            let q = Self::plane_to_quadric(&plane);
            self.quadrics[v0] += q;
            self.quadrics[v1] += q;
            self.quadrics[v2] += q;
        }
    }

    /// Get all outgoing half-edges from a vertex (handles boundary vertices).
    fn outgoing_half_edges(&self, v: usize) -> Vec<usize> {
        let start = self.vertex_edge[v];
        if start == INVALID {
            return vec![];
        }

        let limit = self.half_edges.len();
        let mut result = Vec::new();
        let mut current = start;

        // Rotate counterclockwise: current.prev.twin
        loop {
            result.push(current);
            let prev = self.half_edges[current].prev;
            let twin = self.half_edges[prev].twin;
            if twin == INVALID || result.len() > limit {
                break;
            }
            current = twin;
            if current == start {
                return result;
            }
        }

        // Boundary: also rotate clockwise from start via twin.next
        let twin_of_start = self.half_edges[start].twin;
        if twin_of_start != INVALID {
            let mut current = self.half_edges[twin_of_start].next;
            loop {
                if current == start || result.len() > limit {
                    break;
                }
                result.push(current);
                let twin = self.half_edges[current].twin;
                if twin == INVALID {
                    break;
                }
                current = self.half_edges[twin].next;
            }
        }

        result
    }

    fn neighbors(&self, v: usize) -> HashSet<usize> {
        self.outgoing_half_edges(v)
            .iter()
            .map(|&he| self.half_edges[he].target)
            .collect()
    }

    fn is_boundary_vertex(&self, v: usize) -> bool {
        self.outgoing_half_edges(v)
            .iter()
            .any(|&he| self.half_edges[he].twin == INVALID)
    }

    /// Check the link condition: common neighbors must equal exactly the
    /// face apices opposite the edge (2 for interior, 1 for boundary).
    fn check_link_condition(&self, v1: usize, v2: usize) -> bool {
        let n1 = self.neighbors(v1);
        let n2 = self.neighbors(v2);
        let common_count = n1.intersection(&n2).count();

        let h = match self.find_half_edge(v1, v2) {
            Some(h) => h,
            None => return false,
        };
        let is_boundary = self.half_edges[h].twin == INVALID;
        let expected = if is_boundary { 1 } else { 2 };
        common_count == expected
    }

    fn find_half_edge(&self, from: usize, to: usize) -> Option<usize> {
        self.outgoing_half_edges(from)
            .into_iter()
            .find(|&he| self.half_edges[he].target == to)
    }

    fn quadric_error(q: &Matrix4<f64>, p: &Point3f) -> f64 {
        let vh = Vector4::new(p.x as f64, p.y as f64, p.z as f64, 1.0);
        (vh.transpose() * q * vh)[0].max(0.0)
    }

    /// Candidate positions for collapsing (v1, v2), cheapest first: the
    /// QEM optimum when the quadric is invertible, then both endpoints and
    /// the midpoint.
    fn collapse_candidates(&self, v1: usize, v2: usize) -> Vec<(Point3f, f64)> {
        let q = self.quadrics[v1] + self.quadrics[v2];
        let q3 = q.fixed_view::<3, 3>(0, 0);
        let q1 = q.fixed_view::<3, 1>(0, 3);

        let mut candidates = Vec::with_capacity(4);
        if let Some(inv) = q3.try_inverse() {
            let p = -inv * q1;
            let optimal = Point3f::new(p[0] as f32, p[1] as f32, p[2] as f32);
            if optimal.coords.iter().all(|c| c.is_finite()) {
                candidates.push(optimal);
            }
        }
        candidates.push(self.positions[v1]);
        candidates.push(self.positions[v2]);
        candidates.push(Point3f::from(
            (self.positions[v1].coords + self.positions[v2].coords) * 0.5,
        ));

        let mut scored: Vec<(Point3f, f64)> = candidates
            .into_iter()
            .map(|p| (p, Self::quadric_error(&q, &p)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored
    }

    fn compute_collapse_cost(&self, v1: usize, v2: usize) -> f64 {
        self.collapse_candidates(v1, v2)
            .first()
            .map_or(f64::INFINITY, |&(_, cost)| cost)
    }

    /// True if moving v1 and v2 to `new_pos` would reverse the orientation
    /// of any triangle that survives the collapse.
    fn would_flip(&self, v1: usize, v2: usize, new_pos: &Point3f) -> bool {
        for (v, other) in [(v1, v2), (v2, v1)] {
            let p = self.positions[v];
            for he in self.outgoing_half_edges(v) {
                if self.half_edges[he].face == INVALID {
                    continue;
                }
                let a = self.half_edges[he].target;
                let b = self.half_edges[self.half_edges[he].next].target;
                if a == other || b == other {
                    continue;
                }
                let (pa, pb) = (self.positions[a], self.positions[b]);
                let before = (pa - p).cross(&(pb - p));
                let after = (pa - new_pos).cross(&(pb - new_pos));
                if before.dot(&after) < 0.0 {
                    return true;
                }
            }
        }
        false
    }

    /// Find any valid outgoing half-edge from a vertex (linear scan fallback).
    fn find_valid_outgoing(&self, v: usize) -> usize {
        for (i, he) in self.half_edges.iter().enumerate() {
            if he.face != INVALID && self.source(i) == v {
                return i;
            }
        }
        INVALID
    }

    /// First half-edge in `candidates` whose face is still alive.
    fn first_alive(&self, candidates: &[usize]) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .find(|&he| self.half_edges[he].face != INVALID)
    }

    /// Collapse edge (v1, v2), merging v2 into v1 at new_pos.
    /// Returns true on success.
    fn collapse_edge(&mut self, v1: usize, v2: usize, new_pos: Point3f) -> bool {
        let h = match self.find_half_edge(v1, v2) {
            Some(h) => h,
            None => return false,
        };

        let h_twin = self.half_edges[h].twin;
        let h_next = self.half_edges[h].next;
        let h_prev = self.half_edges[h].prev;
        let face_a = self.half_edges[h].face;
        let h_next_twin = self.half_edges[h_next].twin;
        let h_prev_twin = self.half_edges[h_prev].twin;
        let c = self.half_edges[h_next].target;

        let (face_b, ht_next, ht_prev, ht_next_twin, ht_prev_twin, d) = if h_twin != INVALID {
            let hn = self.half_edges[h_twin].next;
            let hp = self.half_edges[h_twin].prev;
            (
                self.half_edges[h_twin].face,
                hn,
                hp,
                self.half_edges[hn].twin,
                self.half_edges[hp].twin,
                self.half_edges[hn].target,
            )
        } else {
            (INVALID, INVALID, INVALID, INVALID, INVALID, INVALID)
        };

        // Collect outgoing edges BEFORE any modifications
        let v2_outgoing = self.outgoing_half_edges(v2);
        let mut v1_outgoing = self.outgoing_half_edges(v1);
        v1_outgoing.extend_from_slice(&v2_outgoing);
        let c_outgoing = self.outgoing_half_edges(c);
        let d_outgoing = if d != INVALID {
            self.outgoing_half_edges(d)
        } else {
            Vec::new()
        };

        // Re-pair twins for face A border edges
        if h_next_twin != INVALID {
            self.half_edges[h_next_twin].twin = h_prev_twin;
        }
        if h_prev_twin != INVALID {
            self.half_edges[h_prev_twin].twin = h_next_twin;
        }

        // Mark face A as removed
        self.half_edges[h].face = INVALID;
        self.half_edges[h_next].face = INVALID;
        self.half_edges[h_prev].face = INVALID;
        self.face_edge[face_a] = INVALID;
        self.active_face_count -= 1;

        // Handle face B
        if face_b != INVALID {
            if ht_next_twin != INVALID {
                self.half_edges[ht_next_twin].twin = ht_prev_twin;
            }
            if ht_prev_twin != INVALID {
                self.half_edges[ht_prev_twin].twin = ht_next_twin;
            }
            self.half_edges[h_twin].face = INVALID;
            self.half_edges[ht_next].face = INVALID;
            self.half_edges[ht_prev].face = INVALID;
            self.face_edge[face_b] = INVALID;
            self.active_face_count -= 1;
        }

        // Redirect all v2 references to v1
        for &he in &v2_outgoing {
            let prev = self.half_edges[he].prev;
            self.half_edges[prev].target = v1;

            let twin = self.half_edges[he].twin;
            if twin != INVALID && self.half_edges[twin].face != INVALID {
                self.half_edges[twin].target = v1;
            }
        }

        // Fix vertex_edge pointers of the survivors, preferring local candidates
        if self.half_edges[self.vertex_edge[v1]].face == INVALID {
            self.vertex_edge[v1] = match self.first_alive(&v1_outgoing) {
                Some(he) => he,
                None => self.find_valid_outgoing(v1),
            };
        }
        for (vertex, outgoing) in [(c, &c_outgoing), (d, &d_outgoing)] {
            if vertex == INVALID
                || self.vertex_edge[vertex] == INVALID
                || self.half_edges[self.vertex_edge[vertex]].face != INVALID
            {
                continue;
            }
            self.vertex_edge[vertex] = match self.first_alive(outgoing) {
                Some(he) => he,
                None => self.find_valid_outgoing(vertex),
            };
        }

        // Mark v2 as removed
        self.vertex_edge[v2] = INVALID;
        self.vertex_removed[v2] = true;
        self.active_vertex_count -= 1;

        // Update position and quadric for v1
        let v2_quadric = self.quadrics[v2];
        self.positions[v1] = new_pos;
        self.quadrics[v1] += v2_quadric;

        // Interpolate normals
        if let Some(ref mut normals) = self.normals {
            let n1 = normals[v1];
            let n2 = normals[v2];
            let avg = (n1 + n2).normalize();
            if avg.iter().all(|x| x.is_finite()) {
                normals[v1] = avg;
            }
        }

        true
    }

    fn to_triangle_mesh(&self) -> TriangleMesh {
        let mut old_to_new: HashMap<usize, usize> = HashMap::new();
        let mut new_positions = Vec::new();
        let mut new_normals = self.normals.as_ref().map(|_| Vec::new());

        for (i, &removed) in self.vertex_removed.iter().enumerate() {
            if !removed && self.vertex_edge[i] != INVALID {
                old_to_new.insert(i, new_positions.len());
                new_positions.push(self.positions[i]);
                if let (Some(out), Some(normals)) = (new_normals.as_mut(), self.normals.as_ref()) {
                    out.push(normals[i]);
                }
            }
        }

        let mut new_faces = Vec::new();
        for fi in 0..self.face_edge.len() {
            let he0 = self.face_edge[fi];
            if he0 == INVALID {
                continue;
            }
            let he1 = self.half_edges[he0].next;
            let v0 = self.source(he0);
            let v1 = self.half_edges[he0].target;
            let v2 = self.half_edges[he1].target;

            if let (Some(&nv0), Some(&nv1), Some(&nv2)) =
                (old_to_new.get(&v0), old_to_new.get(&v1), old_to_new.get(&v2))
            {
                if nv0 != nv1 && nv1 != nv2 && nv2 != nv0 {
                    new_faces.push([nv0, nv1, nv2]);
                }
            }
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(new_positions, new_faces);
        if let Some(normals) = new_normals {
            mesh.set_normals(normals);
        }
        mesh
    }
}

// ============================================================
// Edge Cost for Priority Queue
// ============================================================

#[derive(Debug, Clone, Copy)]
struct EdgeCost {
    cost: f64,
}

impl PartialEq for EdgeCost {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}
impl Eq for EdgeCost {}

impl PartialOrd for EdgeCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first
        other.cost.total_cmp(&self.cost)
    }
}

type EdgeQueue = PriorityQueue<(usize, usize), EdgeCost>;

#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// When to stop collapsing.
#[derive(Debug, Clone, Copy)]
enum StopAt {
    Faces(usize),
    Vertices(usize),
}

impl StopAt {
    fn reached(self, hem: &HalfEdgeMesh) -> bool {
        match self {
            StopAt::Faces(target) => hem.active_face_count <= target,
            StopAt::Vertices(target) => hem.active_vertex_count <= target,
        }
    }
}

// ============================================================
// Edge Collapse Simplifier
// ============================================================

/// Edge collapse mesh simplifier using half-edge data structure and QEM.
///
/// This simplifier builds a half-edge mesh for efficient local topology
/// queries (neighbor iteration, boundary detection, link condition checks)
/// and uses quadric error metrics to prioritize edge collapses. It holds
/// only configuration, so one instance can serve many meshes and threads.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCollapseSimplifier {
    /// Stop when the minimum collapse cost exceeds this threshold
    pub error_threshold: Option<f64>,
    /// Preserve mesh boundary edges
    pub preserve_boundary: bool,
    /// Extra penalty weight applied to boundary edge costs
    pub boundary_weight: f64,
}

impl Default for EdgeCollapseSimplifier {
    fn default() -> Self {
        Self {
            error_threshold: None,
            preserve_boundary: true,
            boundary_weight: 100.0,
        }
    }
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(
        error_threshold: Option<f64>,
        preserve_boundary: bool,
        boundary_weight: f64,
    ) -> Self {
        Self {
            error_threshold,
            preserve_boundary,
            boundary_weight,
        }
    }

    /// Collapse edges until at most `target_vertices` vertices remain, or no
    /// valid collapse is left.
    pub fn collapse_to_vertex_count(
        &self,
        mesh: &TriangleMesh,
        target_vertices: usize,
    ) -> Result<TriangleMesh> {
        self.run(mesh, StopAt::Vertices(target_vertices))
    }

    /// Queue priority for edge (a, b), or `None` if the edge must not collapse.
    fn edge_priority(&self, hem: &HalfEdgeMesh, a: usize, b: usize) -> Option<EdgeCost> {
        let on_boundary = hem.is_boundary_vertex(a) || hem.is_boundary_vertex(b);
        if self.preserve_boundary && on_boundary {
            return None;
        }
        let mut cost = hem.compute_collapse_cost(a, b);
        if on_boundary {
            cost += self.boundary_weight;
        }
        Some(EdgeCost { cost })
    }

    /// Build the initial priority queue of edge collapse candidates.
    fn build_queue(&self, hem: &HalfEdgeMesh) -> EdgeQueue {
        let mut queue = PriorityQueue::new();
        for vi in 0..hem.positions.len() {
            if hem.vertex_removed[vi] || hem.vertex_edge[vi] == INVALID {
                continue;
            }
            for he in hem.outgoing_half_edges(vi) {
                let target = hem.half_edges[he].target;
                let key = edge_key(vi, target);
                if queue.get(&key).is_some() {
                    continue;
                }
                if let Some(priority) = self.edge_priority(hem, vi, target) {
                    queue.push(key, priority);
                }
            }
        }
        queue
    }

    /// Refresh the queue entries of every edge around `v` after a collapse.
    fn requeue_around(&self, hem: &HalfEdgeMesh, queue: &mut EdgeQueue, v: usize) {
        for n in hem.neighbors(v) {
            if hem.vertex_removed[n] {
                continue;
            }
            let key = edge_key(v, n);
            match self.edge_priority(hem, v, n) {
                Some(priority) => {
                    queue.push(key, priority);
                }
                None => {
                    queue.remove(&key);
                }
            }
        }
    }

    fn run(&self, mesh: &TriangleMesh, stop: StopAt) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        mesh.validate_indices()?;

        let mut hem = HalfEdgeMesh::from_triangle_mesh(mesh);
        let mut queue = self.build_queue(&hem);
        let mut collapse_count = 0usize;

        while !stop.reached(&hem) && hem.active_face_count > 0 {
            let ((a, b), edge_cost) = match queue.pop() {
                Some(item) => item,
                None => break,
            };

            // Check error threshold
            if let Some(threshold) = self.error_threshold {
                if edge_cost.cost > threshold {
                    break;
                }
            }

            // Validate: both vertices still alive
            if hem.vertex_removed[a]
                || hem.vertex_removed[b]
                || hem.vertex_edge[a] == INVALID
                || hem.vertex_edge[b] == INVALID
            {
                continue;
            }

            // Orient so that a half-edge v1 -> v2 exists
            let (v1, v2) = if hem.find_half_edge(a, b).is_some() {
                (a, b)
            } else if hem.find_half_edge(b, a).is_some() {
                (b, a)
            } else {
                continue;
            };

            // Check link condition to avoid non-manifold topology
            if !hem.check_link_condition(v1, v2) {
                continue;
            }

            // An interior edge joining two boundary vertices would pinch the surface
            let interior_edge = hem
                .find_half_edge(v1, v2)
                .is_some_and(|h| hem.half_edges[h].twin != INVALID);
            if interior_edge && hem.is_boundary_vertex(v1) && hem.is_boundary_vertex(v2) {
                continue;
            }

            // Cheapest placement that keeps every surviving triangle oriented
            let placement = hem
                .collapse_candidates(v1, v2)
                .into_iter()
                .find(|(pos, _)| !hem.would_flip(v1, v2, pos));
            let Some((pos, _)) = placement else {
                continue;
            };

            if hem.collapse_edge(v1, v2, pos) {
                collapse_count += 1;
                self.requeue_around(&hem, &mut queue, v1);
            }
        }

        debug!(
            collapses = collapse_count,
            faces = hem.active_face_count,
            vertices = hem.active_vertex_count,
            "edge collapse finished"
        );
        Ok(hem.to_triangle_mesh())
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&reduction_ratio) {
            return Err(Error::InvalidData(
                "Reduction ratio must be between 0.0 and 1.0".to_string(),
            ));
        }
        if reduction_ratio == 0.0 {
            return Ok(mesh.clone());
        }

        let target_faces = ((1.0 - reduction_ratio) * mesh.face_count() as f32) as usize;
        self.run(mesh, StopAt::Faces(target_faces))
    }
}
