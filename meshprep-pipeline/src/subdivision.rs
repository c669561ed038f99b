//! Reserved subdivision slot
//!
//! The optimize pass keeps a subdivision step between decimation and the
//! coarse split. It currently returns its input unchanged.

use meshprep_core::{NoOpReason, StageOutcome, TriangleMesh};

/// Run the subdivision slot. `iterations` and `weight` are accepted for
/// forward compatibility and ignored.
pub fn subdivide(mesh: TriangleMesh, _iterations: u8, _weight: f32) -> StageOutcome<TriangleMesh> {
    StageOutcome::unchanged(mesh, NoOpReason::SubdivisionReserved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshprep_core::Point3f;

    #[test]
    fn test_subdivision_is_identity() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::origin(),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let outcome = subdivide(mesh.clone(), 1, 0.5);
        assert_eq!(outcome.reason(), Some(NoOpReason::SubdivisionReserved));
        assert_eq!(outcome.into_value(), mesh);
    }
}
