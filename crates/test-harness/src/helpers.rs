//! Helper functions: error type, mesh fixtures, mesh math.

use std::collections::HashMap;

use printwise_cases::CaseError;
use printwise_geometry::{GeometryError, MeshModel};

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("case library error: {0}")]
    Case(#[from] CaseError),

    #[error("no model named {0:?}")]
    UnknownModel(String),

    #[error("model name {0:?} is already used")]
    DuplicateName(String),

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("STL error: {reason}")]
    StlError { reason: String },
}

// ── Fixtures ────────────────────────────────────────────────────────────────

/// Face list shared by every eight-corner fixture. Corners 0-3 are the
/// bottom ring and 4-7 the top ring, both counter-clockwise seen from +Z.
const HEXAHEDRON_FACES: [[usize; 3]; 12] = [
    [0, 2, 1],
    [0, 3, 2],
    [4, 5, 6],
    [4, 6, 7],
    [0, 1, 5],
    [0, 5, 4],
    [1, 2, 6],
    [1, 6, 5],
    [2, 3, 7],
    [2, 7, 6],
    [3, 0, 4],
    [3, 4, 7],
];

/// Axis-aligned box with one corner at the origin.
pub fn box_mesh(width: f64, depth: f64, height: f64) -> Result<MeshModel, HarnessError> {
    let (x, y, z) = (width, depth, height);
    Ok(MeshModel::from_arrays(
        &[
            [0.0, 0.0, 0.0],
            [x, 0.0, 0.0],
            [x, y, 0.0],
            [0.0, y, 0.0],
            [0.0, 0.0, z],
            [x, 0.0, z],
            [x, y, z],
            [0.0, y, z],
        ],
        &HEXAHEDRON_FACES,
    )?)
}

pub fn cube(size: f64) -> Result<MeshModel, HarnessError> {
    box_mesh(size, size, size)
}

/// 50 × 50 × 0.5 mm plate.
pub fn thin_plate() -> Result<MeshModel, HarnessError> {
    box_mesh(50.0, 50.0, 0.5)
}

/// Square frustum centred on the Z axis, `bottom` wide at z = 0 and `top`
/// wide at z = `height`. With `top > bottom` the sides overhang.
pub fn frustum(bottom: f64, top: f64, height: f64) -> Result<MeshModel, HarnessError> {
    let (b, t) = (bottom / 2.0, top / 2.0);
    Ok(MeshModel::from_arrays(
        &[
            [-b, -b, 0.0],
            [b, -b, 0.0],
            [b, b, 0.0],
            [-b, b, 0.0],
            [-t, -t, height],
            [t, -t, height],
            [t, t, height],
            [-t, t, height],
        ],
        &HEXAHEDRON_FACES,
    )?)
}

/// An inverted pyramid-like shape whose sides need support when printed as
/// loaded: 2 mm foot, 30 mm top, 10 mm tall.
pub fn overhang_shape() -> Result<MeshModel, HarnessError> {
    frustum(2.0, 30.0, 10.0)
}

/// Box without its top: not watertight.
pub fn open_box(size: f64) -> Result<MeshModel, HarnessError> {
    let closed = cube(size)?;
    let faces: Vec<[usize; 3]> = closed
        .face_indices()
        .into_iter()
        .filter(|f| !(f[0] >= 4 && f[1] >= 4 && f[2] >= 4))
        .collect();
    Ok(MeshModel::new(closed.vertices().to_vec(), faces)?)
}

/// Right-angled tetrahedron with legs of length `size`.
pub fn tetrahedron(size: f64) -> Result<MeshModel, HarnessError> {
    let s = size;
    Ok(MeshModel::from_arrays(
        &[[0.0, 0.0, 0.0], [s, 0.0, 0.0], [0.0, s, 0.0], [0.0, 0.0, s]],
        &[[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
    )?)
}

// ── Mesh Math ───────────────────────────────────────────────────────────────

/// Count mesh edges: returns (total_edges, boundary_edges).
///
/// A boundary edge is used by exactly one triangle. For a watertight mesh,
/// boundary_edges should be 0.
pub fn count_mesh_edges(mesh: &MeshModel) -> (usize, usize) {
    let mut edge_counts: HashMap<(usize, usize), usize> = HashMap::new();
    for tri in mesh.face_indices() {
        for &(a, b) in &[(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            *edge_counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    let total = edge_counts.len();
    let boundary = edge_counts.values().filter(|&&c| c == 1).count();
    (total, boundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_edges_are_closed() {
        let (total, boundary) = count_mesh_edges(&cube(1.0).unwrap());
        // 12 cube edges + 6 face diagonals
        assert_eq!(total, 18);
        assert_eq!(boundary, 0);
    }

    #[test]
    fn open_box_has_boundary() {
        let mesh = open_box(10.0).unwrap();
        assert_eq!(mesh.face_count(), 10);
        let (_, boundary) = count_mesh_edges(&mesh);
        assert_eq!(boundary, 4);
        assert!(!mesh.is_watertight());
    }

    #[test]
    fn fixtures_are_watertight() {
        for mesh in [
            cube(10.0).unwrap(),
            thin_plate().unwrap(),
            overhang_shape().unwrap(),
            tetrahedron(5.0).unwrap(),
        ] {
            assert!(mesh.is_watertight());
            assert_eq!(mesh.degenerate_count(), 0);
        }
    }
}
