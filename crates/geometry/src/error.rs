/// Reasons a mesh cannot be analyzed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidGeometry {
    #[error("mesh has no faces")]
    NoFaces,

    #[error("face {face} references vertex {index} but the mesh has {vertex_count} vertices")]
    FaceIndexOutOfBounds {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("vertex {vertex} has a non-finite coordinate")]
    NonFiniteCoordinate { vertex: usize },

    #[error("{degenerate} of {total} faces are degenerate (tolerated ratio {tolerance})")]
    TooManyDegenerateFaces {
        degenerate: usize,
        total: usize,
        tolerance: f64,
    },
}

/// Errors from mesh construction, import, and analysis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] InvalidGeometry),

    #[error("invalid analysis configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("mesh import failed: {reason}")]
    Import { reason: String },
}

impl GeometryError {
    pub(crate) fn import(reason: impl Into<String>) -> Self {
        GeometryError::Import {
            reason: reason.into(),
        }
    }
}

pub type GeometryResult<T> = Result<T, GeometryError>;
