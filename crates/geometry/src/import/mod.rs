//! Mesh import from STL and OBJ.
//!
//! Import is the only place this crate touches the filesystem. Vertices with
//! bit-identical positions are welded so that edge adjacency and the
//! watertightness check see a connected surface.

pub mod obj;
pub mod stl;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use nalgebra::Point3;
use tracing::{debug, instrument};

use crate::error::GeometryError;
use crate::mesh::MeshModel;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    /// Binary or ASCII STL, told apart by content.
    Stl,
    Obj,
}

impl MeshFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "stl" => Some(MeshFormat::Stl),
            "obj" => Some(MeshFormat::Obj),
            _ => None,
        }
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshFormat::Stl => write!(f, "STL"),
            MeshFormat::Obj => write!(f, "OBJ"),
        }
    }
}

/// Read a mesh file, choosing the parser by extension.
#[instrument]
pub fn load_mesh(path: &Path) -> Result<MeshModel, GeometryError> {
    let format = MeshFormat::from_extension(path).ok_or_else(|| {
        GeometryError::import(format!("unsupported mesh file extension: {}", path.display()))
    })?;
    let bytes = std::fs::read(path)
        .map_err(|e| GeometryError::import(format!("reading {}: {e}", path.display())))?;
    from_bytes(&bytes, format)
}

/// Parse an in-memory mesh file.
pub fn from_bytes(bytes: &[u8], format: MeshFormat) -> Result<MeshModel, GeometryError> {
    let mesh = match format {
        MeshFormat::Stl => stl::parse(bytes)?,
        MeshFormat::Obj => {
            let mut reader = bytes;
            obj::parse(&mut reader)?
        }
    };
    debug!(
        %format,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "mesh imported"
    );
    Ok(mesh)
}

/// Deduplicates vertex positions by exact bit pattern.
#[derive(Debug, Default)]
pub(crate) struct VertexWelder {
    vertices: Vec<Point3<f64>>,
    lookup: HashMap<[u64; 3], usize>,
}

impl VertexWelder {
    pub(crate) fn insert(&mut self, p: Point3<f64>) -> usize {
        // +0.0 and -0.0 are the same position
        let key = [p.x, p.y, p.z].map(|c| if c == 0.0 { 0u64 } else { c.to_bits() });
        *self.lookup.entry(key).or_insert_with(|| {
            self.vertices.push(p);
            self.vertices.len() - 1
        })
    }

    pub(crate) fn finish(self) -> Vec<Point3<f64>> {
        self.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MeshFormat::from_extension(Path::new("a/part.STL")), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::from_extension(Path::new("part.obj")), Some(MeshFormat::Obj));
        assert_eq!(MeshFormat::from_extension(Path::new("part.3mf")), None);
        assert_eq!(MeshFormat::from_extension(Path::new("part")), None);
    }

    #[test]
    fn test_welder_merges_signed_zero() {
        let mut welder = VertexWelder::default();
        let a = welder.insert(Point3::new(0.0, 1.0, 2.0));
        let b = welder.insert(Point3::new(-0.0, 1.0, 2.0));
        let c = welder.insert(Point3::new(0.0, 1.0, 2.5));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(welder.finish().len(), 2);
    }

    #[test]
    fn test_unknown_extension_is_import_error() {
        let err = load_mesh(Path::new("model.step")).unwrap_err();
        assert!(matches!(err, GeometryError::Import { .. }));
    }
}
