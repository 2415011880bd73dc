//! STL import through `stl_io`, binary and ASCII.
//!
//! Stored normals are ignored; normals are recomputed from the winding.

use std::borrow::Cow;
use std::io::Cursor;

use nalgebra::Point3;

use super::VertexWelder;
use crate::error::GeometryError;
use crate::mesh::MeshModel;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

/// Parse an STL file. A file whose length matches its declared triangle
/// count is read as binary even when its header starts with `solid`.
pub fn parse(bytes: &[u8]) -> Result<MeshModel, GeometryError> {
    let bytes = if is_binary(bytes) && bytes.starts_with(b"solid") {
        // the header is free text; blank it so the reader does not take the
        // file for ASCII
        let mut owned = bytes.to_vec();
        owned[..5].fill(b' ');
        Cow::Owned(owned)
    } else {
        Cow::Borrowed(bytes)
    };

    let stl = stl_io::read_stl(&mut Cursor::new(bytes.as_ref()))
        .map_err(|e| GeometryError::import(format!("STL parse error: {e}")))?;

    let mut welder = VertexWelder::default();
    let remap: Vec<usize> = stl
        .vertices
        .iter()
        .map(|v| welder.insert(Point3::new(v.0[0] as f64, v.0[1] as f64, v.0[2] as f64)))
        .collect();
    let mut faces = Vec::with_capacity(stl.faces.len());
    for (n, tri) in stl.faces.iter().enumerate() {
        let mut face = [0usize; 3];
        for (slot, &index) in face.iter_mut().zip(&tri.vertices) {
            *slot = *remap.get(index).ok_or_else(|| {
                GeometryError::import(format!(
                    "STL facet {n} references vertex {index} of {}",
                    remap.len()
                ))
            })?;
        }
        faces.push(face);
    }
    MeshModel::new(welder.finish(), faces)
}

fn is_binary(bytes: &[u8]) -> bool {
    declared_count(bytes)
        .and_then(|n| n.checked_mul(TRIANGLE_LEN))
        .and_then(|n| n.checked_add(HEADER_LEN + 4))
        .is_some_and(|expected| expected == bytes.len())
}

fn declared_count(bytes: &[u8]) -> Option<usize> {
    let raw: [u8; 4] = bytes.get(HEADER_LEN..HEADER_LEN + 4)?.try_into().ok()?;
    usize::try_from(u32::from_le_bytes(raw)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA_ASCII: &str = "solid tetra
facet normal 0 0 -1
  outer loop
    vertex 0 0 0
    vertex 0 1 0
    vertex 1 0 0
  endloop
endfacet
facet normal 0 -1 0
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 0 1
  endloop
endfacet
facet normal 1 1 1
  outer loop
    vertex 1 0 0
    vertex 0 1 0
    vertex 0 0 1
  endloop
endfacet
facet normal -1 0 0
  outer loop
    vertex 0 0 0
    vertex 0 0 1
    vertex 0 1 0
  endloop
endfacet
endsolid tetra
";

    fn binary_from(tris: &[[[f32; 3]; 3]], header: &str) -> Vec<u8> {
        let mut buf = header.as_bytes().to_vec();
        buf.resize(HEADER_LEN, 0);
        buf.extend_from_slice(&(tris.len() as u32).to_le_bytes());
        for tri in tris {
            buf.extend_from_slice(&[0u8; 12]);
            for v in tri {
                for c in v {
                    buf.extend_from_slice(&c.to_le_bytes());
                }
            }
            buf.extend_from_slice(&0u16.to_le_bytes());
        }
        buf
    }

    #[test]
    fn test_ascii_tetrahedron_welds() {
        let mesh = parse(TETRA_ASCII.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 4);
        assert!(mesh.is_watertight());
    }

    #[test]
    fn test_binary_keeps_winding() {
        let bytes = binary_from(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]], "part");
        let mesh = parse(&bytes).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert!((mesh.faces()[0].normal.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_binary_with_solid_header() {
        // Binary files sometimes start with "solid" too.
        let bytes = binary_from(
            &[
                [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
                [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            ],
            "solid but binary",
        );
        let mesh = parse(&bytes).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_truncated_binary_rejected() {
        let mut bytes = binary_from(&[[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]], "x");
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(parse(&bytes), Err(GeometryError::Import { .. })));
    }

    #[test]
    fn test_ascii_bad_coordinate_is_an_import_error() {
        let text = "solid s\nfacet normal 0 0 1\nouter loop\nvertex 0 0 zero\n";
        let err = parse(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("STL parse error"), "{err}");
    }
}
