//! STL export from MeshModel — binary and ASCII formats.
//!
//! Used to feed fixtures back through the importer so the full
//! bytes-to-features path is exercised.

use printwise_geometry::MeshModel;

use crate::helpers::HarnessError;

fn check_exportable(mesh: &MeshModel) -> Result<(), HarnessError> {
    if mesh.face_count() == 0 {
        return Err(HarnessError::StlError {
            reason: "mesh has no triangles".to_string(),
        });
    }
    Ok(())
}

/// Export a MeshModel as a binary STL file.
///
/// Binary STL format:
/// - 80-byte header (arbitrary text, must not start with "solid")
/// - u32 triangle count (little-endian)
/// - For each triangle: 3×f32 normal + 3×(3×f32 vertex) + u16 attribute = 50 bytes
pub fn export_binary_stl(mesh: &MeshModel, name: &str) -> Result<Vec<u8>, HarnessError> {
    check_exportable(mesh)?;
    let tri_count = u32::try_from(mesh.face_count()).map_err(|_| HarnessError::StlError {
        reason: format!("{} triangles do not fit a binary STL", mesh.face_count()),
    })?;

    let mut buf = Vec::with_capacity(84 + mesh.face_count() * 50);

    // 80-byte header
    let header = format!("binary STL: {}", name);
    let header_bytes = header.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(80)]);
    buf.resize(80, 0u8);

    buf.extend_from_slice(&tri_count.to_le_bytes());

    for (i, face) in mesh.faces().iter().enumerate() {
        for c in face.normal.iter() {
            buf.extend_from_slice(&(*c as f32).to_le_bytes());
        }
        for p in mesh.triangle(i) {
            for c in p.coords.iter() {
                buf.extend_from_slice(&(*c as f32).to_le_bytes());
            }
        }
        // Attribute byte count (unused)
        buf.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(buf)
}

/// Export a MeshModel as an ASCII STL string.
pub fn export_ascii_stl(mesh: &MeshModel, name: &str) -> Result<String, HarnessError> {
    check_exportable(mesh)?;

    let mut out = String::with_capacity(mesh.face_count() * 300);
    out.push_str(&format!("solid {}\n", name));

    for (i, face) in mesh.faces().iter().enumerate() {
        let n = face.normal;
        out.push_str(&format!("  facet normal {} {} {}\n", n.x, n.y, n.z));
        out.push_str("    outer loop\n");
        for p in mesh.triangle(i) {
            out.push_str(&format!("      vertex {} {} {}\n", p.x, p.y, p.z));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }

    out.push_str(&format!("endsolid {}\n", name));
    Ok(out)
}
