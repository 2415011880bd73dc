//! Wavefront OBJ import through `tobj`.
//!
//! Polygons are fan-triangulated by the loader. Every object and group in
//! the file is merged into one mesh, and material libraries are not read.

use std::io::BufRead;

use nalgebra::Point3;

use super::VertexWelder;
use crate::error::GeometryError;
use crate::mesh::MeshModel;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

pub fn parse(reader: &mut impl BufRead) -> Result<MeshModel, GeometryError> {
    let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| {
        Ok(Default::default())
    })
    .map_err(|e| GeometryError::import(format!("OBJ parse error: {e}")))?;

    let mut welder = VertexWelder::default();
    let mut faces = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        // Positions are per model; weld them into one shared list.
        let remap: Vec<usize> = mesh
            .positions
            .chunks_exact(3)
            .map(|c| welder.insert(Point3::new(c[0], c[1], c[2])))
            .collect();
        for tri in mesh.indices.chunks_exact(3) {
            let mut face = [0usize; 3];
            for (slot, &index) in face.iter_mut().zip(tri) {
                *slot = *remap.get(index as usize).ok_or_else(|| {
                    GeometryError::import(format!(
                        "OBJ object {:?} references vertex {} of {}",
                        model.name,
                        index + 1,
                        remap.len()
                    ))
                })?;
            }
            faces.push(face);
        }
    }
    MeshModel::new(welder.finish(), faces)
}
