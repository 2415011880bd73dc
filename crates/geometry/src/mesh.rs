//! Immutable triangulated surface.
//!
//! A `MeshModel` owns its vertices and faces and caches per-face unit
//! normals, areas and degeneracy flags. It carries no analysis logic beyond
//! construction-time validity checks and adjacency queries.

use std::collections::HashMap;

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::bounds::BoundingBox;
use crate::error::{GeometryError, InvalidGeometry};

/// Relative area tolerance used by [`MeshModel::new`].
pub const DEFAULT_DEGENERATE_AREA: f64 = 1e-12;

/// A triangle with its derived normal and area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub indices: [usize; 3],
    /// Unit normal following the counter-clockwise winding. Zero when degenerate.
    pub normal: Vector3<f64>,
    pub area: f64,
    pub degenerate: bool,
}

/// Undirected edge key, smaller vertex index first.
pub type EdgeKey = (usize, usize);

/// An immutable triangle mesh.
#[derive(Debug, Clone)]
pub struct MeshModel {
    vertices: Vec<Point3<f64>>,
    faces: Vec<Face>,
    bounds: BoundingBox,
}

impl MeshModel {
    /// Build a mesh, flagging degenerate faces with the default tolerance.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Result<Self, GeometryError> {
        Self::with_tolerance(vertices, faces, DEFAULT_DEGENERATE_AREA)
    }

    /// Build a mesh from plain coordinate arrays.
    pub fn from_arrays(vertices: &[[f64; 3]], faces: &[[usize; 3]]) -> Result<Self, GeometryError> {
        let vertices = vertices.iter().map(|v| Point3::new(v[0], v[1], v[2])).collect();
        Self::new(vertices, faces.to_vec())
    }

    /// Build a mesh. A face is degenerate when its area is below
    /// `degenerate_area * diagonal^2`; degenerate faces are kept and flagged.
    pub fn with_tolerance(
        vertices: Vec<Point3<f64>>,
        faces: Vec<[usize; 3]>,
        degenerate_area: f64,
    ) -> Result<Self, GeometryError> {
        if let Some(vertex) = vertices
            .iter()
            .position(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
        {
            return Err(InvalidGeometry::NonFiniteCoordinate { vertex }.into());
        }

        for (face, tri) in faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i >= vertices.len()) {
                return Err(InvalidGeometry::FaceIndexOutOfBounds {
                    face,
                    index,
                    vertex_count: vertices.len(),
                }
                .into());
            }
        }

        let bounds = BoundingBox::from_points(&vertices);
        let diag = bounds.diagonal();
        let min_area = degenerate_area * diag * diag;

        let faces = faces
            .into_iter()
            .map(|indices| {
                let [a, b, c] = indices.map(|i| vertices[i]);
                let cross = (b - a).cross(&(c - a));
                let double_area = cross.norm();
                let area = 0.5 * double_area;
                let degenerate = area <= min_area || indices[0] == indices[1]
                    || indices[1] == indices[2]
                    || indices[0] == indices[2];
                let normal = if degenerate {
                    Vector3::zeros()
                } else {
                    cross / double_area
                };
                Face {
                    indices,
                    normal,
                    area,
                    degenerate,
                }
            })
            .collect();

        Ok(Self {
            vertices,
            faces,
            bounds,
        })
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn degenerate_count(&self) -> usize {
        self.faces.iter().filter(|f| f.degenerate).count()
    }

    /// The three corners of a face.
    pub fn triangle(&self, face: usize) -> [Point3<f64>; 3] {
        self.faces[face].indices.map(|i| self.vertices[i])
    }

    pub fn centroid_of(&self, face: usize) -> Point3<f64> {
        let [a, b, c] = self.triangle(face);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Total area of non-degenerate faces.
    pub fn surface_area(&self) -> f64 {
        self.faces
            .iter()
            .filter(|f| !f.degenerate)
            .map(|f| f.area)
            .sum()
    }

    /// Map from undirected edge to the faces using it, in face order.
    pub fn edge_faces(&self) -> HashMap<EdgeKey, Vec<usize>> {
        let mut map: HashMap<EdgeKey, Vec<usize>> = HashMap::with_capacity(self.faces.len() * 3 / 2);
        for (fi, face) in self.faces.iter().enumerate() {
            for (a, b) in face_edges(&face.indices) {
                map.entry(edge_key(a, b)).or_default().push(fi);
            }
        }
        map
    }

    /// A closed, consistently wound 2-manifold: every undirected edge is
    /// shared by exactly two faces that traverse it in opposite directions.
    pub fn is_watertight(&self) -> bool {
        if self.faces.is_empty() {
            return false;
        }
        let mut directed: HashMap<(usize, usize), usize> = HashMap::with_capacity(self.faces.len() * 3);
        for face in &self.faces {
            for (a, b) in face_edges(&face.indices) {
                *directed.entry((a, b)).or_default() += 1;
            }
        }
        directed
            .iter()
            .all(|(&(a, b), &count)| count == 1 && directed.get(&(b, a)) == Some(&1))
    }

    /// A copy of this mesh moved by `offset`.
    pub fn translated(&self, offset: Vector3<f64>) -> Result<Self, GeometryError> {
        let vertices = self.vertices.iter().map(|v| v + offset).collect();
        Self::new(vertices, self.face_indices())
    }

    /// A copy of this mesh rotated about the origin.
    pub fn rotated(&self, rotation: &UnitQuaternion<f64>) -> Result<Self, GeometryError> {
        let vertices = self
            .vertices
            .iter()
            .map(|v| rotation.transform_point(v))
            .collect();
        Self::new(vertices, self.face_indices())
    }

    pub fn face_indices(&self) -> Vec<[usize; 3]> {
        self.faces.iter().map(|f| f.indices).collect()
    }
}

pub(crate) fn face_edges(tri: &[usize; 3]) -> [(usize, usize); 3] {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
}

pub(crate) fn edge_key(a: usize, b: usize) -> EdgeKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
