//! Bounding volume hierarchy over mesh faces for the thickness ray cast.

use nalgebra::{Point3, Vector3};

use crate::bounds::BoundingBox;
use crate::mesh::MeshModel;

/// Ray-box slab test over `[0, max_t]`. Boxes are padded at build time, so
/// the test never rejects a box containing a hit.
fn ray_enters(bb: &BoundingBox, origin: &Point3<f64>, dir: &Vector3<f64>, max_t: f64) -> bool {
    let mut t_near = 0.0_f64;
    let mut t_far = max_t;
    for axis in 0..3 {
        let (lo, hi, o, d) = (bb.min[axis], bb.max[axis], origin[axis], dir[axis]);
        if d == 0.0 {
            if o < lo || o > hi {
                return false;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return false;
        }
    }
    true
}

fn padded(mut bb: BoundingBox, pad: f64) -> BoundingBox {
    bb.min -= Vector3::repeat(pad);
    bb.max += Vector3::repeat(pad);
    bb
}

#[derive(Debug)]
enum BvhNode {
    Leaf {
        bounds: BoundingBox,
        face: usize,
    },
    Internal {
        bounds: BoundingBox,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn bounds(&self) -> &BoundingBox {
        match self {
            Self::Leaf { bounds, .. } | Self::Internal { bounds, .. } => bounds,
        }
    }

    /// Median split along the longest axis of the node's bounds.
    fn build(mesh: &MeshModel, faces: &mut [usize], pad: f64) -> Option<Self> {
        match faces.len() {
            0 => None,
            1 => Some(Self::Leaf {
                bounds: padded(BoundingBox::from_points(&mesh.triangle(faces[0])), pad),
                face: faces[0],
            }),
            _ => {
                let mut bounds = BoundingBox::empty();
                for &fi in faces.iter() {
                    for p in &mesh.triangle(fi) {
                        bounds.expand_to_include(p);
                    }
                }
                let axis = bounds.size().imax();
                faces.sort_by(|&a, &b| {
                    mesh.centroid_of(a)[axis]
                        .total_cmp(&mesh.centroid_of(b)[axis])
                        .then_with(|| a.cmp(&b))
                });
                let mid = faces.len() / 2;
                let (lo, hi) = faces.split_at_mut(mid);
                match (Self::build(mesh, lo, pad), Self::build(mesh, hi, pad)) {
                    (Some(l), Some(r)) => Some(Self::Internal {
                        bounds: padded(bounds, pad),
                        left: Box::new(l),
                        right: Box::new(r),
                    }),
                    (Some(only), None) | (None, Some(only)) => Some(only),
                    (None, None) => None,
                }
            }
        }
    }
}

/// Face hierarchy built once per mesh; queries return the nearest hit among
/// the faces a caller-supplied filter accepts.
#[derive(Debug)]
pub struct FaceBvh<'a> {
    mesh: &'a MeshModel,
    root: Option<BvhNode>,
}

impl<'a> FaceBvh<'a> {
    /// Build over `faces`. `pad` widens every box to absorb rounding.
    pub fn build(mesh: &'a MeshModel, faces: impl IntoIterator<Item = usize>, pad: f64) -> Self {
        let mut faces: Vec<usize> = faces.into_iter().collect();
        let root = BvhNode::build(mesh, &mut faces, pad);
        Self { mesh, root }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Smallest `t > eps` at which the ray crosses an accepted face.
    pub fn nearest_hit(
        &self,
        origin: &Point3<f64>,
        dir: &Vector3<f64>,
        eps: f64,
        accept: impl Fn(usize) -> bool,
    ) -> Option<f64> {
        let root = self.root.as_ref()?;
        let mut nearest: Option<f64> = None;
        let mut stack: Vec<&BvhNode> = vec![root];
        while let Some(node) = stack.pop() {
            let limit = nearest.unwrap_or(f64::INFINITY);
            if !ray_enters(node.bounds(), origin, dir, limit) {
                continue;
            }
            match node {
                BvhNode::Leaf { face, .. } => {
                    if !accept(*face) {
                        continue;
                    }
                    let tri = self.mesh.triangle(*face);
                    if let Some(t) = super::thickness::ray_triangle(origin, dir, &tri, eps) {
                        nearest = Some(nearest.map_or(t, |n: f64| n.min(t)));
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        nearest
    }
}
