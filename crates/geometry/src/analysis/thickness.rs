//! Wall-thickness sampling by inward ray casting.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, instrument};

use super::bvh::FaceBvh;
use super::AnalysisContext;

/// Result of the wall-thickness probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallThickness {
    /// Area-weighted fraction of sampled faces closer than the cut-off to the
    /// opposite wall.
    pub thin_ratio: f64,
    /// Smallest measured thickness, `None` when no ray hit anything.
    pub min_thickness: Option<f64>,
    pub sampled: usize,
    pub hits: usize,
}

/// Faces probed by the ray cast: every usable face, or an evenly strided
/// subset when there are more than `limit`.
pub fn sample_faces(ctx: &AnalysisContext<'_>, limit: usize) -> Vec<usize> {
    let usable: Vec<usize> = (0..ctx.mesh.face_count()).filter(|&fi| ctx.usable[fi]).collect();
    if limit == 0 || usable.len() <= limit {
        return usable;
    }
    let stride = usable.len().div_ceil(limit);
    usable.into_iter().step_by(stride).collect()
}

/// Cast a ray from each sampled face centroid along the inward normal and
/// classify the face as thin when the first opposite-facing wall is nearer
/// than `thin_cutoff`. Rays that escape (open meshes) count as thick.
#[instrument(skip(ctx), fields(faces = ctx.mesh.face_count()))]
pub fn measure(ctx: &AnalysisContext<'_>, thin_cutoff: f64) -> WallThickness {
    let samples = sample_faces(ctx, ctx.config.thickness_sample_count);
    let eps = ctx.config.tolerance.ray_epsilon;
    let bvh = face_hierarchy(ctx);

    let distances: Vec<Option<f64>> = samples
        .par_iter()
        .map(|&fi| {
            let origin = ctx.mesh.centroid_of(fi);
            let dir = -ctx.mesh.faces()[fi].normal;
            nearest_exit(ctx, &bvh, fi, &origin, &dir, eps)
        })
        .collect();

    let mut sampled_area = 0.0;
    let mut thin_area = 0.0;
    let mut min_thickness: Option<f64> = None;
    let mut hits = 0;
    for (&fi, distance) in samples.iter().zip(&distances) {
        let area = ctx.mesh.faces()[fi].area;
        sampled_area += area;
        if let Some(d) = *distance {
            hits += 1;
            min_thickness = Some(min_thickness.map_or(d, |m: f64| m.min(d)));
            if d < thin_cutoff {
                thin_area += area;
            }
        }
    }

    let thin_ratio = if sampled_area > 0.0 {
        (thin_area / sampled_area).clamp(0.0, 1.0)
    } else {
        0.0
    };
    debug!(
        sampled = samples.len(),
        hits,
        thin_cutoff,
        thin_ratio,
        "wall thickness sampled"
    );

    WallThickness {
        thin_ratio,
        min_thickness,
        sampled: samples.len(),
        hits,
    }
}

/// Hierarchy over the usable faces, padded by the ray epsilon scaled to the
/// part size.
fn face_hierarchy<'a>(ctx: &AnalysisContext<'a>) -> FaceBvh<'a> {
    let pad = ctx.config.tolerance.ray_epsilon * ctx.mesh.bounds().diagonal().max(1.0);
    let usable = (0..ctx.mesh.face_count()).filter(|&fi| ctx.usable[fi]);
    let bvh = FaceBvh::build(ctx.mesh, usable, pad);
    debug!(empty = bvh.is_empty(), "face hierarchy built");
    bvh
}

/// Distance to the nearest face the ray leaves the solid through.
fn nearest_exit(
    ctx: &AnalysisContext<'_>,
    bvh: &FaceBvh<'_>,
    source: usize,
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    eps: f64,
) -> Option<f64> {
    let faces = ctx.mesh.faces();
    bvh.nearest_hit(origin, dir, eps, |fi| fi != source && faces[fi].normal.dot(dir) > 0.0)
}

/// Moller-Trumbore ray-triangle intersection. Returns the ray parameter of
/// the hit for `t > eps`.
pub fn ray_triangle(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    tri: &[Point3<f64>; 3],
    eps: f64,
) -> Option<f64> {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let h = dir.cross(&e2);
    let det = e1.dot(&h);
    if det.abs() < 1e-14 {
        return None; // parallel
    }

    let inv_det = 1.0 / det;
    let s = origin - tri[0];
    let u = inv_det * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&e1);
    let v = inv_det * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * e2.dot(&q);
    (t > eps).then_some(t)
}
