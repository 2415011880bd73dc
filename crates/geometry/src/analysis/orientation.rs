//! Build-orientation search.
//!
//! Brute-force global search over candidate build directions. The overhang
//! measure is discontinuous in the direction, so every candidate is scored
//! independently (in parallel) and the minimum is taken in candidate order.

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use nalgebra::{UnitQuaternion, Vector3};
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use super::AnalysisContext;
use crate::features::BuildOrientation;

/// Surfaces steeper than this from vertical are "severe" overhangs (degrees).
pub const SEVERE_OVERHANG_DEGREES: f64 = 60.0;
/// Surfaces steeper than this from vertical are "extreme" overhangs (degrees).
pub const EXTREME_OVERHANG_DEGREES: f64 = 75.0;

/// Overhang measurements for one build direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverhangStats {
    /// Fraction of surface area needing support.
    pub ratio: f64,
    pub severe_ratio: f64,
    pub extreme_ratio: f64,
    /// Steepest overhang in degrees from vertical, 0 when there is none.
    pub max_angle_degrees: f64,
}

/// The search result: chosen orientation plus its overhang measurements.
#[derive(Debug, Clone)]
pub struct OrientationSearch {
    pub orientation: BuildOrientation,
    pub best: OverhangStats,
    pub upright: OverhangStats,
}

/// Candidate build directions, +Z first.
///
/// The first 26 are the face, edge and corner directions of the unit cube
/// (+Z, the other five axes, twelve edge diagonals, eight corner diagonals).
/// Beyond that the sphere is filled with a Fibonacci lattice.
pub fn candidate_directions(count: usize) -> Vec<Vector3<f64>> {
    let mut dirs: Vec<Vector3<f64>> = Vec::with_capacity(count.max(1));
    dirs.push(Vector3::z());

    let mut lattice = Vec::with_capacity(25);
    for &(x, y, z) in &[
        (0.0, 0.0, -1.0),
        (1.0, 0.0, 0.0),
        (-1.0, 0.0, 0.0),
        (0.0, 1.0, 0.0),
        (0.0, -1.0, 0.0),
    ] {
        lattice.push(Vector3::new(x, y, z));
    }
    for a in [-1.0, 1.0] {
        for b in [-1.0, 1.0] {
            lattice.push(Vector3::new(a, b, 0.0));
            lattice.push(Vector3::new(a, 0.0, b));
            lattice.push(Vector3::new(0.0, a, b));
        }
    }
    for x in [-1.0, 1.0] {
        for y in [-1.0, 1.0] {
            for z in [-1.0, 1.0] {
                lattice.push(Vector3::new(x, y, z));
            }
        }
    }
    for d in lattice {
        if dirs.len() >= count {
            break;
        }
        dirs.push(d.normalize());
    }

    if count > dirs.len() {
        let remaining = count - dirs.len();
        let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
        for i in 0..remaining {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / remaining as f64;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let theta = golden_angle * i as f64;
            dirs.push(Vector3::new(r * theta.cos(), r * theta.sin(), z));
        }
    }

    dirs
}

/// Rotation taking `direction` onto +Z.
pub fn rotation_to_up(direction: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::rotation_between(direction, &Vector3::z())
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI))
}

/// Measure overhangs when the model is printed with `up` as build direction.
///
/// A face needs support when its normal lies within `90° - threshold` of
/// straight down. Faces resting on the plate (every corner within
/// `bed_contact` of the lowest point) never do.
pub fn evaluate_direction(ctx: &AnalysisContext<'_>, up: &Vector3<f64>) -> OverhangStats {
    let mesh = ctx.mesh;
    let config = ctx.config;
    let bed_contact = config.tolerance.bed_contact;

    let heights: Vec<f64> = mesh.vertices().iter().map(|v| v.coords.dot(up)).collect();
    let floor = heights.iter().copied().fold(f64::INFINITY, f64::min);

    let threshold = config.overhang_angle_threshold_degrees.to_radians();
    let overhang_cos = threshold.sin();
    let severe_cos = SEVERE_OVERHANG_DEGREES.to_radians().sin();
    let extreme_cos = EXTREME_OVERHANG_DEGREES.to_radians().sin();

    let mut overhang = 0.0;
    let mut severe = 0.0;
    let mut extreme = 0.0;
    let mut max_cos: Option<f64> = None;

    for (fi, face) in mesh.faces().iter().enumerate() {
        if !ctx.usable[fi] {
            continue;
        }
        // cos of the angle between the normal and straight down
        let down_cos = -face.normal.dot(up);
        if down_cos <= overhang_cos {
            continue;
        }
        if face.indices.iter().all(|&i| heights[i] <= floor + bed_contact) {
            continue;
        }
        overhang += face.area;
        if down_cos > severe_cos {
            severe += face.area;
        }
        if down_cos > extreme_cos {
            extreme += face.area;
        }
        max_cos = Some(max_cos.map_or(down_cos, |m: f64| m.max(down_cos)));
    }

    let total = ctx.total_area;
    let ratio = |area: f64| {
        if total > 0.0 {
            (area / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };

    OverhangStats {
        ratio: ratio(overhang),
        severe_ratio: ratio(severe),
        extreme_ratio: ratio(extreme),
        // angle from vertical = 90° - angle from straight down
        max_angle_degrees: max_cos
            .map(|c| 90.0 - c.clamp(-1.0, 1.0).acos().to_degrees())
            .unwrap_or(0.0),
    }
}

/// Score every candidate direction and pick the one with the least overhang.
///
/// Ties within `tie_epsilon` prefer the direction closest to the current +Z,
/// then the earlier candidate. When the time budget elapses, candidates not
/// yet started are skipped and the result is flagged `partial`. The upright
/// candidate is always scored.
#[instrument(skip(ctx), fields(faces = ctx.mesh.face_count()))]
pub fn search(ctx: &AnalysisContext<'_>) -> OrientationSearch {
    let config = ctx.config;
    let started = Instant::now();
    let deadline = config
        .orientation_time_budget_ms
        .map(|ms| started + Duration::from_millis(ms));

    let candidates = candidate_directions(config.orientation_sample_count);
    let upright = evaluate_direction(ctx, &candidates[0]);

    let scored: Vec<Option<OverhangStats>> = candidates[1..]
        .par_iter()
        .map(|dir| {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                None
            } else {
                Some(evaluate_direction(ctx, dir))
            }
        })
        .collect();

    let eps = config.tolerance.tie_epsilon;
    let mut best_index = 0usize;
    let mut best = upright;
    let mut evaluated = 1usize;
    for (offset, stats) in scored.iter().enumerate() {
        let Some(stats) = stats else { continue };
        evaluated += 1;
        let index = offset + 1;
        let better = stats.ratio < best.ratio - eps
            || ((stats.ratio - best.ratio).abs() <= eps
                && candidates[index].z > candidates[best_index].z + eps);
        if better {
            best = *stats;
            best_index = index;
        }
    }

    let partial = evaluated < candidates.len();
    if partial {
        warn!(
            evaluated,
            total = candidates.len(),
            budget_ms = config.orientation_time_budget_ms,
            "orientation time budget elapsed; returning best candidate so far"
        );
    }

    let direction = candidates[best_index];
    let rotation = rotation_to_up(&direction);
    let q = rotation.quaternion();
    debug!(
        best_index,
        overhang_ratio = best.ratio,
        upright_ratio = upright.ratio,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "orientation search finished"
    );

    OrientationSearch {
        orientation: BuildOrientation {
            rotation: [q.w, q.i, q.j, q.k],
            build_direction: [direction.x, direction.y, direction.z],
            upright_overhang_ratio: upright.ratio,
            candidates_evaluated: evaluated,
            candidates_total: candidates.len(),
            partial,
        },
        best,
        upright,
    }
}
