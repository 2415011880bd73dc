//! Volume, roughness and density measures.

use nalgebra::Point3;

use super::AnalysisContext;

/// Enclosed volume by signed tetrahedron decomposition about `reference`.
///
/// Exact for a closed, consistently wound mesh; an approximation otherwise.
/// The absolute value is returned so inverted winding still yields a
/// non-negative volume.
pub fn enclosed_volume(ctx: &AnalysisContext<'_>, reference: &Point3<f64>) -> f64 {
    let mesh = ctx.mesh;
    let six_v: f64 = (0..mesh.face_count())
        .filter(|&fi| ctx.usable[fi])
        .map(|fi| {
            let [a, b, c] = mesh.triangle(fi);
            let (a, b, c) = (a - reference, b - reference, c - reference);
            a.dot(&b.cross(&c))
        })
        .sum();
    (six_v / 6.0).abs()
}

/// Area-weighted variance of the angle between normals of edge-adjacent faces.
///
/// Each manifold edge contributes its dihedral normal angle, weighted by the
/// mean area of the two faces. Returns 0 when no edge is shared.
pub fn roughness(ctx: &AnalysisContext<'_>) -> f64 {
    let faces = ctx.mesh.faces();
    let edge_faces = ctx.mesh.edge_faces();

    // Sort for a summation order independent of hash iteration order.
    let mut samples: Vec<(f64, f64)> = Vec::with_capacity(edge_faces.len());
    let mut keys: Vec<_> = edge_faces.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        let adjacent = &edge_faces[&key];
        if adjacent.len() != 2 {
            continue;
        }
        let (fa, fb) = (adjacent[0], adjacent[1]);
        if !(ctx.usable[fa] && ctx.usable[fb]) {
            continue;
        }
        let cos = faces[fa].normal.dot(&faces[fb].normal).clamp(-1.0, 1.0);
        let weight = 0.5 * (faces[fa].area + faces[fb].area);
        samples.push((cos.acos(), weight));
    }

    let total_weight: f64 = samples.iter().map(|&(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let mean = samples.iter().map(|&(angle, w)| angle * w).sum::<f64>() / total_weight;
    samples
        .iter()
        .map(|&(angle, w)| w * (angle - mean) * (angle - mean))
        .sum::<f64>()
        / total_weight
}

/// Faces per unit bounding volume; zero when the bounding box is flat.
pub fn face_density(face_count: usize, bounding_volume: f64) -> f64 {
    if bounding_volume > 0.0 {
        face_count as f64 / bounding_volume
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::mesh::MeshModel;

    fn cube(size: f64) -> MeshModel {
        let s = size;
        MeshModel::from_arrays(
            &[
                [0.0, 0.0, 0.0],
                [s, 0.0, 0.0],
                [s, s, 0.0],
                [0.0, s, 0.0],
                [0.0, 0.0, s],
                [s, 0.0, s],
                [s, s, s],
                [0.0, s, s],
            ],
            &[
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
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cube_volume() {
        let mesh = cube(10.0);
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&mesh, &config);
        let v = enclosed_volume(&ctx, &mesh.bounds().center());
        assert!((v - 1000.0).abs() < 1e-9, "volume {v}");
    }

    #[test]
    fn test_volume_independent_of_reference() {
        let mesh = cube(2.0);
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&mesh, &config);
        let a = enclosed_volume(&ctx, &Point3::origin());
        let b = enclosed_volume(&ctx, &Point3::new(50.0, -20.0, 3.0));
        assert!((a - 8.0).abs() < 1e-9);
        assert!((b - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_cube_roughness_mixes_flat_and_square_edges() {
        let mesh = cube(1.0);
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&mesh, &config);
        // 12 cube edges at 90°, 6 diagonals at 0°, equal weights.
        let mean = (12.0 * std::f64::consts::FRAC_PI_2) / 18.0;
        let expected = (12.0 * (std::f64::consts::FRAC_PI_2 - mean).powi(2)
            + 6.0 * mean.powi(2))
            / 18.0;
        assert!((roughness(&ctx) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_flat_box_density_is_zero() {
        assert_eq!(face_density(10, 0.0), 0.0);
        assert!((face_density(12, 1000.0) - 0.012).abs() < 1e-15);
    }
}
