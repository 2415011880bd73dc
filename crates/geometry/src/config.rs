//! Configuration for geometric feature extraction.
//!
//! Every threshold the analyzer uses lives here so that two runs with the
//! same configuration are reproducible and policies can differ per printer.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// How the "thin wall" cut-off is derived for a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ThinWallThreshold {
    /// Fixed distance in mesh units (typically mm).
    Absolute(f64),
    /// Fraction of the smallest bounding-box dimension.
    RelativeToSmallestDimension(f64),
}

impl ThinWallThreshold {
    /// Resolve the threshold distance for a mesh with the given smallest extent.
    pub fn resolve(&self, smallest_dimension: f64) -> f64 {
        match *self {
            ThinWallThreshold::Absolute(d) => d,
            ThinWallThreshold::RelativeToSmallestDimension(f) => f * smallest_dimension,
        }
    }
}

/// Numeric tolerances used by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Faces whose area is below `degenerate_area * diag^2` are degenerate,
    /// where `diag` is the bounding-box diagonal.
    pub degenerate_area: f64,
    /// Vertices within this distance of the lowest point along the build
    /// direction rest on the plate.
    pub bed_contact: f64,
    /// Overhang ratios closer than this are treated as equal when ranking
    /// orientation candidates.
    pub tie_epsilon: f64,
    /// Ray-triangle intersection epsilon.
    pub ray_epsilon: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            degenerate_area: 1e-12,
            bed_contact: 1e-4,
            tie_epsilon: 1e-9,
            ray_epsilon: 1e-9,
        }
    }
}

/// Configuration controlling feature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Surfaces steeper than this angle from vertical need support (degrees).
    pub overhang_angle_threshold_degrees: f64,
    /// Number of candidate build directions evaluated by the orientation search.
    pub orientation_sample_count: usize,
    /// Optional wall-clock budget for the orientation search (milliseconds).
    pub orientation_time_budget_ms: Option<u64>,
    /// Cut-off below which a wall counts as thin.
    pub thin_wall_threshold: ThinWallThreshold,
    /// Maximum number of faces probed by the wall-thickness ray cast.
    pub thickness_sample_count: usize,
    /// Analysis fails when more than this fraction of faces is degenerate.
    pub max_degenerate_ratio: f64,
    pub tolerance: ToleranceConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            overhang_angle_threshold_degrees: 45.0,
            orientation_sample_count: 360,
            orientation_time_budget_ms: None,
            thin_wall_threshold: ThinWallThreshold::Absolute(1.0),
            thickness_sample_count: 2048,
            max_degenerate_ratio: 0.5,
            tolerance: ToleranceConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Filament printing: 45° overhangs, 1 mm minimum wall.
    pub fn fdm() -> Self {
        Self::default()
    }

    /// Resin printing: more conservative overhangs, thinner walls allowed.
    pub fn resin() -> Self {
        Self {
            overhang_angle_threshold_degrees: 30.0,
            thin_wall_threshold: ThinWallThreshold::Absolute(0.4),
            ..Self::default()
        }
    }

    /// Cheap preset for previews: axis and diagonal candidates only.
    pub fn quick() -> Self {
        Self {
            orientation_sample_count: 26,
            thickness_sample_count: 256,
            ..Self::default()
        }
    }

    /// Same configuration with a different overhang threshold and sample count.
    pub fn with_orientation(mut self, overhang_angle_threshold_degrees: f64, samples: usize) -> Self {
        self.overhang_angle_threshold_degrees = overhang_angle_threshold_degrees;
        self.orientation_sample_count = samples;
        self
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let fail = |reason: String| Err(GeometryError::InvalidConfig { reason });

        if !(0.0..90.0).contains(&self.overhang_angle_threshold_degrees) {
            return fail(format!(
                "overhang angle threshold must be in [0, 90) degrees, got {}",
                self.overhang_angle_threshold_degrees
            ));
        }
        if self.orientation_sample_count == 0 {
            return fail("orientation sample count must be at least 1".into());
        }
        match self.thin_wall_threshold {
            ThinWallThreshold::Absolute(d) if !(d.is_finite() && d >= 0.0) => {
                return fail(format!("thin-wall threshold must be non-negative, got {d}"));
            }
            ThinWallThreshold::RelativeToSmallestDimension(f) if !(f.is_finite() && f >= 0.0) => {
                return fail(format!("thin-wall fraction must be non-negative, got {f}"));
            }
            _ => {}
        }
        if !(0.0..=1.0).contains(&self.max_degenerate_ratio) {
            return fail(format!(
                "max degenerate ratio must be in [0, 1], got {}",
                self.max_degenerate_ratio
            ));
        }
        let tol = &self.tolerance;
        for (name, value) in [
            ("degenerate_area", tol.degenerate_area),
            ("bed_contact", tol.bed_contact),
            ("tie_epsilon", tol.tie_epsilon),
            ("ray_epsilon", tol.ray_epsilon),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return fail(format!("tolerance {name} must be non-negative, got {value}"));
            }
        }
        Ok(())
    }
}
