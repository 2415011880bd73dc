//! The feature vector produced by analysis.
//!
//! A `FeatureVector` is both the human-facing summary of a model and, through
//! [`FeatureVector::encode`], the fixed-order numeric vector used for
//! similarity search.

use std::fmt;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of numeric fields in the similarity encoding.
pub const FEATURE_COUNT: usize = 11;

/// Fields of the similarity encoding, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureField {
    Width,
    Depth,
    Height,
    Volume,
    FaceCount,
    FaceDensity,
    OverhangRatio,
    BuildTilt,
    ThinWallRatio,
    Watertight,
    Roughness,
}

impl FeatureField {
    pub const ALL: [FeatureField; FEATURE_COUNT] = [
        FeatureField::Width,
        FeatureField::Depth,
        FeatureField::Height,
        FeatureField::Volume,
        FeatureField::FaceCount,
        FeatureField::FaceDensity,
        FeatureField::OverhangRatio,
        FeatureField::BuildTilt,
        FeatureField::ThinWallRatio,
        FeatureField::Watertight,
        FeatureField::Roughness,
    ];

    /// Position in the encoded array.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            FeatureField::Width => "width",
            FeatureField::Depth => "depth",
            FeatureField::Height => "height",
            FeatureField::Volume => "volume",
            FeatureField::FaceCount => "face_count",
            FeatureField::FaceDensity => "face_density",
            FeatureField::OverhangRatio => "overhang_ratio",
            FeatureField::BuildTilt => "build_tilt",
            FeatureField::ThinWallRatio => "thin_wall_ratio",
            FeatureField::Watertight => "watertight",
            FeatureField::Roughness => "roughness",
        }
    }
}

impl fmt::Display for FeatureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The build orientation chosen by the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOrientation {
    /// Unit quaternion `[w, i, j, k]` rotating the model so that
    /// `build_direction` points along +Z.
    pub rotation: [f64; 4],
    /// Direction in the model's own frame that becomes "up".
    pub build_direction: [f64; 3],
    /// Overhang ratio with the model printed as loaded (+Z up).
    pub upright_overhang_ratio: f64,
    #[serde(default)]
    pub candidates_evaluated: usize,
    #[serde(default)]
    pub candidates_total: usize,
    /// The time budget ran out before every candidate was scored.
    #[serde(default)]
    pub partial: bool,
}

impl BuildOrientation {
    /// No rotation; used when the upright orientation is the best one found.
    pub fn identity(upright_overhang_ratio: f64) -> Self {
        Self {
            rotation: [1.0, 0.0, 0.0, 0.0],
            build_direction: [0.0, 0.0, 1.0],
            upright_overhang_ratio,
            candidates_evaluated: 1,
            candidates_total: 1,
            partial: false,
        }
    }

    pub fn unit_quaternion(&self) -> UnitQuaternion<f64> {
        let [w, i, j, k] = self.rotation;
        UnitQuaternion::from_quaternion(Quaternion::new(w, i, j, k))
    }

    /// Roll, pitch and yaw of the rotation in degrees.
    pub fn euler_degrees(&self) -> [f64; 3] {
        let (roll, pitch, yaw) = self.unit_quaternion().euler_angles();
        [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
    }

    /// Angle between the chosen build direction and the model's +Z (degrees).
    pub fn tilt_degrees(&self) -> f64 {
        let d = Vector3::from(self.build_direction);
        match d.try_normalize(1e-15) {
            Some(d) => d.z.clamp(-1.0, 1.0).acos().to_degrees(),
            None => 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.tilt_degrees() < 1e-9
    }
}

/// Support requirements in the chosen orientation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportProfile {
    /// Area fraction steeper than 60° from vertical.
    pub severe_overhang_ratio: f64,
    /// Area fraction steeper than 75° from vertical.
    pub extreme_overhang_ratio: f64,
    /// Steepest overhanging surface, degrees from vertical.
    pub max_overhang_angle_degrees: f64,
    pub needs_supports: bool,
    pub recommend_tree_supports: bool,
}

impl SupportProfile {
    pub fn from_ratios(overhang: f64, severe: f64, extreme: f64, max_angle: f64) -> Self {
        Self {
            severe_overhang_ratio: severe,
            extreme_overhang_ratio: extreme,
            max_overhang_angle_degrees: max_angle,
            needs_supports: overhang > 0.10,
            recommend_tree_supports: severe > 0.05
                || (overhang > 0.15 && extreme > 0.02)
                || overhang > 0.20,
        }
    }
}

/// Coarse detail classification from faces per unit surface area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl DetailLevel {
    pub fn classify(face_count: usize, surface_area: f64) -> Self {
        let density = if surface_area > 0.0 {
            face_count as f64 / surface_area
        } else {
            0.0
        };
        if density > 100.0 {
            DetailLevel::VeryHigh
        } else if density > 50.0 {
            DetailLevel::High
        } else if density > 20.0 {
            DetailLevel::Medium
        } else {
            DetailLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Low => "low",
            DetailLevel::Medium => "medium",
            DetailLevel::High => "high",
            DetailLevel::VeryHigh => "very_high",
        }
    }
}

/// Geometric features of one analyzed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub volume: f64,
    pub face_count: usize,
    /// Faces per unit bounding volume; zero for a flat bounding box.
    pub face_density: f64,
    /// Overhang area fraction in the chosen orientation.
    pub overhang_ratio: f64,
    pub orientation: BuildOrientation,
    pub thin_wall_ratio: f64,
    pub watertight: bool,
    /// Area-weighted variance of dihedral normal angles (radians²).
    pub roughness: f64,
    #[serde(default)]
    pub surface_area: f64,
    #[serde(default)]
    pub vertex_count: usize,
    #[serde(default)]
    pub degenerate_faces: usize,
    #[serde(default)]
    pub min_wall_thickness: Option<f64>,
    #[serde(default)]
    pub support: SupportProfile,
}

impl FeatureVector {
    /// Fixed-order numeric encoding, see [`FeatureField::ALL`].
    pub fn encode(&self) -> [f64; FEATURE_COUNT] {
        FeatureField::ALL.map(|field| self.value(field))
    }

    pub fn value(&self, field: FeatureField) -> f64 {
        match field {
            FeatureField::Width => self.width,
            FeatureField::Depth => self.depth,
            FeatureField::Height => self.height,
            FeatureField::Volume => self.volume,
            FeatureField::FaceCount => self.face_count as f64,
            FeatureField::FaceDensity => self.face_density,
            FeatureField::OverhangRatio => self.overhang_ratio,
            FeatureField::BuildTilt => self.orientation.tilt_degrees(),
            FeatureField::ThinWallRatio => self.thin_wall_ratio,
            FeatureField::Watertight => {
                if self.watertight {
                    1.0
                } else {
                    0.0
                }
            }
            FeatureField::Roughness => self.roughness,
        }
    }

    /// Field name to value pairs in encoding order.
    pub fn named_fields(&self) -> Vec<(&'static str, f64)> {
        FeatureField::ALL
            .iter()
            .map(|&field| (field.name(), self.value(field)))
            .collect()
    }

    pub fn max_dimension(&self) -> f64 {
        self.width.max(self.depth).max(self.height)
    }

    pub fn min_dimension(&self) -> f64 {
        self.width.min(self.depth).min(self.height)
    }

    pub fn detail_level(&self) -> DetailLevel {
        DetailLevel::classify(self.face_count, self.surface_area)
    }

    /// Check the stored invariants; returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (name, value) in [
            ("overhang_ratio", self.overhang_ratio),
            ("thin_wall_ratio", self.thin_wall_ratio),
            ("upright_overhang_ratio", self.orientation.upright_overhang_ratio),
            ("severe_overhang_ratio", self.support.severe_overhang_ratio),
            ("extreme_overhang_ratio", self.support.extreme_overhang_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} = {value} is outside [0, 1]"));
            }
        }
        for (name, value) in [
            ("width", self.width),
            ("depth", self.depth),
            ("height", self.height),
            ("volume", self.volume),
            ("face_density", self.face_density),
            ("roughness", self.roughness),
            ("surface_area", self.surface_area),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{name} = {value} must be finite and non-negative"));
            }
        }
        let norm = self.orientation.rotation.iter().map(|c| c * c).sum::<f64>().sqrt();
        if !((norm - 1.0).abs() < 1e-6) {
            return Err(format!("orientation quaternion has norm {norm}, expected 1"));
        }
        Ok(())
    }

    /// Structured field-name to value record.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        record.insert(
            "detail_level".into(),
            Value::String(self.detail_level().as_str().into()),
        );
        record
    }

    /// Short multi-line description for people.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Dimensions: {:.1}mm x {:.1}mm x {:.1}mm",
                self.width, self.depth, self.height
            ),
            format!("Volume: {:.2} mm^3", self.volume),
            format!("Detail level: {}", self.detail_level().as_str()),
            format!("Watertight: {}", if self.watertight { "yes" } else { "no" }),
        ];

        if self.support.needs_supports {
            let kind = if self.support.recommend_tree_supports {
                "tree supports recommended"
            } else {
                "normal supports"
            };
            lines.push(format!(
                "Needs supports ({:.1}% overhangs), {kind}",
                self.overhang_ratio * 100.0
            ));
        } else {
            lines.push("No significant overhangs".into());
        }

        if !self.orientation.is_identity() {
            let [roll, pitch, yaw] = self.orientation.euler_degrees();
            lines.push(format!(
                "Reorient: roll {roll:.1}, pitch {pitch:.1}, yaw {yaw:.1} degrees (overhangs {:.1}% -> {:.1}%)",
                self.orientation.upright_overhang_ratio * 100.0,
                self.overhang_ratio * 100.0
            ));
        }

        let wall = if self.thin_wall_ratio > 0.5 { "thin" } else { "thick" };
        lines.push(format!(
            "Wall type: {wall} ({:.1}% thin)",
            self.thin_wall_ratio * 100.0
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_vector() -> FeatureVector {
        FeatureVector {
            width: 10.0,
            depth: 20.0,
            height: 5.0,
            volume: 1000.0,
            face_count: 12,
            face_density: 0.012,
            overhang_ratio: 0.25,
            orientation: BuildOrientation::identity(0.25),
            thin_wall_ratio: 0.0,
            watertight: true,
            roughness: 0.6,
            surface_area: 700.0,
            vertex_count: 8,
            degenerate_faces: 0,
            min_wall_thickness: Some(5.0),
            support: SupportProfile::from_ratios(0.25, 0.0, 0.0, 50.0),
        }
    }

    #[test]
    fn test_encoding_order_matches_fields() {
        let fv = sample_vector();
        let encoded = fv.encode();
        for field in FeatureField::ALL {
            assert_eq!(encoded[field.index()], fv.value(field), "field {field}");
        }
        assert_eq!(encoded[FeatureField::Watertight.index()], 1.0);
        assert_eq!(encoded[FeatureField::BuildTilt.index()], 0.0);
    }

    #[test]
    fn test_invariants_reject_out_of_range_ratio() {
        let mut fv = sample_vector();
        assert!(fv.check_invariants().is_ok());
        fv.thin_wall_ratio = 1.5;
        assert!(fv.check_invariants().unwrap_err().contains("thin_wall_ratio"));
    }

    #[test]
    fn test_invariants_reject_non_unit_rotation() {
        let mut fv = sample_vector();
        fv.orientation.rotation = [2.0, 0.0, 0.0, 0.0];
        assert!(fv.check_invariants().is_err());
    }

    #[test]
    fn test_tilt_of_flipped_direction() {
        let mut orientation = BuildOrientation::identity(0.0);
        orientation.build_direction = [0.0, 0.0, -1.0];
        assert!((orientation.tilt_degrees() - 180.0).abs() < 1e-9);
        assert!(!orientation.is_identity());
    }

    #[test]
    fn test_support_rules() {
        let none = SupportProfile::from_ratios(0.05, 0.0, 0.0, 10.0);
        assert!(!none.needs_supports);
        assert!(!none.recommend_tree_supports);

        let tree = SupportProfile::from_ratios(0.12, 0.06, 0.0, 70.0);
        assert!(tree.needs_supports);
        assert!(tree.recommend_tree_supports);
    }

    #[test]
    fn test_detail_level_thresholds() {
        assert_eq!(DetailLevel::classify(10, 1.0), DetailLevel::Low);
        assert_eq!(DetailLevel::classify(30, 1.0), DetailLevel::Medium);
        assert_eq!(DetailLevel::classify(60, 1.0), DetailLevel::High);
        assert_eq!(DetailLevel::classify(200, 1.0), DetailLevel::VeryHigh);
        assert_eq!(DetailLevel::classify(200, 0.0), DetailLevel::Low);
    }

    #[test]
    fn test_record_tolerates_unknown_fields_on_read() {
        let fv = sample_vector();
        let mut record = fv.to_record();
        assert_eq!(record["detail_level"], "low");
        record.insert("added_later".into(), Value::Bool(true));
        let back: FeatureVector = serde_json::from_value(Value::Object(record)).unwrap();
        assert_eq!(back, fv);
    }

    #[test]
    fn test_summary_mentions_supports() {
        let fv = sample_vector();
        let text = fv.summary();
        assert!(text.contains("Dimensions: 10.0mm x 20.0mm x 5.0mm"));
        assert!(text.contains("Needs supports (25.0% overhangs)"));
        assert!(text.contains("tree supports recommended"));
    }
}
