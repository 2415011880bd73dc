//! Structured text reports of an analysis and its retrieved lessons.
//!
//! Reports are plain text so a failing scenario prints something a person
//! can read without digging through JSON.

use std::fmt;

use printwise_cases::{FeatureSummary, Lesson};
use printwise_geometry::FeatureVector;
use serde::Serialize;

use crate::oracle::OracleVerdict;

/// A complete analysis report with all sections.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub name: String,
    pub material: Option<String>,
    pub features: Vec<(String, f64)>,
    pub summary: String,
    pub lessons: Vec<LessonEntry>,
    #[serde(skip)]
    pub oracle_results: Vec<OracleVerdict>,
}

/// One retrieved lesson.
#[derive(Debug, Clone, Serialize)]
pub struct LessonEntry {
    pub case_id: u64,
    pub kind: String,
    pub outcome: String,
    pub score: f64,
    pub distance: f64,
    pub notes: Option<String>,
}

impl From<&Lesson> for LessonEntry {
    fn from(lesson: &Lesson) -> Self {
        Self {
            case_id: lesson.case.id.0,
            kind: format!("{:?}", lesson.kind),
            outcome: lesson.case.outcome.as_str().to_string(),
            score: lesson.score,
            distance: lesson.distance,
            notes: lesson.case.notes.clone(),
        }
    }
}

impl AnalysisReport {
    pub fn from_features(name: &str, features: &FeatureVector) -> Self {
        Self {
            name: name.to_string(),
            material: None,
            features: features
                .named_fields()
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
            summary: features.summary(),
            lessons: Vec::new(),
            oracle_results: Vec::new(),
        }
    }

    pub fn from_summary(name: &str, summary: &FeatureSummary) -> Self {
        let mut report = Self::from_features(name, &summary.features);
        report.material = Some(summary.material.clone());
        report.lessons = summary.lessons.iter().map(LessonEntry::from).collect();
        report
    }

    pub fn with_verdicts(mut self, verdicts: Vec<OracleVerdict>) -> Self {
        self.oracle_results = verdicts;
        self
    }

    pub fn all_passed(&self) -> bool {
        self.oracle_results.iter().all(|v| v.passed)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Format the report as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("=== Analysis Report: {} ===\n\n", self.name));
        if let Some(material) = &self.material {
            out.push_str(&format!("Material: {}\n\n", material));
        }

        out.push_str(&format!("Features ({}):\n", self.features.len()));
        for (name, value) in &self.features {
            out.push_str(&format!("  {:<16} {:.6}\n", name, value));
        }
        out.push('\n');
        for line in self.summary.lines() {
            out.push_str(&format!("  {}\n", line));
        }

        if !self.lessons.is_empty() {
            out.push_str(&format!("\nLessons ({}):\n", self.lessons.len()));
            for l in &self.lessons {
                out.push_str(&format!(
                    "  case-{} [{}] outcome={} score={:.4} distance={:.4}\n",
                    l.case_id, l.kind, l.outcome, l.score, l.distance
                ));
                if let Some(notes) = &l.notes {
                    out.push_str(&format!("      notes: {}\n", notes));
                }
            }
        }

        if !self.oracle_results.is_empty() {
            let passed = self.oracle_results.iter().filter(|v| v.passed).count();
            out.push_str(&format!(
                "\nOracles ({}/{} passed):\n",
                passed,
                self.oracle_results.len()
            ));
            for v in &self.oracle_results {
                let status = if v.passed { "PASS" } else { "FAIL" };
                out.push_str(&format!("  [{}] {}: {}\n", status, v.oracle_name, v.detail));
            }
        }

        out
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
