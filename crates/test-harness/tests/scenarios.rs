//! End-to-end scenarios: fixture meshes through analysis, recording,
//! feedback, retrieval and snapshot transfer.

use approx::assert_relative_eq;
use printwise_cases::{CaseLibrary, LessonKind, Outcome, RetrievalConfig};
use printwise_geometry::{AnalysisConfig, ThinWallThreshold};
use test_harness::helpers::*;
use test_harness::oracle::*;
use test_harness::Scenario;

// ── Geometry ────────────────────────────────────────────────────────────

#[test]
fn cube_needs_no_support_and_has_no_thin_walls() {
    let mut s = Scenario::quick().unwrap();
    s.analyze("cube", cube(20.0).unwrap()).unwrap();
    let f = s.features("cube").unwrap();

    assert_eq!(f.overhang_ratio, 0.0);
    assert_eq!(f.thin_wall_ratio, 0.0);
    assert!(f.watertight);
    assert!(f.orientation.is_identity());
    assert_relative_eq!(f.volume, 8000.0, max_relative = 1e-12);
    require_all(&s.check_model("cube").unwrap()).unwrap();
}

#[test]
fn thin_plate_is_mostly_thin_wall() {
    let mut s = Scenario::quick().unwrap();
    s.analyze("plate", thin_plate().unwrap()).unwrap();
    let f = s.features("plate").unwrap();

    assert!(f.thin_wall_ratio > 0.9, "thin ratio {}", f.thin_wall_ratio);
    assert_relative_eq!(f.min_wall_thickness.unwrap(), 0.5, epsilon = 1e-9);
    assert_relative_eq!(f.height, 0.5);
}

#[test]
fn relative_thin_wall_threshold_scales_with_part() {
    let config = AnalysisConfig {
        thin_wall_threshold: ThinWallThreshold::RelativeToSmallestDimension(0.5),
        ..AnalysisConfig::quick()
    };
    let mut s = Scenario::with_config(config, RetrievalConfig::default()).unwrap();
    // 0.5 * 0.5 = 0.25 cut-off: the 0.5 mm plate is no longer thin.
    s.analyze("plate", thin_plate().unwrap()).unwrap();
    assert_eq!(s.features("plate").unwrap().thin_wall_ratio, 0.0);
}

#[test]
fn flared_shape_is_reoriented() {
    let mut s = Scenario::quick().unwrap();
    s.analyze("flare", overhang_shape().unwrap()).unwrap();
    let f = s.features("flare").unwrap();

    assert!(f.orientation.upright_overhang_ratio > 0.3);
    assert!(f.overhang_ratio < f.orientation.upright_overhang_ratio);
    assert!(check_orientation_improves(f).passed);
    assert!(f.orientation.tilt_degrees() > 90.0);
}

#[test]
fn open_box_is_analyzed_but_not_watertight() {
    let mut s = Scenario::quick().unwrap();
    s.analyze("open", open_box(10.0).unwrap()).unwrap();
    let f = s.features("open").unwrap();
    assert!(!f.watertight);
    assert!(check_feature_invariants(f).passed);
    assert!(!check_watertight(s.mesh("open").unwrap()).passed);
}

// ── Feedback Loop ───────────────────────────────────────────────────────

#[test]
fn feedback_loop_prefers_successful_precedent() {
    let mut s = Scenario::quick().unwrap();
    s.analyze("cube-a", cube(20.0).unwrap()).unwrap();
    s.analyze("cube-b", cube(20.0).unwrap()).unwrap();
    s.analyze("cube-c", cube(21.0).unwrap()).unwrap();
    s.analyze("flare", overhang_shape().unwrap()).unwrap();

    for name in ["cube-a", "cube-b", "cube-c", "flare"] {
        s.record(name, "PLA").unwrap();
    }
    s.outcome("cube-a", Outcome::Failure, Some("layer shift")).unwrap();
    s.outcome("cube-b", Outcome::Success, None).unwrap();

    let lessons = s.retrieve("cube-a", 4).unwrap();
    require_all(&[check_ranking_order(&lessons)]).unwrap();
    assert_eq!(lessons[0].case.id, s.case_id("cube-b").unwrap());
    assert_eq!(lessons[0].kind, LessonKind::Precedent);

    let failed = lessons
        .iter()
        .find(|l| l.case.id == s.case_id("cube-a").unwrap())
        .unwrap();
    assert_eq!(failed.kind, LessonKind::Warning);
    assert_eq!(failed.case.notes.as_deref(), Some("layer shift"));

    let unverified = lessons
        .iter()
        .find(|l| l.case.id == s.case_id("cube-c").unwrap())
        .unwrap();
    assert_eq!(unverified.kind, LessonKind::Unverified);

    let stats = s.library().statistics();
    assert_eq!(stats.total_cases, 4);
    assert_eq!(stats.successful_cases, 1);
    assert_eq!(stats.failed_cases, 1);
    assert_eq!(stats.unknown_outcome, 2);
}

#[test]
fn free_text_feedback_is_classified() {
    let mut s = Scenario::quick().unwrap();
    s.analyze("cube", cube(10.0).unwrap()).unwrap();
    let id = s.record("cube", "PLA").unwrap();

    let outcome = s
        .library()
        .record_feedback_text(id, "print failed, warped and detached from bed")
        .unwrap();
    assert_eq!(outcome, Outcome::Failure);
    assert_eq!(s.library().get(id).unwrap().outcome, Outcome::Failure);
}

// ── Snapshot Transfer ───────────────────────────────────────────────────

#[test]
fn exported_library_answers_identically() {
    let mut s = Scenario::quick().unwrap();
    for (name, mesh) in [
        ("cube", cube(10.0).unwrap()),
        ("plate", thin_plate().unwrap()),
        ("flare", overhang_shape().unwrap()),
        ("tet", tetrahedron(15.0).unwrap()),
    ] {
        s.analyze(name, mesh).unwrap();
        s.record(name, "PLA").unwrap();
    }
    s.outcome("plate", Outcome::Failure, Some("curled")).unwrap();
    s.outcome("tet", Outcome::Neutral, None).unwrap();

    let json = s.library().export_to_string().unwrap();
    let restored = CaseLibrary::new(RetrievalConfig::default()).unwrap();
    restored.import_from_str(&json).unwrap();

    for name in ["cube", "plate", "flare", "tet"] {
        let probe = s.features(name).unwrap();
        assert_eq!(s.library().query(probe, 4), restored.query(probe, 4));
        let ours = s.library().retrieve(probe, 4);
        let theirs = restored.retrieve(probe, 4);
        assert_eq!(ours, theirs);
        assert!(check_ranking_order(&theirs).passed);
    }
}
