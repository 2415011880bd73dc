//! Tests for verification oracles.

use printwise_cases::{CaseId, CaseLibrary, Neighbor, Outcome, RetrievalConfig};
use printwise_geometry::{analyze, FeatureVector};
use test_harness::helpers::{cube, open_box, overhang_shape};
use test_harness::oracle::*;
use test_harness::HarnessError;

fn cube_features() -> FeatureVector {
    analyze(&cube(10.0).unwrap(), 45.0, 26).unwrap()
}

// ── Mesh Oracle Tests ───────────────────────────────────────────────────

#[test]
fn watertight_passes_for_cube() {
    let result = check_watertight(&cube(10.0).unwrap());
    assert!(result.passed, "cube should be closed: {}", result.detail);
}

#[test]
fn watertight_fails_for_open_box() {
    let result = check_watertight(&open_box(10.0).unwrap());
    assert!(!result.passed);
    assert_eq!(result.value, Some(4.0));
}

// ── Feature Oracle Tests ────────────────────────────────────────────────

#[test]
fn feature_invariants_pass_for_cube() {
    let result = check_feature_invariants(&cube_features());
    assert!(result.passed, "{}", result.detail);
}

#[test]
fn feature_invariants_catch_ratio_out_of_range() {
    let mut features = cube_features();
    features.thin_wall_ratio = 1.5;
    let result = check_feature_invariants(&features);
    assert!(!result.passed);
    assert!(result.detail.contains("thin_wall_ratio"), "{}", result.detail);
}

#[test]
fn orientation_improves_for_flared_shape() {
    let features = analyze(&overhang_shape().unwrap(), 45.0, 26).unwrap();
    let result = check_orientation_improves(&features);
    assert!(result.passed, "{}", result.detail);
    assert!(result.value.unwrap() > 0.3, "{}", result.detail);
}

#[test]
fn orientation_oracle_flags_worse_choice() {
    let mut features = cube_features();
    features.overhang_ratio = 0.4;
    assert!(!check_orientation_improves(&features).passed);
}

#[test]
fn feature_close_reports_value() {
    let features = cube_features();
    let ok = check_feature_close(&features, "height", 10.0, 1e-9);
    assert!(ok.passed, "{}", ok.detail);
    assert_eq!(ok.value, Some(10.0));

    let off = check_feature_close(&features, "height", 12.0, 0.5);
    assert!(!off.passed);

    let missing = check_feature_close(&features, "no_such_field", 0.0, 1.0);
    assert!(!missing.passed);
    assert!(missing.value.is_none());
}

// ── Retrieval Oracle Tests ──────────────────────────────────────────────

#[test]
fn neighbors_sorted_accepts_ties_by_id() {
    let neighbors = [
        Neighbor { id: CaseId(2), distance: 0.0 },
        Neighbor { id: CaseId(5), distance: 0.0 },
        Neighbor { id: CaseId(1), distance: 0.3 },
    ];
    assert!(check_neighbors_sorted(&neighbors).passed);
}

#[test]
fn neighbors_sorted_rejects_reversed_ids() {
    let neighbors = [
        Neighbor { id: CaseId(5), distance: 0.0 },
        Neighbor { id: CaseId(2), distance: 0.0 },
    ];
    let result = check_neighbors_sorted(&neighbors);
    assert!(!result.passed);
    assert!(result.detail.contains("case-5"), "{}", result.detail);
}

#[test]
fn ranking_order_passes_for_library_output() {
    let library = CaseLibrary::new(RetrievalConfig::default()).unwrap();
    let features = cube_features();
    for outcome in [Outcome::Failure, Outcome::Success, Outcome::Neutral] {
        let id = library.record_analysis(features.clone(), "PLA").unwrap();
        library.record_outcome(id, outcome, None).unwrap();
    }
    let lessons = library.retrieve(&features, 3);
    assert!(check_ranking_order(&lessons).passed);

    let mut reversed = lessons.clone();
    reversed.reverse();
    assert!(!check_ranking_order(&reversed).passed);
}

#[test]
fn require_all_returns_first_failure() {
    let verdicts = vec![
        check_watertight(&cube(1.0).unwrap()),
        check_watertight(&open_box(1.0).unwrap()),
    ];
    match require_all(&verdicts) {
        Err(HarnessError::OracleFailure { oracle, .. }) => assert_eq!(oracle, "watertight"),
        other => panic!("expected oracle failure, got {:?}", other),
    }
    assert!(require_all(&verdicts[..1]).is_ok());
    assert!(verdicts[0].clone().into_result().is_ok());
}
