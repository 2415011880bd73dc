//! Test harness for end-to-end print-advice scenarios.
//!
//! Provides programmatic tools for scripting analyze/record/feedback runs,
//! verifying every step with oracles, and producing readable reports.
//!
//! # Key Components
//!
//! - [`Scenario`] — Fluent API over the analyzer and the case library
//! - [`oracle`] — Verification functions returning pass/fail verdicts
//! - [`report`] — Structured text analysis reports
//! - [`stl`] — STL export from MeshModel
//! - [`helpers`] — Mesh fixtures, mesh math, error type

pub mod helpers;
pub mod oracle;
pub mod report;
pub mod stl;
pub mod workflow;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use report::AnalysisReport;
pub use workflow::Scenario;
