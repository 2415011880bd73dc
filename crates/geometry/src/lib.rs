//! Geometric feature extraction for 3D-print parameter advice.
//!
//! A [`MeshModel`] is loaded (or built in memory), handed to a
//! [`GeometryAnalyzer`], and comes back as a [`FeatureVector`]: bounding
//! dimensions, volume, the overhang-minimizing build orientation, thin-wall
//! share, watertightness and surface roughness.

pub mod analysis;
pub mod bounds;
pub mod config;
pub mod error;
pub mod features;
pub mod import;
pub mod mesh;

pub use analysis::{analyze, AnalysisContext, GeometryAnalyzer};
pub use bounds::BoundingBox;
pub use config::{AnalysisConfig, ThinWallThreshold, ToleranceConfig};
pub use error::{GeometryError, GeometryResult, InvalidGeometry};
pub use features::{
    BuildOrientation, DetailLevel, FeatureField, FeatureVector, SupportProfile, FEATURE_COUNT,
};
pub use import::{from_bytes, load_mesh, MeshFormat};
pub use mesh::{Face, MeshModel};
