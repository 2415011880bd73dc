pub mod bvh;
pub mod orientation;
pub mod surface;
pub mod thickness;

use tracing::{debug, info, instrument, warn};

use crate::config::AnalysisConfig;
use crate::error::{GeometryError, InvalidGeometry};
use crate::features::{FeatureVector, SupportProfile};
use crate::mesh::MeshModel;

/// A mesh paired with the configuration it is analyzed under.
///
/// `usable` marks the faces that take part in area-weighted measures: faces
/// flagged degenerate at construction, and faces below the configured area
/// tolerance, are excluded.
pub struct AnalysisContext<'a> {
    pub mesh: &'a MeshModel,
    pub config: &'a AnalysisConfig,
    pub usable: Vec<bool>,
    /// Total area of usable faces.
    pub total_area: f64,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(mesh: &'a MeshModel, config: &'a AnalysisConfig) -> Self {
        let diag = mesh.bounds().diagonal();
        let min_area = config.tolerance.degenerate_area * diag * diag;
        let usable: Vec<bool> = mesh
            .faces()
            .iter()
            .map(|f| !f.degenerate && f.area > min_area)
            .collect();
        let total_area = mesh
            .faces()
            .iter()
            .zip(&usable)
            .filter(|(_, &ok)| ok)
            .map(|(f, _)| f.area)
            .sum();
        Self {
            mesh,
            config,
            usable,
            total_area,
        }
    }

    pub fn unusable_count(&self) -> usize {
        self.usable.iter().filter(|&&ok| !ok).count()
    }
}

/// Computes a [`FeatureVector`] from a [`MeshModel`].
///
/// Stateless between calls; the same mesh and configuration always produce
/// an identical result regardless of the rayon pool size.
#[derive(Debug, Clone, Default)]
pub struct GeometryAnalyzer {
    config: AnalysisConfig,
}

impl GeometryAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, GeometryError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Extract the feature vector of `mesh`.
    ///
    /// Fails with [`InvalidGeometry`] when the mesh has no faces or when the
    /// share of degenerate faces exceeds `max_degenerate_ratio`. An open mesh
    /// is analyzed anyway: its volume is approximate and `watertight` is false.
    #[instrument(skip(self, mesh), fields(faces = mesh.face_count(), vertices = mesh.vertex_count()))]
    pub fn analyze(&self, mesh: &MeshModel) -> Result<FeatureVector, GeometryError> {
        if mesh.is_empty() {
            return Err(InvalidGeometry::NoFaces.into());
        }

        let ctx = AnalysisContext::new(mesh, &self.config);
        let degenerate = ctx.unusable_count();
        let total = mesh.face_count();
        if degenerate == total || degenerate as f64 / total as f64 > self.config.max_degenerate_ratio {
            return Err(InvalidGeometry::TooManyDegenerateFaces {
                degenerate,
                total,
                tolerance: self.config.max_degenerate_ratio,
            }
            .into());
        }

        let bounds = mesh.bounds();
        let size = bounds.size();
        let watertight = mesh.is_watertight();
        if !watertight {
            warn!(faces = total, "mesh is not watertight; volume is approximate");
        }
        let volume = surface::enclosed_volume(&ctx, &bounds.center());
        debug!(volume, watertight, degenerate, "measured volume");

        let search = orientation::search(&ctx);
        let support = SupportProfile::from_ratios(
            search.best.ratio,
            search.best.severe_ratio,
            search.best.extreme_ratio,
            search.best.max_angle_degrees,
        );

        let thin_cutoff = self
            .config
            .thin_wall_threshold
            .resolve(bounds.smallest_dimension());
        let walls = thickness::measure(&ctx, thin_cutoff);

        let roughness = surface::roughness(&ctx);
        let face_density = surface::face_density(total, bounds.volume());

        let features = FeatureVector {
            width: size.x,
            depth: size.y,
            height: size.z,
            volume,
            face_count: total,
            face_density,
            overhang_ratio: search.best.ratio,
            orientation: search.orientation,
            thin_wall_ratio: walls.thin_ratio,
            watertight,
            roughness,
            surface_area: ctx.total_area,
            vertex_count: mesh.vertex_count(),
            degenerate_faces: degenerate,
            min_wall_thickness: walls.min_thickness,
            support,
        };

        info!(
            overhang_ratio = features.overhang_ratio,
            upright_overhang_ratio = features.orientation.upright_overhang_ratio,
            thin_wall_ratio = features.thin_wall_ratio,
            evaluated = features.orientation.candidates_evaluated,
            candidates = features.orientation.candidates_total,
            partial = features.orientation.partial,
            "analysis complete"
        );
        Ok(features)
    }
}

/// Analyze with the default configuration and the given overhang threshold
/// and orientation sample count.
pub fn analyze(
    mesh: &MeshModel,
    overhang_angle_threshold_degrees: f64,
    orientation_sample_count: usize,
) -> Result<FeatureVector, GeometryError> {
    let config = AnalysisConfig::default()
        .with_orientation(overhang_angle_threshold_degrees, orientation_sample_count);
    GeometryAnalyzer::new(config)?.analyze(mesh)
}
