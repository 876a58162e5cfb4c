//! Analysis configuration and results

use crate::interferometry::common::{Grid, Mask, PhaseMap, PipelineTimings};
use crate::interferometry::export::TiffCompression;
use crate::interferometry::optics::{PsfConfig, PsfResult};
use crate::interferometry::surface::{Aberration, SurfaceStatistics, ZernikeFit};

/// Pre-filter width used by the lab bench, in pixels.
pub const DEFAULT_GAUSSIAN_SIGMA: f64 = 10.0;

/// Configuration for interferogram analysis
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Gaussian pre-filter on every frame, `None` to skip
    pub gaussian_sigma: Option<f64>,
    /// Scale from unwrapped waves to surface waves (0.5 in reflection)
    pub wedge_factor: f64,
    /// Crop frames and mask to the mask's bounding box
    pub crop_to_mask: bool,
    /// Whether to validate frame dimensions before analysis
    pub validate_dimensions: bool,
    pub psf: PsfConfig,
    /// Fit Zernike coefficients even when nothing is removed
    pub fit_zernike: bool,
    /// Aberrations subtracted from the surface before the PSF
    pub remove_aberrations: Vec<Aberration>,
    /// Compression of exported maps
    pub compression: TiffCompression,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gaussian_sigma: Some(DEFAULT_GAUSSIAN_SIGMA),
            wedge_factor: 1.0,
            crop_to_mask: true,
            validate_dimensions: true,
            psf: PsfConfig::default(),
            fit_zernike: false,
            remove_aberrations: Vec::new(),
            compression: TiffCompression::None,
        }
    }
}

impl AnalysisConfig {
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }
}

/// Builder for AnalysisConfig
#[derive(Default)]
pub struct AnalysisConfigBuilder {
    gaussian_sigma: Option<Option<f64>>,
    wedge_factor: Option<f64>,
    crop_to_mask: Option<bool>,
    validate_dimensions: Option<bool>,
    psf: Option<PsfConfig>,
    fit_zernike: Option<bool>,
    remove_aberrations: Option<Vec<Aberration>>,
    compression: Option<TiffCompression>,
}

impl AnalysisConfigBuilder {
    pub fn gaussian_sigma(mut self, sigma: Option<f64>) -> Self {
        self.gaussian_sigma = Some(sigma);
        self
    }

    pub fn wedge_factor(mut self, factor: f64) -> Self {
        self.wedge_factor = Some(factor);
        self
    }

    pub fn crop_to_mask(mut self, crop: bool) -> Self {
        self.crop_to_mask = Some(crop);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn psf(mut self, psf: PsfConfig) -> Self {
        self.psf = Some(psf);
        self
    }

    pub fn fit_zernike(mut self, fit: bool) -> Self {
        self.fit_zernike = Some(fit);
        self
    }

    pub fn remove_aberrations(mut self, aberrations: Vec<Aberration>) -> Self {
        self.remove_aberrations = Some(aberrations);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn build(self) -> AnalysisConfig {
        let default = AnalysisConfig::default();
        AnalysisConfig {
            gaussian_sigma: self.gaussian_sigma.unwrap_or(default.gaussian_sigma),
            wedge_factor: self.wedge_factor.unwrap_or(default.wedge_factor),
            crop_to_mask: self.crop_to_mask.unwrap_or(default.crop_to_mask),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            psf: self.psf.unwrap_or(default.psf),
            fit_zernike: self.fit_zernike.unwrap_or(default.fit_zernike),
            remove_aberrations: self.remove_aberrations.unwrap_or(default.remove_aberrations),
            compression: self.compression.unwrap_or(default.compression),
        }
    }
}

/// Surface after Zernike terms were subtracted.
#[derive(Debug, Clone)]
pub struct CorrectedSurface {
    pub removed: Vec<Aberration>,
    pub correction: Grid<f64>,
    pub surface: Grid<f64>,
    pub statistics: SurfaceStatistics,
}

/// Everything computed from one phase-shift set.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Wrapped phase in radians, NaN outside the mask.
    pub wrapped_phase: PhaseMap,
    /// Unwrapped surface in waves, NaN outside the mask.
    pub surface: Grid<f64>,
    /// Aperture on the (possibly cropped) analysis grid.
    pub mask: Mask,
    pub statistics: SurfaceStatistics,
    pub zernike: Option<ZernikeFit>,
    pub corrected: Option<CorrectedSurface>,
    pub psf: PsfResult,
    pub timings: PipelineTimings,
}

impl AnalysisReport {
    /// Surface used for the PSF: corrected when aberrations were removed.
    pub fn final_surface(&self) -> &Grid<f64> {
        self.corrected.as_ref().map_or(&self.surface, |corrected| &corrected.surface)
    }

    pub fn final_statistics(&self) -> SurfaceStatistics {
        self.corrected.as_ref().map_or(self.statistics, |corrected| corrected.statistics)
    }
}
