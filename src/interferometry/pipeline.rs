//! Interferogram analysis pipeline
//!
//! Orchestrates frame decoding, phase extraction, unwrapping, surface
//! statistics, optional Zernike correction and the PSF/MTF evaluation.

mod analysis;
pub mod types;


pub use analysis::InterferogramPipeline;
pub use types::{
    AnalysisConfig, AnalysisConfigBuilder, AnalysisReport, CorrectedSurface, DEFAULT_GAUSSIAN_SIGMA,
};
