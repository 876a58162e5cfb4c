//! Phase-shifting interferometry module
//!
//! Five-frame phase demodulation, surface statistics and PSF/MTF evaluation,
//! with the frame readers, map writers, masks, acquisition and pipeline that
//! surround them.

pub mod acquisition;
pub mod common;
pub mod export;
pub mod frames;
pub mod masks;
pub mod optics;
pub mod phase;
pub mod pipeline;
pub mod surface;

pub use common::{AnalysisError, Grid, IntensityImage, Mask, PhaseMap, Region, Result};

pub use frames::{FrameSource, PhaseShiftSet, RawLoaderReader, TiffFrameReader};

pub use phase::{extract_phase, extract_phase_masked, unwrap_phase};

pub use optics::{PsfConfig, PsfEvaluator, PsfResult, Wavefront};

pub use surface::{Aberration, SurfaceStatistics, ZernikeFit, surface_statistics, surface_statistics_masked};

pub use export::{MapWriter, TiffCompression, TiffMapWriter};

pub use pipeline::{AnalysisConfig, AnalysisConfigBuilder, AnalysisReport, InterferogramPipeline};
