//! Common utilities module
//!
//! This module contains the error type, the 2-D grid container and step
//! timing helpers shared across the analysis modules.

pub mod error;
pub mod grid;
pub mod timing;

pub use error::{AnalysisError, Result};
pub use grid::{Grid, IntensityImage, Mask, PhaseMap, Region};
pub use timing::{PipelineTimings, StepTiming, Timer};
