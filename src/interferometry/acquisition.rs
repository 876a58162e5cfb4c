//! Phase-shift set acquisition
//!
//! Hardware is injected through the [`Camera`] and [`PhaseStepper`] traits.

mod session;
mod types;

pub use session::{Acquisition, AcquisitionHandle};
pub use types::{
    AcquisitionConfig, AcquisitionEvent, AcquisitionState, Camera, DEFAULT_SETTLE_TIME, DEFAULT_VOLTAGES,
    PhaseStepper, progress,
};
