use std::time::Duration;

use crate::interferometry::common::{IntensityImage, Result};
use crate::interferometry::frames::{FRAMES_PER_SET, PhaseShiftSet};

/// Piezo voltages giving the nominal 0/90/180/270/360° steps.
pub const DEFAULT_VOLTAGES: [f64; FRAMES_PER_SET] = [0.80, 1.62, 2.43, 3.24, 4.05];

pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_millis(100);

/// Monochrome camera delivering one frame per call.
pub trait Camera: Send {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn capture(&mut self) -> Result<IntensityImage>;

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Actuator moving the reference mirror, driven by a voltage.
pub trait PhaseStepper: Send {
    fn move_to(&mut self, voltage: f64) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    pub voltages: [f64; FRAMES_PER_SET],
    /// Wait after each actuator move before capturing.
    pub settle_time: Duration,
    /// Number of five-frame sets to acquire.
    pub sets: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            voltages: DEFAULT_VOLTAGES,
            settle_time: DEFAULT_SETTLE_TIME,
            sets: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Acquiring { set: usize, frame: usize },
    Ready,
    Stopped,
    Failed,
}

#[derive(Debug, Clone)]
pub enum AcquisitionEvent {
    Started { sets: usize },
    FrameCaptured { set: usize, frame: usize, progress: u8 },
    SetReady { set: usize, frames: PhaseShiftSet },
    Finished { sets: usize },
    Stopped { completed_sets: usize },
    Failed(String),
}

/// Percentage of frames captured once `frame` of `set` is done.
pub fn progress(set: usize, frame: usize, sets: usize) -> u8 {
    let total = (sets * FRAMES_PER_SET).max(1);
    let done = set * FRAMES_PER_SET + frame + 1;
    ((done * 100) as f64 / total as f64).round().min(100.0) as u8
}
