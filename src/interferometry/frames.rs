//! Interferogram frame input module
//!
//! This module turns encoded camera frames into intensity images and groups
//! them into five-frame phase-shift sets.

mod reader;
mod tiff_reader;
mod rawloader_reader;
pub mod phase_shift_set;

pub use reader::FrameSource;
pub use tiff_reader::TiffFrameReader;
pub use rawloader_reader::RawLoaderReader;
pub use phase_shift_set::{PhaseShiftSet, FRAMES_PER_SET};
