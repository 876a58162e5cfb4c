//! Phase demodulation module
//!
//! Hariharan five-frame demodulation, the Gaussian pre-filter applied to the
//! interferograms and 2-D phase unwrapping.

pub mod filter;
pub mod hariharan;
pub mod unwrap;

pub use filter::gaussian_filter;
pub use hariharan::{extract_phase, extract_phase_masked, hariharan_pixel};
pub use unwrap::{to_waves, unwrap_phase};
