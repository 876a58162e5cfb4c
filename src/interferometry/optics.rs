pub mod fft;
mod psf;
mod resample;
mod wavefront;

pub use psf::{DEFAULT_FLOOR_DB, PsfConfig, PsfEvaluator, PsfResult, encircled_energy};
pub use resample::resample_bilinear;
pub use wavefront::Wavefront;
