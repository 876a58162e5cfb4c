use crate::interferometry::common::{IntensityImage, Result};

/// Decodes one encoded frame into intensity samples.
pub trait FrameSource {
    fn read_frame(&self, data: &[u8]) -> Result<IntensityImage>;
}
