use std::io::Write;

use crate::interferometry::common::{Grid, Mask, Result};
use crate::interferometry::export::types::TiffCompression;

/// Sink for analysis maps (phase, surface, PSF, MTF) and masks.
pub trait MapWriter {
    fn write_map(&self, map: &Grid<f64>, output: &mut dyn Write, compression: TiffCompression) -> Result<()>;
    fn write_mask(&self, mask: &Mask, output: &mut dyn Write, compression: TiffCompression) -> Result<()>;
}
