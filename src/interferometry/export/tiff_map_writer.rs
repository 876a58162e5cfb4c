use std::io::{Cursor, Write};

use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype::{Gray8, Gray32Float};
use tracing::debug;

use crate::interferometry::common::{AnalysisError, Grid, Mask, Result};
use crate::interferometry::export::types::TiffCompression;
use crate::interferometry::export::writer::MapWriter;

/// Writes maps as single-channel 32-bit float TIFF (NaN preserved) and masks
/// as 8-bit TIFF with 255 inside the aperture.
pub struct TiffMapWriter;

fn encode<C>(width: usize, height: usize, samples: &[C::Inner], compression: TiffCompression) -> Result<Vec<u8>>
where
    C: tiff::encoder::colortype::ColorType,
    [C::Inner]: tiff::encoder::TiffValue,
{
    let mut buffer = Vec::new();
    {
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| AnalysisError::EncodeError(e.to_string()))?
            .with_compression(compression.to_encoder());
        encoder
            .write_image::<C>(width as u32, height as u32, samples)
            .map_err(|e| AnalysisError::EncodeError(e.to_string()))?;
    }
    Ok(buffer)
}

impl MapWriter for TiffMapWriter {
    fn write_map(&self, map: &Grid<f64>, output: &mut dyn Write, compression: TiffCompression) -> Result<()> {
        let (width, height) = map.shape();
        debug!(width, height, ?compression, "Encoding float TIFF");
        let samples: Vec<f32> = map.data().iter().map(|&v| v as f32).collect();
        let buffer = encode::<Gray32Float>(width, height, &samples, compression)?;
        output.write_all(&buffer)?;
        Ok(())
    }

    fn write_mask(&self, mask: &Mask, output: &mut dyn Write, compression: TiffCompression) -> Result<()> {
        let (width, height) = mask.shape();
        debug!(width, height, "Encoding mask TIFF");
        let samples: Vec<u8> = mask.data().iter().map(|&inside| if inside { 255 } else { 0 }).collect();
        let buffer = encode::<Gray8>(width, height, &samples, compression)?;
        output.write_all(&buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom};

    use super::*;
    use crate::interferometry::frames::{FrameSource, TiffFrameReader};

    #[test]
    fn float_map_reads_back() {
        let map = Grid::new(3, 2, vec![0.5, -1.25, f64::NAN, 2.0, 0.0, 1e-3]).unwrap();
        let mut bytes = Vec::new();
        TiffMapWriter
            .write_map(&map, &mut bytes, TiffCompression::DeflateBalanced)
            .unwrap();

        let back = TiffFrameReader.read_frame(&bytes).unwrap();
        assert_eq!(back.shape(), (3, 2));
        assert_eq!(back[(1, 0)], -1.25);
        assert!(back[(2, 0)].is_nan());
        assert!((back[(2, 1)] - 1e-3).abs() < 1e-7);
    }

    #[test]
    fn mask_reads_back_as_levels() {
        let mask = Mask::circular(5, 5, 2.0, 2.0, 1.0).unwrap();
        let mut file = tempfile::tempfile().unwrap();
        TiffMapWriter.write_mask(&mask, &mut file, TiffCompression::Lzw).unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();
        let levels = TiffFrameReader.read_frame(&bytes).unwrap();
        assert_eq!(Mask::from_levels(&levels), mask);
    }
}
