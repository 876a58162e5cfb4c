use std::io::Cursor;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::interferometry::common::{AnalysisError, Grid, IntensityImage, Result};
use crate::interferometry::frames::reader::FrameSource;

/// Reads single-channel TIFF frames (8/16/32-bit integer or float samples).
pub struct TiffFrameReader;

impl FrameSource for TiffFrameReader {
    fn read_frame(&self, data: &[u8]) -> Result<IntensityImage> {
        debug!("Decoding TIFF frame, {} bytes", data.len());

        let mut decoder = Decoder::new(Cursor::new(data))
            .map_err(|e| AnalysisError::DecodeError(e.to_string()))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| AnalysisError::DecodeError(e.to_string()))?;
        let colortype = decoder
            .colortype()
            .map_err(|e| AnalysisError::DecodeError(e.to_string()))?;

        if !matches!(colortype, ColorType::Gray(_)) {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "interferograms must be grayscale, found {colortype:?}"
            )));
        }

        let samples: Vec<f64> = match decoder
            .read_image()
            .map_err(|e| AnalysisError::DecodeError(e.to_string()))?
        {
            DecodingResult::U8(values) => values.into_iter().map(f64::from).collect(),
            DecodingResult::U16(values) => values.into_iter().map(f64::from).collect(),
            DecodingResult::U32(values) => values.into_iter().map(f64::from).collect(),
            DecodingResult::F32(values) => values.into_iter().map(f64::from).collect(),
            DecodingResult::F64(values) => values,
            _ => {
                return Err(AnalysisError::UnsupportedFormat(format!(
                    "sample type of {colortype:?} TIFF"
                )));
            }
        };

        debug!("Decoded frame: {}x{}", width, height);
        Grid::new(width as usize, height as usize, samples)
    }
}
