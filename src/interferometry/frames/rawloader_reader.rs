//! Camera RAW frame reader built on the rawloader library.
//!
//! Interferometry cameras run in monochrome mode, so the sensor values are
//! used directly as intensities after black-level subtraction; no
//! demosaicing is applied.

use std::io::Cursor;

use rawloader::RawImageData as RawloaderImageData;
use tracing::debug;

use crate::interferometry::common::{AnalysisError, Grid, IntensityImage, Result};
use crate::interferometry::frames::reader::FrameSource;

/// Frame reader for any RAW format rawloader can decode (ARW, RAF, DNG, ...).
pub struct RawLoaderReader;

impl FrameSource for RawLoaderReader {
    fn read_frame(&self, data: &[u8]) -> Result<IntensityImage> {
        debug!("Decoding RAW frame, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| AnalysisError::DecodeError(e.to_string()))?;

        if decoded.cpp != 1 {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "{} components per pixel",
                decoded.cpp
            )));
        }

        // Float RAW data is normalized to [0, 1]; integer data is clipped at
        // the black level so intensities stay non-negative.
        let black_level = decoded.blacklevels.iter().min().copied().unwrap_or(0) as f64;
        let samples: Vec<f64> = match decoded.data {
            RawloaderImageData::Integer(values) => values
                .iter()
                .map(|&v| (v as f64 - black_level).max(0.0))
                .collect(),
            RawloaderImageData::Float(values) => values.iter().map(|&v| f64::from(v.max(0.0))).collect(),
        };

        debug!("Decoded RAW frame: {}x{}, black level {}", decoded.width, decoded.height, black_level);
        Grid::new(decoded.width, decoded.height, samples)
    }
}
