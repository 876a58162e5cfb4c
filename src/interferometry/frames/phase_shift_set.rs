//! Ordered five-frame phase-shift sets

use crate::interferometry::common::{AnalysisError, IntensityImage, Mask, Region, Result};

/// Number of frames consumed by the five-step demodulation.
pub const FRAMES_PER_SET: usize = 5;

/// Five same-sized interferograms captured at 0°, 90°, 180°, 270° and 360°.
///
/// The frame index encodes the phase step, so the order given at
/// construction is preserved.
#[derive(Debug, Clone)]
pub struct PhaseShiftSet {
    frames: [IntensityImage; FRAMES_PER_SET],
}

impl PhaseShiftSet {
    pub fn new(frames: Vec<IntensityImage>) -> Result<Self> {
        if frames.len() < FRAMES_PER_SET {
            return Err(AnalysisError::InsufficientFrames(frames.len()));
        }
        if frames.len() > FRAMES_PER_SET {
            return Err(AnalysisError::TooManyFrames(frames.len()));
        }
        for frame in &frames[1..] {
            frames[0].ensure_same_shape(frame)?;
        }
        let frames: [IntensityImage; FRAMES_PER_SET] = frames
            .try_into()
            .map_err(|v: Vec<IntensityImage>| AnalysisError::InsufficientFrames(v.len()))?;
        Ok(Self { frames })
    }

    /// Splits a stack of `5 * k` frames into `k` consecutive sets.
    pub fn split_stack(frames: Vec<IntensityImage>) -> Result<Vec<Self>> {
        let remainder = frames.len() % FRAMES_PER_SET;
        if frames.is_empty() || remainder != 0 {
            return Err(AnalysisError::InsufficientFrames(remainder));
        }
        let mut sets = Vec::with_capacity(frames.len() / FRAMES_PER_SET);
        let mut frames = frames.into_iter();
        loop {
            let chunk: Vec<IntensityImage> = frames.by_ref().take(FRAMES_PER_SET).collect();
            if chunk.is_empty() {
                break;
            }
            sets.push(Self::new(chunk)?);
        }
        Ok(sets)
    }

    pub fn frames(&self) -> &[IntensityImage; FRAMES_PER_SET] {
        &self.frames
    }

    /// `(width, height)` shared by all five frames.
    pub fn shape(&self) -> (usize, usize) {
        self.frames[0].shape()
    }

    /// Crops every frame to the same window.
    pub fn crop(&self, region: &Region) -> Result<Self> {
        let frames = self
            .frames
            .iter()
            .map(|frame| frame.crop(region))
            .collect::<Result<Vec<_>>>()?;
        Self::new(frames)
    }

    /// Applies `f` to each frame, keeping the order.
    pub fn map_frames(&self, f: impl Fn(&IntensityImage) -> IntensityImage) -> Result<Self> {
        Self::new(self.frames.iter().map(f).collect())
    }

    /// Fails unless `mask` matches the frame shape.
    pub fn ensure_mask_fits(&self, mask: &Mask) -> Result<()> {
        self.frames[0].ensure_same_shape(mask)
    }
}
