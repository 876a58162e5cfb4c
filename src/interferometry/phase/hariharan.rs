//! Hariharan five-frame phase demodulation.
//!
//! With frames `I_k = A + B cos(φ + k·π/2)`, `k = 0..=4`:
//!
//! ```text
//! φ = atan2(2 (I3 − I1), I0 + I4 − 2 I2)
//! ```
//!
//! The result is wrapped to (−π, π] and is the phase of frame 0. The
//! combination is insensitive to a linear phase-step miscalibration, which is
//! why the fifth frame (360°) is acquired.

use rayon::prelude::*;
use tracing::debug;

use crate::interferometry::common::{Grid, Mask, PhaseMap, Result};
use crate::interferometry::frames::PhaseShiftSet;

/// Demodulates one pixel; NaN when the denominator vanishes.
#[inline]
pub fn hariharan_pixel(i0: f64, i1: f64, i2: f64, i3: f64, i4: f64) -> f64 {
    let numerator = 2.0 * (i3 - i1);
    let denominator = i0 + i4 - 2.0 * i2;
    if denominator == 0.0 {
        return f64::NAN;
    }
    numerator.atan2(denominator)
}

/// Computes the wrapped phase map of a phase-shift set.
pub fn extract_phase(set: &PhaseShiftSet) -> Result<PhaseMap> {
    let (width, height) = set.shape();
    let [f0, f1, f2, f3, f4] = set.frames().each_ref().map(|frame| frame.data());

    let phase: Vec<f64> = (0..width * height)
        .into_par_iter()
        .map(|i| hariharan_pixel(f0[i], f1[i], f2[i], f3[i], f4[i]))
        .collect();

    let undefined = phase.iter().filter(|v| v.is_nan()).count();
    debug!(width, height, undefined, "Phase extracted");
    Grid::new(width, height, phase)
}

/// Same as [`extract_phase`], with NaN outside `mask`.
pub fn extract_phase_masked(set: &PhaseShiftSet, mask: &Mask) -> Result<PhaseMap> {
    set.ensure_mask_fits(mask)?;
    let phase = extract_phase(set)?;
    phase.zip_map(mask, |&value, &inside| if inside { value } else { f64::NAN })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interferometry::common::AnalysisError;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn fringe_set(width: usize, height: usize, phase: impl Fn(usize, usize) -> f64) -> PhaseShiftSet {
        let frames = (0..5)
            .map(|k| {
                Grid::from_fn(width, height, |x, y| {
                    120.0 + 80.0 * (phase(x, y) + k as f64 * FRAC_PI_2).cos()
                })
                .unwrap()
            })
            .collect();
        PhaseShiftSet::new(frames).unwrap()
    }

    fn wrapped_distance(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(2.0 * PI);
        d.min(2.0 * PI - d)
    }

    #[test]
    fn identical_frames_are_undefined_everywhere() {
        let frames = (0..5).map(|_| Grid::filled(4, 4, 100.0).unwrap()).collect();
        let set = PhaseShiftSet::new(frames).unwrap();

        let phase = extract_phase(&set).unwrap();

        assert_eq!(phase.shape(), (4, 4));
        assert!(phase.data().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn recovers_tilted_phase() {
        let truth = |x: usize, y: usize| 0.7 * x as f64 - 0.3 * y as f64 + 0.2;
        let set = fringe_set(16, 12, truth);

        let phase = extract_phase(&set).unwrap();

        for y in 0..12 {
            for x in 0..16 {
                let value = phase[(x, y)];
                assert!(value > -PI - 1e-12 && value <= PI + 1e-12);
                assert!(wrapped_distance(value, truth(x, y)) < 1e-9, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn mismatched_frames_fail_before_demodulation() {
        let mut frames: Vec<_> = (0..4).map(|_| Grid::filled(4, 4, 1.0).unwrap()).collect();
        frames.push(Grid::filled(5, 4, 1.0).unwrap());
        assert!(matches!(
            PhaseShiftSet::new(frames),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn masked_pixels_are_nan() {
        let set = fringe_set(4, 4, |x, _| x as f64 * 0.4);
        let mask = Grid::from_fn(4, 4, |x, _| x < 2).unwrap();

        let phase = extract_phase_masked(&set, &mask).unwrap();

        assert!(phase[(0, 0)].is_finite());
        assert!(phase[(1, 3)].is_finite());
        assert!(phase[(2, 0)].is_nan());
        assert!(phase[(3, 3)].is_nan());
    }

    #[test]
    fn masked_extraction_checks_mask_shape() {
        let set = fringe_set(4, 4, |_, _| 0.0);
        let mask = Grid::filled(3, 4, true).unwrap();
        assert!(matches!(
            extract_phase_masked(&set, &mask),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn quadrature_pixel() {
        // φ = π/2 lands exactly on a zero denominator
        let value = hariharan_pixel(1.0, 0.0, 1.0, 2.0, 1.0);
        assert!(value.is_nan());
        let value = hariharan_pixel(2.0, 1.0, 0.0, 1.0, 2.0);
        assert!(value.abs() < 1e-12);
    }
}
