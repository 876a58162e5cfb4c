use std::f64::consts::TAU;

use rustfft::num_complex::Complex64;

use crate::interferometry::common::{Grid, Mask, PhaseMap, Result};

/// Complex pupil field `A·e^{iφ}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavefront {
    field: Grid<Complex64>,
}

impl Wavefront {
    pub fn new(field: Grid<Complex64>) -> Self {
        Self { field }
    }

    /// Unit amplitude inside `mask`, zero outside. A NaN phase inside the
    /// mask gives a NaN sample, which the evaluator treats as zero.
    pub fn from_phase(phase: &PhaseMap, mask: &Mask) -> Result<Self> {
        let field = phase.zip_map(mask, |&phi, &inside| {
            if inside {
                Complex64::from_polar(1.0, phi)
            } else {
                Complex64::new(0.0, 0.0)
            }
        })?;
        Ok(Self { field })
    }

    /// Same as [`Wavefront::from_phase`] for a surface given in waves.
    pub fn from_surface(surface: &Grid<f64>, mask: &Mask) -> Result<Self> {
        Self::from_phase(&surface.map(|&waves| waves * TAU), mask)
    }

    pub fn field(&self) -> &Grid<Complex64> {
        &self.field
    }

    pub fn shape(&self) -> (usize, usize) {
        self.field.shape()
    }

    pub(crate) fn real(&self) -> Grid<f64> {
        self.field.map(|c| c.re)
    }

    pub(crate) fn imaginary(&self) -> Grid<f64> {
        self.field.map(|c| c.im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interferometry::common::AnalysisError;

    #[test]
    fn masked_samples_are_zero() {
        let phase = Grid::new(2, 1, vec![0.0, 1.0]).unwrap();
        let mask = Grid::new(2, 1, vec![true, false]).unwrap();
        let wavefront = Wavefront::from_phase(&phase, &mask).unwrap();
        assert_eq!(wavefront.field()[(0, 0)], Complex64::new(1.0, 0.0));
        assert_eq!(wavefront.field()[(1, 0)], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn quarter_wave_surface_is_imaginary() {
        let surface = Grid::new(1, 1, vec![0.25]).unwrap();
        let mask = Grid::filled(1, 1, true).unwrap();
        let sample = Wavefront::from_surface(&surface, &mask).unwrap().field()[(0, 0)];
        assert!(sample.re.abs() < 1e-12);
        assert!((sample.im - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nan_phase_inside_mask_is_nan() {
        let phase = Grid::new(1, 1, vec![f64::NAN]).unwrap();
        let mask = Grid::filled(1, 1, true).unwrap();
        let sample = Wavefront::from_phase(&phase, &mask).unwrap().field()[(0, 0)];
        assert!(sample.re.is_nan());
    }

    #[test]
    fn rejects_mask_mismatch() {
        let phase = Grid::filled(2, 2, 0.0).unwrap();
        let mask = Grid::filled(2, 1, true).unwrap();
        assert!(matches!(
            Wavefront::from_phase(&phase, &mask),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }
}
