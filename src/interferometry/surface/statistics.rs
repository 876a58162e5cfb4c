use tracing::debug;

use crate::interferometry::common::{AnalysisError, Grid, Mask, Result};

/// Peak-to-valley and RMS of a surface, in the surface's units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceStatistics {
    pub peak_to_valley: f64,
    /// Population standard deviation about the mean.
    pub rms: f64,
    pub valid_samples: usize,
}

fn statistics_of(values: impl Iterator<Item = f64> + Clone) -> Result<SurfaceStatistics> {
    let (mut count, mut sum) = (0usize, 0.0);
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for value in values.clone() {
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }
    if count == 0 {
        return Err(AnalysisError::EmptySurface);
    }
    let mean = sum / count as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    debug!(count, min, max, "Surface statistics");
    Ok(SurfaceStatistics {
        peak_to_valley: max - min,
        rms: variance.sqrt(),
        valid_samples: count,
    })
}

/// Statistics over the finite samples of `surface`.
pub fn surface_statistics(surface: &Grid<f64>) -> Result<SurfaceStatistics> {
    statistics_of(surface.data().iter().copied().filter(|v| v.is_finite()))
}

/// Statistics over the finite samples of `surface` inside `mask`.
pub fn surface_statistics_masked(surface: &Grid<f64>, mask: &Mask) -> Result<SurfaceStatistics> {
    surface.ensure_same_shape(mask)?;
    statistics_of(
        surface
            .data()
            .iter()
            .zip(mask.data())
            .filter(|&(value, &inside)| inside && value.is_finite())
            .map(|(&value, _)| value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_nan_samples() {
        let surface = Grid::new(2, 2, vec![0.0, 2.0, 4.0, f64::NAN]).unwrap();
        let stats = surface_statistics(&surface).unwrap();
        assert_eq!(stats.peak_to_valley, 4.0);
        assert!((stats.rms - 1.632_993_161_855_452).abs() < 1e-12);
        assert_eq!(stats.valid_samples, 3);
    }

    #[test]
    fn nan_outside_mask_changes_nothing() {
        let surface = Grid::from_fn(4, 4, |x, y| (x * y) as f64 * 0.1).unwrap();
        let mask = Mask::circular(4, 4, 1.5, 1.5, 1.6).unwrap();
        let poisoned = surface.zip_map(&mask, |&v, &inside| if inside { v } else { f64::NAN }).unwrap();

        let clean = surface_statistics_masked(&surface, &mask).unwrap();
        assert_eq!(surface_statistics_masked(&poisoned, &mask).unwrap(), clean);
        assert_eq!(surface_statistics(&poisoned).unwrap(), clean);
    }

    #[test]
    fn flat_surface_has_zero_spread() {
        let stats = surface_statistics(&Grid::filled(3, 3, 0.7).unwrap()).unwrap();
        assert_eq!(stats.peak_to_valley, 0.0);
        assert!(stats.rms.abs() < 1e-15);
    }

    #[test]
    fn empty_selection_fails() {
        let surface = Grid::filled(2, 2, 1.0).unwrap();
        let mask = Mask::filled(2, 2, false).unwrap();
        assert!(matches!(
            surface_statistics_masked(&surface, &mask),
            Err(AnalysisError::EmptySurface)
        ));
        let all_nan = Grid::filled(2, 1, f64::NAN).unwrap();
        assert!(matches!(surface_statistics(&all_nan), Err(AnalysisError::EmptySurface)));
    }

    #[test]
    fn mask_shape_must_match() {
        let surface = Grid::filled(2, 2, 1.0).unwrap();
        let mask = Mask::filled(1, 2, true).unwrap();
        assert!(matches!(
            surface_statistics_masked(&surface, &mask),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }
}
