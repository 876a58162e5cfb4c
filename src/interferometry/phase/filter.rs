//! Gaussian pre-filter applied to interferograms before demodulation.

use rayon::prelude::*;

use crate::interferometry::common::Grid;

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Mirror index: `d c b a | a b c d | d c b a`.
#[inline]
fn reflect(index: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = index.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

fn convolve_line(line: &[f64], kernel: &[f64], out: &mut [f64]) {
    let radius = (kernel.len() / 2) as isize;
    for (i, o) in out.iter_mut().enumerate() {
        *o = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * line[reflect(i as isize + k as isize - radius, line.len())])
            .sum();
    }
}

/// Separable Gaussian blur; `sigma <= 0` returns a copy.
pub fn gaussian_filter(image: &Grid<f64>, sigma: f64) -> Grid<f64> {
    if !(sigma > 0.0) {
        return image.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let (width, height) = image.shape();

    let mut rows = vec![0.0; width * height];
    rows.par_chunks_mut(width)
        .zip(image.data().par_chunks(width))
        .for_each(|(out, line)| convolve_line(line, &kernel, out));

    let mut columns = vec![0.0; width * height];
    let column_results: Vec<Vec<f64>> = (0..width)
        .into_par_iter()
        .map(|x| {
            let line: Vec<f64> = (0..height).map(|y| rows[y * width + x]).collect();
            let mut out = vec![0.0; height];
            convolve_line(&line, &kernel, &mut out);
            out
        })
        .collect();
    for (x, column) in column_results.into_iter().enumerate() {
        for (y, value) in column.into_iter().enumerate() {
            columns[y * width + x] = value;
        }
    }

    // shape is unchanged, so the sample count always matches
    Grid::new(width, height, columns).unwrap_or_else(|_| image.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_mirrors_edges() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(9, 4), 1);
    }

    #[test]
    fn kernel_is_normalized() {
        let kernel = gaussian_kernel(2.0);
        assert_eq!(kernel.len(), 17);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_image_is_preserved() {
        let image = Grid::filled(7, 5, 42.0).unwrap();
        let filtered = gaussian_filter(&image, 3.0);
        assert!(filtered.data().iter().all(|v| (v - 42.0).abs() < 1e-9));
    }

    #[test]
    fn impulse_is_spread_and_conserved() {
        let image = Grid::from_fn(21, 21, |x, y| if (x, y) == (10, 10) { 1.0 } else { 0.0 }).unwrap();
        let filtered = gaussian_filter(&image, 1.5);
        let total: f64 = filtered.data().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(filtered[(10, 10)] < 1.0);
        assert!(filtered[(10, 10)] > filtered[(11, 10)]);
        assert!((filtered[(11, 10)] - filtered[(10, 11)]).abs() < 1e-12);
    }

    #[test]
    fn non_positive_sigma_is_identity() {
        let image = Grid::from_fn(3, 3, |x, y| (x * y) as f64).unwrap();
        assert_eq!(gaussian_filter(&image, 0.0), image);
    }
}
