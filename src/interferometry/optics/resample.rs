use crate::interferometry::common::{Grid, Result};

/// Source coordinate of output sample `i` when corners stay aligned.
#[inline]
fn source_position(i: usize, input_len: usize, output_len: usize) -> f64 {
    if output_len < 2 {
        return 0.0;
    }
    i as f64 * (input_len - 1) as f64 / (output_len - 1) as f64
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    if t == 0.0 { a } else { a + (b - a) * t }
}

/// Bilinear resampling to `width × height`, first and last samples aligned
/// with the input's. NaN propagates into every output sample it touches.
pub fn resample_bilinear(input: &Grid<f64>, width: usize, height: usize) -> Result<Grid<f64>> {
    let (in_width, in_height) = input.shape();
    Grid::from_fn(width, height, |x, y| {
        let sx = source_position(x, in_width, width);
        let sy = source_position(y, in_height, height);
        let (x0, y0) = (sx.floor() as usize, sy.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(in_width - 1), (y0 + 1).min(in_height - 1));
        let (tx, ty) = (sx - x0 as f64, sy - y0 as f64);

        let top = lerp(input[(x0, y0)], input[(x1, y0)], tx);
        let bottom = lerp(input[(x0, y1)], input[(x1, y1)], tx);
        lerp(top, bottom, ty)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_size_is_identity() {
        let input = Grid::from_fn(3, 2, |x, y| (x + 10 * y) as f64).unwrap();
        assert_eq!(resample_bilinear(&input, 3, 2).unwrap(), input);
    }

    #[test]
    fn halving_keeps_corners() {
        let input = Grid::from_fn(5, 5, |x, y| (x + y) as f64).unwrap();
        let output = resample_bilinear(&input, 3, 3).unwrap();
        assert_eq!(output[(0, 0)], 0.0);
        assert_eq!(output[(2, 2)], 8.0);
        assert_eq!(output[(1, 1)], 4.0);
    }

    #[test]
    fn upsampling_interpolates_linearly() {
        let input = Grid::new(2, 1, vec![0.0, 3.0]).unwrap();
        let output = resample_bilinear(&input, 4, 1).unwrap();
        let expected = [0.0, 1.0, 2.0, 3.0];
        for (value, want) in output.data().iter().zip(expected) {
            assert!((value - want).abs() < 1e-12);
        }
    }

    #[test]
    fn nan_stays_local_when_aligned() {
        let input = Grid::new(3, 1, vec![1.0, f64::NAN, 1.0]).unwrap();
        let output = resample_bilinear(&input, 3, 1).unwrap();
        assert_eq!(output[(0, 0)], 1.0);
        assert!(output[(1, 0)].is_nan());
    }
}
