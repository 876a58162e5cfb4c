//! 2-D FFT and quadrant shifts on row-major grids.

use rayon::prelude::*;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;

use crate::interferometry::common::Grid;

fn transpose(data: &[Complex64], width: usize, height: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::default(); data.len()];
    for (y, row) in data.chunks_exact(width).enumerate() {
        for (x, &value) in row.iter().enumerate() {
            out[x * height + y] = value;
        }
    }
    out
}

/// In-place forward 2-D FFT of a `width × height` row-major buffer.
pub fn fft2(data: &mut [Complex64], width: usize, height: usize) {
    assert_eq!(data.len(), width * height, "buffer does not match {width}x{height}");
    let mut planner = FftPlanner::new();

    let row_fft = planner.plan_fft_forward(width);
    data.par_chunks_exact_mut(width)
        .for_each(|row| row_fft.process(row));

    let column_fft = planner.plan_fft_forward(height);
    let mut columns = transpose(data, width, height);
    columns
        .par_chunks_exact_mut(height)
        .for_each(|column| column_fft.process(column));
    data.copy_from_slice(&transpose(&columns, height, width));
}

fn roll<T: Clone>(grid: &Grid<T>, shift_x: usize, shift_y: usize) -> Grid<T> {
    let (width, height) = grid.shape();
    let source = grid.data();
    let mut data = source.to_vec();
    for y in 0..height {
        for x in 0..width {
            data[((y + shift_y) % height) * width + (x + shift_x) % width] = source[y * width + x].clone();
        }
    }
    Grid::new(width, height, data).unwrap_or_else(|_| grid.clone())
}

/// Moves the zero-frequency sample to `(width / 2, height / 2)`.
pub fn fftshift<T: Clone>(grid: &Grid<T>) -> Grid<T> {
    roll(grid, grid.width() / 2, grid.height() / 2)
}

/// Inverse of [`fftshift`], also for odd sizes.
pub fn ifftshift<T: Clone>(grid: &Grid<T>) -> Grid<T> {
    let (width, height) = grid.shape();
    roll(grid, width - width / 2, height - height / 2)
}
