//! Row-major 2-D sample grid

use std::ops::Index;

use crate::interferometry::common::error::{AnalysisError, Result};

/// Dense row-major 2-D grid of samples.
///
/// The sample count always equals `width * height`; both dimensions are
/// non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

/// Intensity readout of one camera frame.
pub type IntensityImage = Grid<f64>;

/// Wrapped phase in radians, NaN where undefined.
pub type PhaseMap = Grid<f64>;

/// Valid-aperture mask, `true` inside the pupil.
pub type Mask = Grid<bool>;

/// Rectangular window inside a grid, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl<T> Grid<T> {
    pub fn new(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(AnalysisError::InvalidDimensions(width, height));
        }
        Ok(Self { width, height, data })
    }

    /// Builds a grid by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(AnalysisError::InvalidDimensions(width, height));
        }
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            self.data.get(y * self.width + x)
        } else {
            None
        }
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'_, T> {
        self.data.chunks_exact(self.width)
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Fails with `ShapeMismatch` unless `other` has the same shape.
    pub fn ensure_same_shape<U>(&self, other: &Grid<U>) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(AnalysisError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    pub fn zip_map<U, V>(&self, other: &Grid<U>, mut f: impl FnMut(&T, &U) -> V) -> Result<Grid<V>> {
        self.ensure_same_shape(other)?;
        Ok(Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().zip(&other.data).map(|(a, b)| f(a, b)).collect(),
        })
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Result<Self> {
        Self::new(width, height, vec![value; width * height])
    }

    /// Copies the window `region` out of the grid.
    pub fn crop(&self, region: &Region) -> Result<Self> {
        let fits = region.width > 0
            && region.height > 0
            && region.x + region.width <= self.width
            && region.y + region.height <= self.height;
        if !fits {
            return Err(AnalysisError::InvalidDimensions(region.width, region.height));
        }
        let data = self
            .rows()
            .skip(region.y)
            .take(region.height)
            .flat_map(|row| row[region.x..region.x + region.width].iter().cloned())
            .collect();
        Ok(Self {
            width: region.width,
            height: region.height,
            data,
        })
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    /// Indexes by `(x, y)`.
    fn index(&self, (x, y): (usize, usize)) -> &T {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        &self.data[y * self.width + x]
    }
}
