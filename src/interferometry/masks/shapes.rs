//! Aperture mask builders and geometry helpers.

use crate::interferometry::common::{Grid, Mask, Region, Result};

/// Position of sample `i` on `linspace(-1, 1, n)`.
#[inline]
pub(crate) fn normalized_coordinate(i: usize, n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    -1.0 + 2.0 * i as f64 / (n - 1) as f64
}

impl Mask {
    /// Disk of `radius` pixels centered on `(cx, cy)` (pixel units).
    pub fn circular(width: usize, height: usize, cx: f64, cy: f64, radius: f64) -> Result<Self> {
        Grid::from_fn(width, height, |x, y| {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            dx * dx + dy * dy <= radius * radius
        })
    }

    /// Ellipse in normalized coordinates: `x, y ∈ [-1, 1]` across the grid.
    pub fn elliptic(width: usize, height: usize, cx: f64, cy: f64, a: f64, b: f64) -> Result<Self> {
        Grid::from_fn(width, height, |x, y| {
            let u = (normalized_coordinate(x, width) - cx) / a;
            let v = (normalized_coordinate(y, height) - cy) / b;
            u * u + v * v < 1.0
        })
    }

    /// Axis-aligned rectangle; the part of `region` outside the grid is ignored.
    pub fn rectangular(width: usize, height: usize, region: &Region) -> Result<Self> {
        Grid::from_fn(width, height, |x, y| {
            (region.x..region.x + region.width).contains(&x)
                && (region.y..region.y + region.height).contains(&y)
        })
    }

    /// Thresholds a numeric mask (e.g. a stored 0/1 image) at 0.5.
    pub fn from_levels(levels: &Grid<f64>) -> Self {
        levels.map(|&v| v > 0.5)
    }

    pub fn inverted(&self) -> Self {
        self.map(|&inside| !inside)
    }

    pub fn count_inside(&self) -> usize {
        self.data().iter().filter(|&&inside| inside).count()
    }

    /// Smallest window containing every `true` pixel, `None` for an empty mask.
    pub fn bounding_box(&self) -> Option<Region> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (y, row) in self.rows().enumerate() {
            for (x, _) in row.iter().enumerate().filter(|(_, inside)| **inside) {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds.map(|(x0, y0, x1, y1)| Region {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_mask_is_symmetric() {
        let mask = Mask::circular(9, 9, 4.0, 4.0, 3.0).unwrap();
        assert!(mask[(4, 4)]);
        assert!(mask[(1, 4)] && mask[(7, 4)] && mask[(4, 1)] && mask[(4, 7)]);
        assert!(!mask[(0, 0)]);
        assert_eq!(mask.count_inside(), 29);
    }

    #[test]
    fn elliptic_mask_uses_normalized_axes() {
        let mask = Mask::elliptic(21, 11, 0.0, 0.0, 0.5, 1.0).unwrap();
        assert!(mask[(10, 5)]);
        assert!(!mask[(0, 5)]);
        assert!(!mask[(15, 5)]);
        assert!(mask[(14, 5)]);
    }

    #[test]
    fn bounding_box_is_inclusive() {
        let region = Region { x: 2, y: 1, width: 3, height: 2 };
        let mask = Mask::rectangular(8, 6, &region).unwrap();
        assert_eq!(mask.bounding_box(), Some(region));
        assert_eq!(mask.count_inside(), 6);
        assert_eq!(mask.inverted().count_inside(), 42);
    }

    #[test]
    fn empty_mask_has_no_bounding_box() {
        let mask = Mask::filled(4, 4, false).unwrap();
        assert_eq!(mask.bounding_box(), None);
    }

    #[test]
    fn thresholds_levels() {
        let levels = Grid::new(3, 1, vec![0.0, 0.6, 1.0]).unwrap();
        assert_eq!(Mask::from_levels(&levels).data(), &[false, true, true]);
    }
}
