//! Fringe Zernike decomposition of a measured surface.
//!
//! Terms follow the Fringe (University of Arizona) ordering, indexed from 0,
//! without normalization: `Z = R_n^|m|(ρ)·cos(mθ)` for `m ≥ 0` and
//! `R_n^|m|(ρ)·sin(|m|θ)` for `m < 0`. The unit disk is inscribed in the
//! sampled grid, `x, y ∈ [-1, 1]` edge to edge.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

use crate::interferometry::common::{AnalysisError, Grid, Result};
use crate::interferometry::masks::normalized_coordinate;

pub const TERM_COUNT: usize = 37;

/// Singular values below this are treated as zero when solving the fit.
const SINGULAR_EPSILON: f64 = 1e-12;

/// `(n, m)` of every Fringe term.
const FRINGE_TERMS: [(u32, i32); TERM_COUNT] = [
    (0, 0),
    (1, 1),
    (1, -1),
    (2, 0),
    (2, 2),
    (2, -2),
    (3, 1),
    (3, -1),
    (4, 0),
    (3, 3),
    (3, -3),
    (4, 2),
    (4, -2),
    (5, 1),
    (5, -1),
    (6, 0),
    (4, 4),
    (4, -4),
    (5, 3),
    (5, -3),
    (6, 2),
    (6, -2),
    (7, 1),
    (7, -1),
    (8, 0),
    (5, 5),
    (5, -5),
    (6, 4),
    (6, -4),
    (7, 3),
    (7, -3),
    (8, 2),
    (8, -2),
    (9, 1),
    (9, -1),
    (10, 0),
    (12, 0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZernikeTerm {
    pub n: u32,
    pub m: i32,
}

fn factorial(k: u32) -> f64 {
    (1..=k).map(f64::from).product()
}

impl ZernikeTerm {
    pub fn fringe(index: usize) -> Option<Self> {
        FRINGE_TERMS.get(index).map(|&(n, m)| Self { n, m })
    }

    pub fn radial(&self, rho: f64) -> f64 {
        let (n, m) = (self.n, self.m.unsigned_abs());
        (0..=(n - m) / 2)
            .map(|k| {
                let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                sign * factorial(n - k)
                    / (factorial(k) * factorial((n + m) / 2 - k) * factorial((n - m) / 2 - k))
                    * rho.powi((n - 2 * k) as i32)
            })
            .sum()
    }

    pub fn evaluate(&self, rho: f64, theta: f64) -> f64 {
        let angular = match self.m {
            0 => 1.0,
            m if m > 0 => (f64::from(m) * theta).cos(),
            m => (f64::from(-m) * theta).sin(),
        };
        self.radial(rho) * angular
    }
}

fn basis_at(x: usize, y: usize, width: usize, height: usize) -> DVector<f64> {
    let u = normalized_coordinate(x, width);
    let v = normalized_coordinate(y, height);
    let (rho, theta) = (u.hypot(v), v.atan2(u));
    DVector::from_iterator(
        TERM_COUNT,
        FRINGE_TERMS
            .iter()
            .map(|&(n, m)| ZernikeTerm { n, m }.evaluate(rho, theta)),
    )
}

/// Named aberration families and the Fringe terms they cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aberration {
    Piston,
    Tilt,
    Defocus,
    Astig3,
    Coma3,
    Sphere3,
    Trefoil5,
    Astig5,
    Coma5,
    Sphere5,
    Quadra7,
    Trefoil7,
    Astig7,
    Coma7,
    Sphere7,
    Penta9,
    Quadra9,
    Trefoil9,
    Astig9,
    Coma9,
    Sphere9,
    Sphere11,
}

impl Aberration {
    pub const ALL: [Aberration; 22] = [
        Aberration::Piston,
        Aberration::Tilt,
        Aberration::Defocus,
        Aberration::Astig3,
        Aberration::Coma3,
        Aberration::Sphere3,
        Aberration::Trefoil5,
        Aberration::Astig5,
        Aberration::Coma5,
        Aberration::Sphere5,
        Aberration::Quadra7,
        Aberration::Trefoil7,
        Aberration::Astig7,
        Aberration::Coma7,
        Aberration::Sphere7,
        Aberration::Penta9,
        Aberration::Quadra9,
        Aberration::Trefoil9,
        Aberration::Astig9,
        Aberration::Coma9,
        Aberration::Sphere9,
        Aberration::Sphere11,
    ];

    pub fn terms(self) -> &'static [usize] {
        match self {
            Aberration::Piston => &[0],
            Aberration::Tilt => &[1, 2],
            Aberration::Defocus => &[3],
            Aberration::Astig3 => &[4, 5],
            Aberration::Coma3 => &[6, 7],
            Aberration::Sphere3 => &[8],
            Aberration::Trefoil5 => &[9, 10],
            Aberration::Astig5 => &[11, 12],
            Aberration::Coma5 => &[13, 14],
            Aberration::Sphere5 => &[15],
            Aberration::Quadra7 => &[16, 17],
            Aberration::Trefoil7 => &[18, 19],
            Aberration::Astig7 => &[20, 21],
            Aberration::Coma7 => &[22, 23],
            Aberration::Sphere7 => &[24],
            Aberration::Penta9 => &[25, 26],
            Aberration::Quadra9 => &[27, 28],
            Aberration::Trefoil9 => &[29, 30],
            Aberration::Astig9 => &[31, 32],
            Aberration::Coma9 => &[33, 34],
            Aberration::Sphere9 => &[35],
            Aberration::Sphere11 => &[36],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Aberration::Piston => "piston",
            Aberration::Tilt => "tilt",
            Aberration::Defocus => "defocus",
            Aberration::Astig3 => "astig3",
            Aberration::Coma3 => "coma3",
            Aberration::Sphere3 => "sphere3",
            Aberration::Trefoil5 => "trefoil5",
            Aberration::Astig5 => "astig5",
            Aberration::Coma5 => "coma5",
            Aberration::Sphere5 => "sphere5",
            Aberration::Quadra7 => "quadra7",
            Aberration::Trefoil7 => "trefoil7",
            Aberration::Astig7 => "astig7",
            Aberration::Coma7 => "coma7",
            Aberration::Sphere7 => "sphere7",
            Aberration::Penta9 => "penta9",
            Aberration::Quadra9 => "quadra9",
            Aberration::Trefoil9 => "trefoil9",
            Aberration::Astig9 => "astig9",
            Aberration::Coma9 => "coma9",
            Aberration::Sphere9 => "sphere9",
            Aberration::Sphere11 => "sphere11",
        }
    }
}

impl fmt::Display for Aberration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aberration {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Aberration::ALL
            .into_iter()
            .find(|aberration| aberration.name() == wanted)
            .ok_or_else(|| AnalysisError::UnknownAberration(s.to_string()))
    }
}

/// Third-order Seidel terms derived from the Fringe coefficients.
/// Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeidelCoefficients {
    pub tilt_magnitude: f64,
    pub tilt_angle: f64,
    pub defocus: f64,
    pub astigmatism_magnitude: f64,
    pub astigmatism_angle: f64,
    pub coma_magnitude: f64,
    pub coma_angle: f64,
    pub spherical: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZernikeFit {
    coefficients: Vec<f64>,
    width: usize,
    height: usize,
}

impl ZernikeFit {
    /// Wraps known coefficients; missing trailing terms are zero.
    pub fn from_coefficients(mut coefficients: Vec<f64>, width: usize, height: usize) -> Self {
        coefficients.resize(TERM_COUNT, 0.0);
        Self {
            coefficients,
            width,
            height,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn coefficient(&self, index: usize) -> Option<f64> {
        self.coefficients.get(index).copied()
    }

    /// Coefficients scaled to another unit, e.g. the wavelength in µm.
    pub fn scaled(&self, factor: f64) -> Vec<f64> {
        self.coefficients.iter().map(|c| c * factor).collect()
    }

    /// Sum of the given terms over the fitted grid.
    pub fn synthesize(&self, terms: &[usize]) -> Result<Grid<f64>> {
        let (width, height) = (self.width, self.height);
        Grid::from_fn(width, height, |x, y| {
            let basis = basis_at(x, y, width, height);
            terms
                .iter()
                .filter(|&&term| term < TERM_COUNT)
                .map(|&term| self.coefficients[term] * basis[term])
                .sum()
        })
    }

    pub fn correction(&self, aberrations: &[Aberration]) -> Result<Grid<f64>> {
        let terms: Vec<usize> = aberrations
            .iter()
            .flat_map(|aberration| aberration.terms().iter().copied())
            .collect();
        self.synthesize(&terms)
    }

    /// Removes `aberrations` from `surface`. Returns `(correction, corrected)`.
    pub fn correct(&self, surface: &Grid<f64>, aberrations: &[Aberration]) -> Result<(Grid<f64>, Grid<f64>)> {
        let correction = self.correction(aberrations)?;
        let corrected = surface.zip_map(&correction, |&s, &c| s - c)?;
        debug!(?aberrations, "Surface corrected");
        Ok((correction, corrected))
    }

    pub fn seidel(&self) -> SeidelCoefficients {
        let c = &self.coefficients;
        SeidelCoefficients {
            tilt_magnitude: c[1].hypot(c[2]),
            tilt_angle: c[2].atan2(c[1]).to_degrees(),
            defocus: 2.0 * c[3],
            astigmatism_magnitude: 2.0 * c[4].hypot(c[5]),
            astigmatism_angle: (0.5 * c[5].atan2(c[4])).to_degrees(),
            coma_magnitude: 3.0 * c[6].hypot(c[7]),
            coma_angle: c[7].atan2(c[6]).to_degrees(),
            spherical: 6.0 * c[8],
        }
    }
}

/// Joint least-squares fit of all Fringe terms to the finite samples.
pub fn fit_zernike(surface: &Grid<f64>) -> Result<ZernikeFit> {
    let (width, height) = surface.shape();
    let empty = || {
        (
            DMatrix::<f64>::zeros(TERM_COUNT, TERM_COUNT),
            DVector::<f64>::zeros(TERM_COUNT),
            0usize,
        )
    };

    let (normal, rhs, samples) = surface
        .data()
        .par_chunks(width)
        .enumerate()
        .fold(empty, |(mut normal, mut rhs, mut samples), (y, row)| {
            for (x, &value) in row.iter().enumerate().filter(|(_, v)| v.is_finite()) {
                let basis = basis_at(x, y, width, height);
                normal.ger(1.0, &basis, &basis, 1.0);
                rhs.axpy(value, &basis, 1.0);
                samples += 1;
            }
            (normal, rhs, samples)
        })
        .reduce(empty, |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2));

    if samples == 0 {
        return Err(AnalysisError::EmptySurface);
    }
    let solution = normal
        .svd(true, true)
        .solve(&rhs, SINGULAR_EPSILON)
        .map_err(|e| AnalysisError::FitError(e.to_string()))?;

    debug!(samples, "Zernike coefficients fitted");
    Ok(ZernikeFit {
        coefficients: solution.iter().copied().collect(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interferometry::common::Mask;

    fn disk_surface(size: usize, f: impl Fn(f64, f64) -> f64) -> Grid<f64> {
        let center = (size - 1) as f64 / 2.0;
        let mask = Mask::circular(size, size, center, center, center).unwrap();
        Grid::from_fn(size, size, |x, y| {
            if mask[(x, y)] {
                let u = normalized_coordinate(x, size);
                let v = normalized_coordinate(y, size);
                f(u.hypot(v), v.atan2(u))
            } else {
                f64::NAN
            }
        })
        .unwrap()
    }

    #[test]
    fn aberration_groups_partition_terms() {
        let mut seen: Vec<usize> = Aberration::ALL
            .iter()
            .flat_map(|aberration| aberration.terms().iter().copied())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..TERM_COUNT).collect::<Vec<_>>());
    }

    #[test]
    fn radial_polynomials_reach_one_at_edge() {
        for index in 0..TERM_COUNT {
            let term = ZernikeTerm::fringe(index).unwrap();
            assert!((term.radial(1.0) - 1.0).abs() < 1e-9, "term {index}");
        }
        let defocus = ZernikeTerm::fringe(3).unwrap();
        assert!((defocus.radial(0.5) + 0.5).abs() < 1e-12);
        assert!(ZernikeTerm::fringe(TERM_COUNT).is_none());
    }

    #[test]
    fn fit_recovers_known_coefficients() {
        let defocus = ZernikeTerm::fringe(3).unwrap();
        let coma = ZernikeTerm::fringe(6).unwrap();
        let surface = disk_surface(41, |rho, theta| {
            0.3 + 0.5 * defocus.evaluate(rho, theta) - 0.2 * coma.evaluate(rho, theta)
        });
        let fit = fit_zernike(&surface).unwrap();

        assert!((fit.coefficient(0).unwrap() - 0.3).abs() < 1e-6);
        assert!((fit.coefficient(3).unwrap() - 0.5).abs() < 1e-6);
        assert!((fit.coefficient(6).unwrap() + 0.2).abs() < 1e-6);
        for index in [1, 2, 4, 5, 7, 8, 15, 36] {
            assert!(fit.coefficient(index).unwrap().abs() < 1e-6, "term {index}");
        }
    }

    #[test]
    fn correction_removes_selected_terms() {
        let defocus = ZernikeTerm::fringe(3).unwrap();
        let tilt = ZernikeTerm::fringe(1).unwrap();
        let surface = disk_surface(31, |rho, theta| 0.4 * defocus.evaluate(rho, theta) + 0.1 * tilt.evaluate(rho, theta));
        let fit = fit_zernike(&surface).unwrap();

        let (correction, corrected) = fit.correct(&surface, &[Aberration::Defocus]).unwrap();
        assert_eq!(correction.shape(), surface.shape());
        let (x, y) = (20, 15);
        let expected = 0.1 * normalized_coordinate(x, 31);
        assert!((corrected[(x, y)] - expected).abs() < 1e-6);
        assert!(corrected[(0, 0)].is_nan());
    }

    #[test]
    fn seidel_conversion() {
        let mut coefficients = vec![0.0; 9];
        coefficients[1] = 3.0;
        coefficients[2] = 4.0;
        coefficients[3] = 0.25;
        coefficients[4] = 0.0;
        coefficients[5] = 1.0;
        coefficients[6] = 1.0;
        coefficients[8] = -0.5;
        let seidel = ZernikeFit::from_coefficients(coefficients, 8, 8).seidel();

        assert!((seidel.tilt_magnitude - 5.0).abs() < 1e-12);
        assert!((seidel.tilt_angle - 4f64.atan2(3.0).to_degrees()).abs() < 1e-12);
        assert_eq!(seidel.defocus, 0.5);
        assert!((seidel.astigmatism_magnitude - 2.0).abs() < 1e-12);
        assert!((seidel.astigmatism_angle - 45.0).abs() < 1e-12);
        assert!((seidel.coma_magnitude - 3.0).abs() < 1e-12);
        assert_eq!(seidel.coma_angle, 0.0);
        assert_eq!(seidel.spherical, -3.0);
    }

    #[test]
    fn parses_aberration_names() {
        assert_eq!("Coma3".parse::<Aberration>().unwrap(), Aberration::Coma3);
        assert_eq!(Aberration::Sphere11.to_string(), "sphere11");
        assert!(matches!(
            "wobble".parse::<Aberration>(),
            Err(AnalysisError::UnknownAberration(_))
        ));
    }

    #[test]
    fn all_nan_surface_is_empty() {
        let surface = Grid::filled(4, 4, f64::NAN).unwrap();
        assert!(matches!(fit_zernike(&surface), Err(AnalysisError::EmptySurface)));
    }
}
