//! Point spread and modulation transfer functions of a pupil wavefront.

use rustfft::num_complex::Complex64;
use tracing::{debug, instrument};

use crate::interferometry::common::{AnalysisError, Grid, Result};
use crate::interferometry::optics::fft::{fft2, fftshift, ifftshift};
use crate::interferometry::optics::resample::resample_bilinear;
use crate::interferometry::optics::wavefront::Wavefront;

pub const DEFAULT_FLOOR_DB: f64 = -30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsfConfig {
    /// The pupil is resampled to `grid_size / 2^zoom` samples per side.
    pub zoom: i32,
    /// FFT size `Ne`.
    pub grid_size: usize,
    pub floor_db: f64,
}

impl Default for PsfConfig {
    fn default() -> Self {
        Self {
            zoom: 2,
            grid_size: 512,
            floor_db: DEFAULT_FLOOR_DB,
        }
    }
}

impl PsfConfig {
    /// Side length of the resampled pupil.
    pub fn pupil_size(&self) -> Result<usize> {
        if self.grid_size == 0 {
            return Err(AnalysisError::InvalidGridSize(self.grid_size));
        }
        let size = (self.grid_size as f64 / 2f64.powi(self.zoom)).round();
        if !(size >= 1.0) {
            return Err(AnalysisError::InvalidZoom {
                zoom: self.zoom,
                grid_size: self.grid_size,
            });
        }
        let size = size as usize;
        if size > self.grid_size {
            return Err(AnalysisError::InvalidGridSize(self.grid_size));
        }
        Ok(size)
    }
}

#[derive(Debug, Clone)]
pub struct PsfResult {
    /// Centered PSF, peak 1.
    pub psf: Grid<f64>,
    /// Centered PSF in dB, clipped at the configured floor.
    pub psf_db: Grid<f64>,
    /// OTF in FFT layout (DC at `(0, 0)`), normalized to 1 at DC.
    pub otf: Grid<Complex64>,
    pub mtf: Grid<f64>,
    pub pupil_size: usize,
}

impl PsfResult {
    /// MTF with zero frequency moved to the grid center.
    pub fn mtf_centered(&self) -> Grid<f64> {
        fftshift(&self.mtf)
    }

    pub fn mtf_at_dc(&self) -> f64 {
        self.mtf[(0, 0)]
    }

    /// Pixel of the PSF maximum.
    pub fn peak_position(&self) -> (usize, usize) {
        let width = self.psf.width();
        let index = self
            .psf
            .data()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(index, _)| index);
        (index % width, index / width)
    }
}

pub struct PsfEvaluator {
    config: PsfConfig,
}

impl PsfEvaluator {
    pub fn new(config: PsfConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PsfConfig {
        &self.config
    }

    #[instrument(skip_all, fields(grid_size = self.config.grid_size, zoom = self.config.zoom))]
    pub fn evaluate(&self, wavefront: &Wavefront) -> Result<PsfResult> {
        let grid_size = self.config.grid_size;
        let pupil_size = self.config.pupil_size()?;

        let real = resample_bilinear(&wavefront.real(), pupil_size, pupil_size)?;
        let imaginary = resample_bilinear(&wavefront.imaginary(), pupil_size, pupil_size)?;

        let offset = (grid_size - pupil_size) / 2;
        let mut field = vec![Complex64::default(); grid_size * grid_size];
        for (y, (re_row, im_row)) in real.rows().zip(imaginary.rows()).enumerate() {
            let start = (y + offset) * grid_size + offset;
            for (target, (&re, &im)) in field[start..start + pupil_size]
                .iter_mut()
                .zip(re_row.iter().zip(im_row))
            {
                if re.is_finite() && im.is_finite() {
                    *target = Complex64::new(re, im);
                }
            }
        }

        fft2(&mut field, grid_size, grid_size);
        let intensity: Vec<f64> = field.iter().map(|c| c.norm_sqr()).collect();
        let peak = intensity.iter().copied().fold(0.0, f64::max);
        if !(peak > 0.0) {
            return Err(AnalysisError::DegenerateWavefront);
        }
        let psf = fftshift(&Grid::new(
            grid_size,
            grid_size,
            intensity.into_iter().map(|v| v / peak).collect(),
        )?);

        let floor_db = self.config.floor_db;
        let floor_linear = 10f64.powf(floor_db / 10.0);
        let psf_db = psf.map(|&v| (10.0 * v.max(floor_linear).log10()).max(floor_db));

        let mut otf: Vec<Complex64> = ifftshift(&psf)
            .into_data()
            .into_iter()
            .map(|v| Complex64::new(v, 0.0))
            .collect();
        fft2(&mut otf, grid_size, grid_size);
        let dc = otf[0];
        let otf = Grid::new(grid_size, grid_size, otf.into_iter().map(|c| c / dc).collect())?;
        let mtf = otf.map(|c| c.norm());

        debug!(pupil_size, peak, "PSF evaluated");
        Ok(PsfResult {
            psf,
            psf_db,
            otf,
            mtf,
            pupil_size,
        })
    }
}

/// Fraction of the total PSF energy within integer radius `r` (index) of
/// the grid center. The last entry covers the whole grid and equals 1.
pub fn encircled_energy(psf: &Grid<f64>) -> Vec<f64> {
    let (width, height) = psf.shape();
    let (cx, cy) = ((width / 2) as f64, (height / 2) as f64);
    let radius_of = |x: usize, y: usize| (x as f64 - cx).hypot(y as f64 - cy).ceil() as usize;
    let max_radius = radius_of(0, 0)
        .max(radius_of(width - 1, 0))
        .max(radius_of(0, height - 1))
        .max(radius_of(width - 1, height - 1));

    let mut rings = vec![0.0; max_radius + 1];
    for (y, row) in psf.rows().enumerate() {
        for (x, &value) in row.iter().enumerate() {
            if value.is_finite() {
                rings[radius_of(x, y)] += value;
            }
        }
    }
    let total: f64 = rings.iter().sum();
    let mut cumulative = 0.0;
    rings
        .into_iter()
        .map(|ring| {
            cumulative += ring;
            if total > 0.0 { cumulative / total } else { 0.0 }
        })
        .collect()
}
