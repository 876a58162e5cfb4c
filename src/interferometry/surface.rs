mod statistics;
mod zernike;

pub use statistics::{SurfaceStatistics, surface_statistics, surface_statistics_masked};
pub use zernike::{
    Aberration, SeidelCoefficients, TERM_COUNT, ZernikeFit, ZernikeTerm, fit_zernike,
};
