use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Grid shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Insufficient phase-shift frames: got {0}, need 5")]
    InsufficientFrames(usize),

    #[error("Too many phase-shift frames: got {0}, expected 5")]
    TooManyFrames(usize),

    #[error("Invalid Fourier grid size: {0}")]
    InvalidGridSize(usize),

    #[error("Invalid zoom factor {zoom} for grid size {grid_size}")]
    InvalidZoom { zoom: i32, grid_size: usize },

    #[error("No valid samples left in surface after masking")]
    EmptySurface,

    #[error("Wavefront carries no energy")]
    DegenerateWavefront,

    #[error("Zernike fit failed: {0}")]
    FitError(String),

    #[error("Unknown aberration: {0}")]
    UnknownAberration(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Acquisition stopped before completion")]
    AcquisitionStopped,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
