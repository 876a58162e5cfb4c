//! Map export
//!
//! Analysis results are written as grayscale TIFF through the [`MapWriter`]
//! trait so the pipeline can be tested against in-memory writers.

mod tiff_map_writer;
pub mod types;
mod writer;

pub use tiff_map_writer::TiffMapWriter;
pub use types::TiffCompression;
pub use writer::MapWriter;
