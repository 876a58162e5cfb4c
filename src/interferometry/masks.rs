//! Aperture mask module
//!
//! Mask builders, bounding boxes and the combination of several user masks
//! into one valid-aperture mask.

mod mask_set;
mod shapes;

pub use mask_set::{MaskEntry, MaskSet, MaskShape};
pub(crate) use shapes::normalized_coordinate;
