//! Multiresolution pyramids for coarse-to-fine registration.
//!
//! Image pyramids are reduced in the spline domain: the full-size image is
//! converted to its septic dual, low-passed and decimated by two with the
//! `[1 4 6 4 1] / 16` kernel, and each reduced dual is converted back into
//! whatever representation the level stores (see [`PyramidShape`]).
//!
//! Mask pyramids accumulate `|weight|` over blocks of the finer level so a
//! coarse pixel reflects how much of its footprint is inside the region of
//! interest.
//!
//! Drop-odd policy:
//! - Level `k` is `(w_{k-1} / 2, h_{k-1} / 2)`.
//! - The full-size level is never stored; `pyramid_depth - 1` reduced levels
//!   make a complete pyramid.

mod image_pyramid;
mod mask;

pub use image_pyramid::{ImageLevel, ImagePyramid, ImagePyramidBuilder, PyramidShape};
pub use mask::{
    MaskPyramid, MaskPyramidBuilder, MaskReduction, PixelRegion, PolygonRegion, RectRegion,
    Region, half_mask,
};
