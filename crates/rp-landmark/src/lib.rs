//! Landmark points that seed a registration.
//!
//! A [`LandmarkSet`] holds the ordered points of one image for a given
//! transformation model. Sets are persisted as columns of a
//! [`LandmarkTable`] in image coordinates and kept in interval-local
//! coordinates in memory.

pub mod landmarks;
pub mod table;

pub use landmarks::{
    CROSS_HALFSIZE, GOLDEN_RATIO, LandmarkSet, OverlayPoint, default_layout,
};
pub use table::{LandmarkTable, SOURCE_X, SOURCE_Y, TARGET_X, TARGET_Y};
