//! Umbrella crate for the `regprep` workspace.
//!
//! Re-exports the foundation crates and adds the preparation pipeline that
//! builds source/target pyramids, their masks and landmark sets, and hands
//! them to a [`RegistrationSolver`].

mod display;
mod options;
mod prepare;
mod solver;

pub use rp_core::*;
pub use rp_landmark::*;
pub use rp_pyr::*;
pub use rp_spline as spline;

pub use display::{ImageDisplay, MemoryDisplay};
pub use options::PrepareOptions;
pub use prepare::{Overlay, Preparation, Prepared, clamp_output};
pub use solver::RegistrationSolver;
