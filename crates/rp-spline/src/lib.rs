//! B-spline signal processing with half-sample mirror boundaries.
//!
//! Lines are `f64`; rasters are `f32` and filtered separably, rows first.
//!
//! - [`samples_to_coefficients`] inverts the sampling filter of a cubic or
//!   septic B-spline with a cascade of causal/anti-causal first-order
//!   recursions, one per pole.
//! - [`coefficients_to_samples`] evaluates a spline at the integers.
//! - [`coefficient_to_gradient`] evaluates the slope of a cubic spline.
//! - [`reduce_dual`] is the half-band low-pass used between pyramid levels;
//!   it operates on septic duals of cubic splines.
//!
//! Short lines (one to five samples) use closed-form edge expressions that
//! agree with mirror extension at every length.

pub mod fir;
pub mod kernels;
pub mod plane;
pub mod recursive;

pub use fir::{
    antisymmetric_fir, coefficient_to_gradient, coefficients_to_samples, reduce_dual,
    symmetric_fir,
};
pub use kernels::SplineDegree;
pub use plane::{
    Gradients, cardinal_to_dual_2d, coefficient_to_xy_gradient_2d, coefficients_to_samples_2d,
    dual_to_cardinal_2d, image_to_xy_gradient_2d, reduce_dual_2d, samples_to_coefficients_2d,
};
pub use recursive::{
    initial_anticausal_coefficient, initial_causal_coefficient, samples_to_coefficients,
};
