//! Foundational primitives for registration preprocessing.
//!
//! ## Rasters
//! [`Image`] is contiguous and row-major: pixel `(x, y)` lives at
//! `x + width * y`. Host buffers with padding are wrapped in an
//! [`ImageView`] (element stride, not byte stride) and packed with
//! [`ImageView::to_image`] before processing.
//!
//! ## Border Modes
//! Spline filtering extends lines by half-sample mirroring: the edge sample
//! is repeated, so `c[-1] = c[0]` and `c[n] = c[n-1]`.
//!
//! ## Run Control
//! Long builds poll a [`CancelToken`] between pyramid levels and report
//! through an optional [`Progress`] callback.

mod border;
mod cancel;
mod error;
mod geom;
mod image;
mod interval;
mod progress;
mod transform;

pub use border::{BorderMode, map_index};
pub use cancel::CancelToken;
pub use error::Error;
pub use geom::{PixelRect, Point2d, SelectionRect, Vec2d};
pub use image::{Image, ImageView, to_f32, to_f32_u16};
pub use interval::{Interval, MIN_SIZE, Role, pyramid_depth};
pub use progress::{Progress, ProgressFn};
pub use transform::TransformKind;
