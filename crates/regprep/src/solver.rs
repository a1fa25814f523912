use rp_core::{Error, Image};

use crate::Prepared;

/// Optimizer that consumes prepared pyramids and landmarks.
///
/// Solvers pop levels coarsest first and report refined landmarks by
/// updating the sets in place.
pub trait RegistrationSolver {
    /// Refines the landmarks of `prepared`.
    fn register(&mut self, prepared: &mut Prepared) -> Result<(), Error>;

    /// Warps the source plane onto the target grid using the landmarks as
    /// they stand.
    fn batch_final_transform(&mut self, prepared: &mut Prepared) -> Result<Image<f32>, Error>;
}
