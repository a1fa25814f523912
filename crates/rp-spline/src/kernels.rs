use std::sync::LazyLock;

/// Degree of a B-spline basis.
///
/// Cubic splines carry the image model; septic splines are the duals of
/// cubic ones (`2 * 3 + 1`) and carry the reduction pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplineDegree {
    Cubic,
    Septic,
}

/// `sqrt(3) - 2`, evaluated once since `sqrt` is not `const`.
static CUBIC_POLES: LazyLock<[f64; 1]> = LazyLock::new(|| [3.0f64.sqrt() - 2.0]);

pub const SEPTIC_POLES: [f64; 3] = [
    -0.535_280_430_796_438_2,
    -0.122_554_615_192_326_7,
    -0.009_148_694_809_608_277,
];

/// Half of the symmetric kernel sampling a cubic B-spline at the integers.
pub const CUBIC_TAPS: [f64; 2] = [2.0 / 3.0, 1.0 / 6.0];

/// Half of the symmetric kernel sampling a septic B-spline at the integers.
pub const SEPTIC_TAPS: [f64; 4] = [151.0 / 315.0, 397.0 / 1680.0, 1.0 / 42.0, 1.0 / 5040.0];

/// Central difference of the cubic model, `h[0]` is the unused center tap.
pub const GRADIENT_TAPS: [f64; 2] = [0.0, 1.0 / 2.0];

/// Half of the symmetric `[1 4 6 4 1] / 16` reduction kernel.
pub const REDUCE_TAPS: [f64; 3] = [6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

impl SplineDegree {
    pub fn order(self) -> usize {
        match self {
            Self::Cubic => 3,
            Self::Septic => 7,
        }
    }

    /// Poles of the recursive filter that inverts [`Self::taps`].
    pub fn poles(self) -> &'static [f64] {
        match self {
            Self::Cubic => CUBIC_POLES.as_slice(),
            Self::Septic => &SEPTIC_POLES,
        }
    }

    pub fn taps(self) -> &'static [f64] {
        match self {
            Self::Cubic => &CUBIC_TAPS,
            Self::Septic => &SEPTIC_TAPS,
        }
    }

    /// Overall gain of the recursive filter: `prod (1 - z)(1 - 1/z)`.
    pub fn gain(self) -> f64 {
        self.poles()
            .iter()
            .map(|&z| (1.0 - z) * (1.0 - 1.0 / z))
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::SplineDegree;

    #[test]
    fn cubic_pole_is_sqrt3_minus_2() {
        assert_eq!(SplineDegree::Cubic.poles(), &[3.0f64.sqrt() - 2.0]);
    }

    #[test]
    fn taps_sum_to_unity() {
        for degree in [SplineDegree::Cubic, SplineDegree::Septic] {
            let h = degree.taps();
            let sum = h[0] + 2.0 * h[1..].iter().sum::<f64>();
            assert!((sum - 1.0).abs() < 1e-12, "{degree:?}");
        }
    }

    #[test]
    fn gain_inverts_tap_sum() {
        assert!((SplineDegree::Cubic.gain() - 6.0).abs() < 1e-12);
        assert!((SplineDegree::Septic.gain() - 5040.0).abs() < 1e-6);
    }
}
