use crate::kernels::SplineDegree;

/// Replaces samples by the B-spline coefficients that interpolate them.
///
/// The line is extended by half-sample mirroring. With `tolerance > 0` the
/// causal initialization truncates its geometric sum once the pole's powers
/// drop below `tolerance`; `tolerance == 0` sums the whole line exactly.
/// Lines shorter than two samples are left unchanged.
pub fn samples_to_coefficients(c: &mut [f64], degree: SplineDegree, tolerance: f64) {
    if c.len() < 2 {
        return;
    }

    let gain = degree.gain();
    for v in c.iter_mut() {
        *v *= gain;
    }

    let n = c.len();
    for &z in degree.poles() {
        c[0] = initial_causal_coefficient(c, z, tolerance);
        for i in 1..n {
            c[i] += z * c[i - 1];
        }
        c[n - 1] = initial_anticausal_coefficient(c, z);
        for i in (0..n - 1).rev() {
            c[i] = z * (c[i + 1] - c[i]);
        }
    }
}

/// Seed of the causal pass for a mirror-extended line.
pub fn initial_causal_coefficient(c: &[f64], z: f64, tolerance: f64) -> f64 {
    let n = c.len();
    let mut z1 = z;
    let mut zn = z.powi(n as i32);
    let mut sum = (1.0 + z) * (c[0] + zn * c[n - 1]);

    let mut horizon = n;
    if tolerance > 0.0 {
        let reach = 2 + (tolerance.ln() / z.abs().ln()) as usize;
        horizon = reach.min(n);
    }

    zn *= zn;
    for &v in c.iter().take(horizon.saturating_sub(1)).skip(1) {
        z1 *= z;
        zn /= z;
        sum += (z1 + zn) * v;
    }
    sum / (1.0 - z.powi(2 * n as i32))
}

/// Seed of the anti-causal pass, applied after the causal pass.
pub fn initial_anticausal_coefficient(c: &[f64], z: f64) -> f64 {
    z * c[c.len() - 1] / (z - 1.0)
}

#[cfg(test)]
mod tests {
    use super::{initial_causal_coefficient, samples_to_coefficients};
    use crate::SplineDegree;
    use crate::fir::coefficients_to_samples;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| ((i * 37) % 23) as f64 * 3.5 - 20.0).collect()
    }

    #[test]
    fn cubic_round_trip_reproduces_samples() {
        for n in [2usize, 3, 4, 5, 6, 7, 10, 17, 64] {
            let samples = ramp(n);
            let mut c = samples.clone();
            samples_to_coefficients(&mut c, SplineDegree::Cubic, 0.0);
            coefficients_to_samples(&mut c, SplineDegree::Cubic);
            for (a, b) in c.iter().zip(&samples) {
                assert!((a - b).abs() < 1e-9, "n = {n}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn septic_round_trip_reproduces_samples() {
        for n in [2usize, 3, 4, 5, 6, 7, 11, 33] {
            let samples = ramp(n);
            let mut c = samples.clone();
            samples_to_coefficients(&mut c, SplineDegree::Septic, 0.0);
            coefficients_to_samples(&mut c, SplineDegree::Septic);
            for (a, b) in c.iter().zip(&samples) {
                assert!((a - b).abs() < 1e-8, "n = {n}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn single_sample_is_untouched() {
        let mut c = [42.0];
        samples_to_coefficients(&mut c, SplineDegree::Septic, 0.0);
        assert_eq!(c, [42.0]);

        let mut empty: [f64; 0] = [];
        samples_to_coefficients(&mut empty, SplineDegree::Cubic, 0.0);
    }

    #[test]
    fn constant_line_has_constant_coefficients() {
        let mut c = vec![5.0; 12];
        samples_to_coefficients(&mut c, SplineDegree::Cubic, 0.0);
        for v in c {
            assert!((v - 5.0).abs() < 1e-10);
        }
    }

    #[test]
    fn truncated_horizon_stays_close_to_exact() {
        let c: Vec<f64> = ramp(200).iter().map(|v| v * 6.0).collect();
        let z = SplineDegree::Cubic.poles()[0];
        let exact = initial_causal_coefficient(&c, z, 0.0);
        let approx = initial_causal_coefficient(&c, z, 1e-12);
        assert!((exact - approx).abs() < 1e-6, "{exact} vs {approx}");
    }
}
