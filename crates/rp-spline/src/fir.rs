use rp_core::{BorderMode, map_index};

use crate::kernels::{GRADIENT_TAPS, REDUCE_TAPS, SplineDegree};

/// Symmetric FIR filter with half-sample mirror boundaries.
///
/// `h` holds the non-negative half of the kernel, `h[0]` being the center
/// tap. Two- and four-tap kernels use closed-form edge expressions; other
/// lengths go through the generic mirrored convolution.
pub fn symmetric_fir(h: &[f64], c: &[f64], s: &mut [f64]) {
    assert_eq!(s.len(), c.len(), "out must match signal length");
    if c.is_empty() {
        return;
    }

    match h.len() {
        2 => symmetric_fir2(h, c, s),
        4 => symmetric_fir4(h, c, s),
        _ => symmetric_fir_generic(h, c, s),
    }
}

fn symmetric_fir2(h: &[f64], c: &[f64], s: &mut [f64]) {
    let n = c.len();
    if n < 2 {
        s[0] = (h[0] + 2.0 * h[1]) * c[0];
        return;
    }

    s[0] = h[0] * c[0] + h[1] * (c[0] + c[1]);
    for i in 1..n - 1 {
        s[i] = h[0] * c[i] + h[1] * (c[i - 1] + c[i + 1]);
    }
    s[n - 1] = h[0] * c[n - 1] + h[1] * (c[n - 2] + c[n - 1]);
}

fn symmetric_fir4(h: &[f64], c: &[f64], s: &mut [f64]) {
    let n = c.len();
    match n {
        1 => {
            s[0] = (h[0] + 2.0 * (h[1] + h[2] + h[3])) * c[0];
        }
        2 => {
            s[0] = (h[0] + h[1] + h[3]) * c[0] + (h[1] + 2.0 * h[2] + h[3]) * c[1];
            s[1] = (h[0] + h[1] + h[3]) * c[1] + (h[1] + 2.0 * h[2] + h[3]) * c[0];
        }
        3 => {
            s[0] = h[0] * c[0] + h[1] * (c[0] + c[1]) + h[2] * (c[1] + c[2]) + 2.0 * h[3] * c[2];
            s[1] = h[0] * c[1] + (h[1] + h[2]) * (c[0] + c[2]) + 2.0 * h[3] * c[1];
            s[2] = h[0] * c[2] + h[1] * (c[1] + c[2]) + h[2] * (c[0] + c[1]) + 2.0 * h[3] * c[0];
        }
        4 => {
            s[0] = h[0] * c[0] + h[1] * (c[0] + c[1]) + h[2] * (c[1] + c[2]) + h[3] * (c[2] + c[3]);
            s[1] = h[0] * c[1] + h[1] * (c[0] + c[2]) + h[2] * (c[0] + c[3]) + h[3] * (c[1] + c[3]);
            s[2] = h[0] * c[2] + h[1] * (c[1] + c[3]) + h[2] * (c[0] + c[3]) + h[3] * (c[0] + c[2]);
            s[3] = h[0] * c[3] + h[1] * (c[2] + c[3]) + h[2] * (c[1] + c[2]) + h[3] * (c[0] + c[1]);
        }
        5 => {
            s[0] = h[0] * c[0] + h[1] * (c[0] + c[1]) + h[2] * (c[1] + c[2]) + h[3] * (c[2] + c[3]);
            s[1] = h[0] * c[1] + h[1] * (c[0] + c[2]) + h[2] * (c[0] + c[3]) + h[3] * (c[1] + c[4]);
            s[2] = h[0] * c[2] + h[1] * (c[1] + c[3]) + (h[2] + h[3]) * (c[0] + c[4]);
            s[3] = h[0] * c[3] + h[1] * (c[2] + c[4]) + h[2] * (c[1] + c[4]) + h[3] * (c[0] + c[3]);
            s[4] = h[0] * c[4] + h[1] * (c[3] + c[4]) + h[2] * (c[2] + c[3]) + h[3] * (c[1] + c[2]);
        }
        _ => {
            s[0] = h[0] * c[0] + h[1] * (c[0] + c[1]) + h[2] * (c[1] + c[2]) + h[3] * (c[2] + c[3]);
            s[1] = h[0] * c[1] + h[1] * (c[0] + c[2]) + h[2] * (c[0] + c[3]) + h[3] * (c[1] + c[4]);
            s[2] = h[0] * c[2] + h[1] * (c[1] + c[3]) + h[2] * (c[0] + c[4]) + h[3] * (c[0] + c[5]);
            for i in 3..n - 3 {
                s[i] = h[0] * c[i]
                    + h[1] * (c[i - 1] + c[i + 1])
                    + h[2] * (c[i - 2] + c[i + 2])
                    + h[3] * (c[i - 3] + c[i + 3]);
            }
            s[n - 3] = h[0] * c[n - 3]
                + h[1] * (c[n - 4] + c[n - 2])
                + h[2] * (c[n - 5] + c[n - 1])
                + h[3] * (c[n - 6] + c[n - 1]);
            s[n - 2] = h[0] * c[n - 2]
                + h[1] * (c[n - 3] + c[n - 1])
                + h[2] * (c[n - 4] + c[n - 1])
                + h[3] * (c[n - 5] + c[n - 2]);
            s[n - 1] = h[0] * c[n - 1]
                + h[1] * (c[n - 2] + c[n - 1])
                + h[2] * (c[n - 3] + c[n - 2])
                + h[3] * (c[n - 4] + c[n - 3]);
        }
    }
}

fn symmetric_fir_generic(h: &[f64], c: &[f64], s: &mut [f64]) {
    let n = c.len();
    let mode = BorderMode::<f64>::Mirror;
    for (i, s_i) in s.iter_mut().enumerate() {
        let mut acc = h.first().copied().unwrap_or(0.0) * c[i];
        for (k, &hk) in h.iter().enumerate().skip(1) {
            let left = map_index(i as isize - k as isize, n, &mode).unwrap_or(i);
            let right = map_index(i as isize + k as isize, n, &mode).unwrap_or(i);
            acc += hk * (c[left] + c[right]);
        }
        *s_i = acc;
    }
}

/// Antisymmetric FIR filter with half-sample mirror boundaries.
///
/// Only `h[1]` is used: `s[i] = h[1] * (c[i+1] - c[i-1])`. A single-sample
/// line has zero slope.
pub fn antisymmetric_fir(h: &[f64], c: &[f64], s: &mut [f64]) {
    assert_eq!(s.len(), c.len(), "out must match signal length");
    let n = c.len();
    if n == 0 {
        return;
    }
    if n < 2 {
        s[0] = 0.0;
        return;
    }

    s[0] = h[1] * (c[1] - c[0]);
    for i in 1..n - 1 {
        s[i] = h[1] * (c[i + 1] - c[i - 1]);
    }
    s[n - 1] = h[1] * (c[n - 1] - c[n - 2]);
}

/// Samples a spline of `degree` at the integers, in place.
pub fn coefficients_to_samples(c: &mut [f64], degree: SplineDegree) {
    let mut s = vec![0.0; c.len()];
    symmetric_fir(degree.taps(), c, &mut s);
    c.copy_from_slice(&s);
}

/// Slope of the cubic spline with coefficients `c` at the integers, in place.
pub fn coefficient_to_gradient(c: &mut [f64]) {
    let mut s = vec![0.0; c.len()];
    antisymmetric_fir(&GRADIENT_TAPS, c, &mut s);
    c.copy_from_slice(&s);
}

/// Low-pass and decimate a dual-spline line by two.
///
/// `s.len()` must be `c.len() / 2`. When `c` has odd length the last input
/// sample only contributes through the mirror.
pub fn reduce_dual(c: &[f64], s: &mut [f64]) {
    assert_eq!(s.len(), c.len() / 2, "out must be half the signal length");
    let h = &REDUCE_TAPS;
    let n = c.len();
    let m = s.len();

    if m >= 2 {
        s[0] = h[0] * c[0] + h[1] * (c[0] + c[1]) + h[2] * (c[1] + c[2]);
        for j in 1..m - 1 {
            let i = 2 * j;
            s[j] = h[0] * c[i] + h[1] * (c[i - 1] + c[i + 1]) + h[2] * (c[i - 2] + c[i + 2]);
        }
        s[m - 1] = if n == 2 * m {
            h[0] * c[n - 2] + h[1] * (c[n - 3] + c[n - 1]) + h[2] * (c[n - 4] + c[n - 1])
        } else {
            h[0] * c[n - 3] + h[1] * (c[n - 4] + c[n - 2]) + h[2] * (c[n - 5] + c[n - 1])
        };
        return;
    }

    match n {
        3 => s[0] = h[0] * c[0] + h[1] * (c[0] + c[1]) + h[2] * (c[1] + c[2]),
        2 => s[0] = h[0] * c[0] + h[1] * (c[0] + c[1]) + 2.0 * h[2] * c[1],
        _ => {}
    }
}
