//! Separable 2-D compositions of the line filters.
//!
//! Every operation filters all rows first, then all columns, through `f64`
//! line buffers; rasters stay `f32`.

use rp_core::Image;

use crate::fir::{antisymmetric_fir, reduce_dual, symmetric_fir};
use crate::kernels::{GRADIENT_TAPS, SplineDegree};
use crate::recursive::samples_to_coefficients;

/// Horizontal and vertical derivative rasters of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub x: Image<f32>,
    pub y: Image<f32>,
}

struct Lines {
    row: Vec<f64>,
    row_out: Vec<f64>,
    col: Vec<f64>,
    col_out: Vec<f64>,
}

impl Lines {
    fn for_image(img: &Image<f32>) -> Self {
        Self {
            row: vec![0.0; img.width()],
            row_out: vec![0.0; img.width()],
            col: vec![0.0; img.height()],
            col_out: vec![0.0; img.height()],
        }
    }
}

/// Interpolation coefficients of `img`, computed in place.
pub fn samples_to_coefficients_2d(img: &mut Image<f32>, degree: SplineDegree) {
    let mut lines = Lines::for_image(img);
    for y in 0..img.height() {
        img.read_row(y, &mut lines.row);
        samples_to_coefficients(&mut lines.row, degree, 0.0);
        img.write_row(y, &lines.row);
    }
    for x in 0..img.width() {
        img.read_column(x, &mut lines.col);
        samples_to_coefficients(&mut lines.col, degree, 0.0);
        img.write_column(x, &lines.col);
    }
}

/// Samples at the integers of the spline whose coefficients are `img`.
pub fn coefficients_to_samples_2d(img: &mut Image<f32>, degree: SplineDegree) {
    let h = degree.taps();
    let mut lines = Lines::for_image(img);
    for y in 0..img.height() {
        img.read_row(y, &mut lines.row);
        symmetric_fir(h, &lines.row, &mut lines.row_out);
        img.write_row(y, &lines.row_out);
    }
    for x in 0..img.width() {
        img.read_column(x, &mut lines.col);
        symmetric_fir(h, &lines.col, &mut lines.col_out);
        img.write_column(x, &lines.col_out);
    }
}

/// Cubic cardinal samples to their septic dual representation.
pub fn cardinal_to_dual_2d(img: &mut Image<f32>) {
    samples_to_coefficients_2d(img, SplineDegree::Cubic);
    coefficients_to_samples_2d(img, SplineDegree::Septic);
}

/// Septic dual representation back to cubic cardinal samples.
pub fn dual_to_cardinal_2d(img: &mut Image<f32>) {
    samples_to_coefficients_2d(img, SplineDegree::Septic);
    coefficients_to_samples_2d(img, SplineDegree::Cubic);
}

/// Half-size dual image: rows are reduced into a `width/2 x height` buffer,
/// whose columns are then reduced to `width/2 x height/2`.
pub fn reduce_dual_2d(full: &Image<f32>) -> Image<f32> {
    let (full_w, full_h) = (full.width(), full.height());
    let (half_w, half_h) = (full_w / 2, full_h / 2);

    let mut row = vec![0.0; full_w];
    let mut row_out = vec![0.0; half_w];
    let mut demi = Image::new_fill(half_w, full_h, 0.0f32);
    for y in 0..full_h {
        full.read_row(y, &mut row);
        reduce_dual(&row, &mut row_out);
        demi.write_row(y, &row_out);
    }

    let mut col = vec![0.0; full_h];
    let mut col_out = vec![0.0; half_h];
    let mut half = Image::new_fill(half_w, half_h, 0.0f32);
    for x in 0..half_w {
        demi.read_column(x, &mut col);
        reduce_dual(&col, &mut col_out);
        half.write_column(x, &col_out);
    }
    half
}

/// Gradients of the cubic interpolant of `img`.
///
/// Each row is interpolated and differentiated for the x gradient, each
/// column likewise for the y gradient.
pub fn image_to_xy_gradient_2d(img: &Image<f32>) -> Gradients {
    let (w, h) = (img.width(), img.height());
    let mut gx = Image::new_fill(w, h, 0.0f32);
    let mut gy = Image::new_fill(w, h, 0.0f32);
    let mut lines = Lines::for_image(img);

    for y in 0..h {
        img.read_row(y, &mut lines.row);
        samples_to_coefficients(&mut lines.row, SplineDegree::Cubic, 0.0);
        antisymmetric_fir(&GRADIENT_TAPS, &lines.row, &mut lines.row_out);
        gx.write_row(y, &lines.row_out);
    }
    for x in 0..w {
        img.read_column(x, &mut lines.col);
        samples_to_coefficients(&mut lines.col, SplineDegree::Cubic, 0.0);
        antisymmetric_fir(&GRADIENT_TAPS, &lines.col, &mut lines.col_out);
        gy.write_column(x, &lines.col_out);
    }

    Gradients { x: gx, y: gy }
}

/// Gradients of the cubic spline whose coefficients are `coeffs`.
///
/// x: differentiate along rows, sample along columns.
/// y: sample along rows, differentiate along columns.
pub fn coefficient_to_xy_gradient_2d(coeffs: &Image<f32>) -> Gradients {
    let (w, h) = (coeffs.width(), coeffs.height());
    let taps = SplineDegree::Cubic.taps();
    let mut gx = Image::new_fill(w, h, 0.0f32);
    let mut gy = Image::new_fill(w, h, 0.0f32);
    let mut lines = Lines::for_image(coeffs);

    for y in 0..h {
        coeffs.read_row(y, &mut lines.row);
        antisymmetric_fir(&GRADIENT_TAPS, &lines.row, &mut lines.row_out);
        gx.write_row(y, &lines.row_out);
        symmetric_fir(taps, &lines.row, &mut lines.row_out);
        gy.write_row(y, &lines.row_out);
    }
    for x in 0..w {
        gx.read_column(x, &mut lines.col);
        symmetric_fir(taps, &lines.col, &mut lines.col_out);
        gx.write_column(x, &lines.col_out);

        gy.read_column(x, &mut lines.col);
        antisymmetric_fir(&GRADIENT_TAPS, &lines.col, &mut lines.col_out);
        gy.write_column(x, &lines.col_out);
    }

    Gradients { x: gx, y: gy }
}

#[cfg(test)]
mod tests {
    use rp_core::Image;

    use super::{
        cardinal_to_dual_2d, coefficient_to_xy_gradient_2d, coefficients_to_samples_2d,
        dual_to_cardinal_2d, image_to_xy_gradient_2d, reduce_dual_2d, samples_to_coefficients_2d,
    };
    use crate::SplineDegree;

    fn plane(w: usize, h: usize) -> Image<f32> {
        let data = (0..w * h)
            .map(|i| {
                let (x, y) = ((i % w) as f32, (i / w) as f32);
                100.0 + 40.0 * (0.3 * x).sin() + 25.0 * (0.2 * y).cos()
            })
            .collect();
        Image::from_vec(w, h, data).expect("valid image")
    }

    fn max_abs_diff(a: &Image<f32>, b: &Image<f32>) -> f32 {
        a.data()
            .iter()
            .zip(b.data())
            .map(|(p, q)| (p - q).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn coefficient_round_trip_2d() {
        for degree in [SplineDegree::Cubic, SplineDegree::Septic] {
            let original = plane(13, 9);
            let mut img = original.clone();
            samples_to_coefficients_2d(&mut img, degree);
            coefficients_to_samples_2d(&mut img, degree);
            assert!(max_abs_diff(&img, &original) < 1e-3, "{degree:?}");
        }
    }

    #[test]
    fn dual_round_trip_2d() {
        let original = plane(16, 11);
        let mut img = original.clone();
        cardinal_to_dual_2d(&mut img);
        assert!(max_abs_diff(&img, &original) > 1e-2);
        dual_to_cardinal_2d(&mut img);
        assert!(max_abs_diff(&img, &original) < 1e-3);
    }

    #[test]
    fn reduce_halves_dimensions_and_keeps_constants() {
        let img = Image::new_fill(25, 14, 7.5f32);
        let half = reduce_dual_2d(&img);
        assert_eq!((half.width(), half.height()), (12, 7));
        assert!(half.data().iter().all(|&v| (v - 7.5).abs() < 1e-5));

        let tiny = reduce_dual_2d(&Image::new_fill(1, 5, 1.0f32));
        assert_eq!((tiny.width(), tiny.height()), (0, 2));
    }

    #[test]
    fn gradients_of_linear_ramp() {
        let (w, h) = (40usize, 36usize);
        let data = (0..w * h)
            .map(|i| 3.0 * (i % w) as f32 - 2.0 * (i / w) as f32)
            .collect();
        let img = Image::from_vec(w, h, data).expect("valid image");

        let direct = image_to_xy_gradient_2d(&img);

        let mut coeffs = img.clone();
        samples_to_coefficients_2d(&mut coeffs, SplineDegree::Cubic);
        let from_coeffs = coefficient_to_xy_gradient_2d(&coeffs);

        for y in 12..24 {
            for x in 12..28 {
                for g in [&direct, &from_coeffs] {
                    assert!((g.x.get(x, y).unwrap() - 3.0).abs() < 1e-3);
                    assert!((g.y.get(x, y).unwrap() + 2.0).abs() < 1e-3);
                }
            }
        }
    }
}
