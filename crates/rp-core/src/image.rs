use crate::Error;

/// Contiguous row-major raster: pixel `(x, y)` lives at `x + width * y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T> Image<T> {
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, Error> {
        let expected = width.checked_mul(height).ok_or(Error::SizeMismatch {
            expected: usize::MAX,
            actual: data.len(),
        })?;

        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row index out of bounds");
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row index out of bounds");
        let start = y * self.width;
        &mut self.data[start..start + self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(x + self.width * y)
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get_mut(x + self.width * y)
    }

    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            width: self.width,
            height: self.height,
            stride: self.width,
            data: &self.data,
        }
    }
}

impl<T: Clone> Image<T> {
    pub fn new_fill(width: usize, height: usize, value: T) -> Self {
        let len = width.checked_mul(height).expect("image size overflow");
        Self {
            width,
            height,
            data: vec![value; len],
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl Image<f32> {
    /// Copies row `y` into `line`, widening to `f64`.
    pub fn read_row(&self, y: usize, line: &mut [f64]) {
        debug_assert_eq!(line.len(), self.width);
        for (dst, &src) in line.iter_mut().zip(self.row(y)) {
            *dst = src as f64;
        }
    }

    pub fn write_row(&mut self, y: usize, line: &[f64]) {
        debug_assert_eq!(line.len(), self.width);
        for (dst, &src) in self.row_mut(y).iter_mut().zip(line) {
            *dst = src as f32;
        }
    }

    /// Copies column `x` into `line`, widening to `f64`.
    pub fn read_column(&self, x: usize, line: &mut [f64]) {
        debug_assert!(x < self.width);
        debug_assert_eq!(line.len(), self.height);
        for (y, dst) in line.iter_mut().enumerate() {
            *dst = self.data[x + self.width * y] as f64;
        }
    }

    pub fn write_column(&mut self, x: usize, line: &[f64]) {
        debug_assert!(x < self.width);
        debug_assert_eq!(line.len(), self.height);
        for (y, &src) in line.iter().enumerate() {
            self.data[x + self.width * y] = src as f32;
        }
    }
}

/// Borrowed, possibly strided view. `stride` is in elements.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T> {
    width: usize,
    height: usize,
    stride: usize,
    data: &'a [T],
}

impl<'a, T> ImageView<'a, T> {
    pub fn from_slice(
        width: usize,
        height: usize,
        stride: usize,
        data: &'a [T],
    ) -> Result<Self, Error> {
        if stride < width {
            return Err(Error::InvalidStride);
        }

        let min_len = min_required_len(width, height, stride).ok_or(Error::SizeMismatch {
            expected: usize::MAX,
            actual: data.len(),
        })?;

        if data.len() < min_len {
            return Err(Error::SizeMismatch {
                expected: min_len,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row(&self, y: usize) -> &'a [T] {
        assert!(y < self.height, "row index out of bounds");
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x)
    }

    pub fn subview(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageView<'a, T>, Error> {
        let fits_x = x.checked_add(width).is_some_and(|end| end <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|end| end <= self.height);
        if !fits_x || !fits_y {
            return Err(Error::OutOfBounds);
        }

        // The parent's length check covers every block inside it.
        let data: &'a [T] = if width == 0 || height == 0 {
            &[]
        } else {
            &self.data[y * self.stride + x..]
        };
        Ok(ImageView {
            width,
            height,
            stride: self.stride,
            data,
        })
    }
}

impl<T: Copy> ImageView<'_, T> {
    /// Packs the view into an owned contiguous raster.
    pub fn to_image(&self) -> Image<T> {
        let mut data = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            data.extend_from_slice(self.row(y));
        }
        Image {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

fn min_required_len(width: usize, height: usize, stride: usize) -> Option<usize> {
    if width == 0 || height == 0 {
        return Some(0);
    }

    let rows_before_last = height.checked_sub(1)?;
    let base = rows_before_last.checked_mul(stride)?;
    base.checked_add(width)
}

/// 8-bit host pixels as an `f32` raster.
pub fn to_f32(img: &ImageView<'_, u8>) -> Image<f32> {
    widen(img)
}

/// 16-bit host pixels as an `f32` raster.
pub fn to_f32_u16(img: &ImageView<'_, u16>) -> Image<f32> {
    widen(img)
}

fn widen<T: Copy + Into<f32>>(img: &ImageView<'_, T>) -> Image<f32> {
    let data = (0..img.height())
        .flat_map(|y| img.row(y).iter().map(|&px| px.into()))
        .collect();
    Image {
        width: img.width(),
        height: img.height(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::{Image, ImageView, to_f32};
    use crate::Error;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Image::from_vec(3, 2, vec![0.0f32; 5]).unwrap_err();
        assert_eq!(
            err,
            Error::SizeMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn strided_view_packs_to_contiguous() {
        let data = [1u8, 2, 3, 99, 4, 5, 6, 99];
        let view = ImageView::from_slice(3, 2, 4, &data).expect("valid view");
        assert_eq!(view.row(1), &[4, 5, 6]);

        let img = view.to_image();
        assert_eq!(img.data(), &[1, 2, 3, 4, 5, 6]);

        let f = to_f32(&view);
        assert_eq!(f.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn stride_smaller_than_width_is_rejected() {
        let data = [0u8; 8];
        assert_eq!(
            ImageView::from_slice(4, 2, 3, &data).unwrap_err(),
            Error::InvalidStride
        );
    }

    #[test]
    fn subview_selects_block() {
        let data: Vec<u16> = (0..20).collect();
        let img = Image::from_vec(5, 4, data).expect("valid image");
        let sub = img.as_view().subview(1, 2, 3, 2).expect("in bounds");
        assert_eq!(sub.to_image().data(), &[11, 12, 13, 16, 17, 18]);
        assert!(img.as_view().subview(3, 0, 3, 1).is_err());
    }

    #[test]
    fn row_and_column_lines_round_trip() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let mut img = Image::from_vec(4, 3, data).expect("valid image");

        let mut col = vec![0.0f64; 3];
        img.read_column(2, &mut col);
        assert_eq!(col, vec![2.0, 6.0, 10.0]);

        let mut row = vec![0.0f64; 4];
        img.read_row(1, &mut row);
        assert_eq!(row, vec![4.0, 5.0, 6.0, 7.0]);

        img.write_column(0, &[-1.0, -2.0, -3.0]);
        assert_eq!(img.get(0, 2), Some(&-3.0));
        img.write_row(2, &[9.0, 9.0, 9.0, 9.0]);
        assert_eq!(img.row(2), &[9.0, 9.0, 9.0, 9.0]);
    }
}
