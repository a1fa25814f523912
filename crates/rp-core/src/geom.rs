use core::ops::Sub;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2d {
    pub x: f64,
    pub y: f64,
}

impl Point2d {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point2d) -> f64 {
        (self - other).norm()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2d {
    pub x: f64,
    pub y: f64,
}

impl Vec2d {
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Sub<Point2d> for Point2d {
    type Output = Vec2d;

    fn sub(self, rhs: Point2d) -> Self::Output {
        Vec2d {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Real-valued selection rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer pixel block `[x, x + width) x [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl SelectionRect {
    /// Pixels whose index lies inside the selection: from `ceil` of the
    /// origin up to and including `floor` of the far corner, clipped to the
    /// image. `None` when nothing remains.
    pub fn pixel_bounds(&self, image_width: usize, image_height: usize) -> Option<PixelRect> {
        let x0 = self.x.ceil().max(0.0);
        let y0 = self.y.ceil().max(0.0);
        let x1 = (self.x + self.width).floor().min(image_width as f64 - 1.0);
        let y1 = (self.y + self.height).floor().min(image_height as f64 - 1.0);
        if x1 < x0 || y1 < y0 {
            return None;
        }

        Some(PixelRect {
            x: x0 as usize,
            y: y0 as usize,
            width: (x1 - x0) as usize + 1,
            height: (y1 - y0) as usize + 1,
        })
    }

    /// Intersection with the span of pixel centers `[0, w - 1] x [0, h - 1]`.
    ///
    /// A selection already inside that span comes back unchanged. `None` when
    /// the two do not overlap.
    pub fn clip_to(&self, image_width: usize, image_height: usize) -> Option<SelectionRect> {
        if image_width == 0 || image_height == 0 {
            return None;
        }
        let x0 = self.x.max(0.0);
        let y0 = self.y.max(0.0);
        let x1 = (self.x + self.width).min(image_width as f64 - 1.0);
        let y1 = (self.y + self.height).min(image_height as f64 - 1.0);
        if x1 < x0 || y1 < y0 {
            return None;
        }

        Some(SelectionRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    /// Extent used when sizing pyramids: the selection size truncated.
    pub fn extent(&self) -> (usize, usize) {
        (self.width.max(0.0) as usize, self.height.max(0.0) as usize)
    }
}
