use log::{debug, info};
use rp_core::{
    BorderMode, CancelToken, Error, Image, Interval, Point2d, Progress, ProgressFn, Role,
    SelectionRect, map_index,
};
use serde::{Deserialize, Serialize};

/// A region of interest in global pixel coordinates.
///
/// A region either lists the pixels it covers ([`Region::interior`]) or
/// answers point-membership queries ([`Region::contains`]). Listing is
/// preferred when available.
pub trait Region: Send + Sync {
    fn contains(&self, x: f64, y: f64) -> bool;

    fn interior(&self) -> Option<Vec<(i64, i64)>> {
        None
    }
}

/// Axis-aligned block of pixels `[x, x + width) x [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectRegion {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
}

impl Region for RectRegion {
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64
            && y >= self.y as f64
            && x < (self.x + self.width as i64) as f64
            && y < (self.y + self.height as i64) as f64
    }

    fn interior(&self) -> Option<Vec<(i64, i64)>> {
        let mut pixels = Vec::with_capacity(self.width * self.height);
        for y in self.y..self.y + self.height as i64 {
            for x in self.x..self.x + self.width as i64 {
                pixels.push((x, y));
            }
        }
        Some(pixels)
    }
}

/// Closed polygon tested with the even-odd rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonRegion {
    pub vertices: Vec<Point2d>,
}

impl Region for PolygonRegion {
    fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.vertices[i], self.vertices[j]);
            if (a.y > y) != (b.y > y) {
                let cross_x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
                if x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Explicit pixel list, e.g. a painted selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRegion {
    pub pixels: Vec<(i64, i64)>,
}

impl Region for PixelRegion {
    fn contains(&self, x: f64, y: f64) -> bool {
        self.pixels
            .iter()
            .any(|&(px, py)| px as f64 == x && py as f64 == y)
    }

    fn interior(&self) -> Option<Vec<(i64, i64)>> {
        Some(self.pixels.clone())
    }
}

/// How a mask level is reduced to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskReduction {
    /// Sum of `|value|` over each 2x2 block; the last row/column of an odd
    /// level is folded into its neighbouring output cell.
    #[default]
    Block2x2,
    /// Sum of `|value|` over the 3x3 window centred on every even pixel,
    /// overlapping its neighbours by one row/column; an odd last
    /// row/column is dropped.
    Overlapping3x3,
}

/// Weight mask with its reduced levels.
#[derive(Debug, Clone)]
pub struct MaskPyramid {
    interval: Interval,
    mask: Image<f32>,
    levels: Vec<Image<f32>>,
}

impl MaskPyramid {
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    /// Full-size mask.
    pub fn mask(&self) -> &Image<f32> {
        &self.mask
    }

    pub fn levels(&self) -> &[Image<f32>] {
        &self.levels
    }

    pub fn level(&self, i: usize) -> Option<&Image<f32>> {
        self.levels.get(i)
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn is_complete(&self) -> bool {
        self.levels.len() == self.interval.reduced_levels()
    }

    pub fn coarsest(&self) -> Option<&Image<f32>> {
        self.levels.last()
    }

    pub fn pop_coarsest(&mut self) -> Option<Image<f32>> {
        self.levels.pop()
    }

    pub fn coarse_to_fine(&self) -> impl Iterator<Item = &Image<f32>> {
        self.levels.iter().rev()
    }
}

/// Rasterizes regions of interest and builds a [`MaskPyramid`].
#[derive(Debug, Clone)]
pub struct MaskPyramidBuilder {
    mask: Image<f32>,
    interval: Interval,
    reduction: MaskReduction,
    cancel: CancelToken,
    progress: Progress,
}

impl MaskPyramidBuilder {
    /// Mask of `width x height` pixels, initially all ones.
    pub fn new(width: usize, height: usize, role: Role) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage { width, height });
        }

        Ok(Self {
            mask: Image::new_fill(width, height, 1.0f32),
            interval: Interval::new(width, height, role),
            reduction: MaskReduction::default(),
            cancel: CancelToken::new(),
            progress: Progress::default(),
        })
    }

    /// Mask spanning a selection: one pixel wider and taller than the
    /// truncated selection size, anchored at the truncated origin.
    pub fn from_selection(selection: &SelectionRect, role: Role) -> Result<Self, Error> {
        let (w, h) = selection.extent();
        Ok(Self::new(w + 1, h + 1, role)?
            .with_offset(selection.x.trunc() as i64, selection.y.trunc() as i64))
    }

    pub fn with_offset(mut self, x_offset: i64, y_offset: i64) -> Self {
        self.interval = self.interval.with_offset(x_offset, y_offset);
        self
    }

    pub fn with_pyramid_depth(mut self, pyramid_depth: usize) -> Self {
        self.interval = self.interval.with_pyramid_depth(pyramid_depth);
        self
    }

    pub fn with_reduction(mut self, reduction: MaskReduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, callback: ProgressFn) -> Self {
        self.progress = Progress::new(Some(callback));
        self
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn mask(&self) -> &Image<f32> {
        &self.mask
    }

    /// Sets every pixel to 1.
    pub fn clear_mask(&mut self) {
        self.progress.begin("Clearing mask", 1);
        self.mask.fill(1.0);
        self.progress.done();
    }

    /// Marks the union of `regions`; no region means the whole image.
    pub fn set_regions(&mut self, regions: &[&dyn Region]) {
        if regions.is_empty() {
            self.clear_mask();
            return;
        }

        self.mask.fill(0.0);
        self.progress.begin("Computing mask", regions.len());
        let (w, h) = (self.mask.width(), self.mask.height());
        let (x0, y0) = (self.interval.x_offset, self.interval.y_offset);
        for region in regions {
            match region.interior() {
                Some(pixels) => {
                    for (gx, gy) in pixels {
                        let (x, y) = (gx - x0, gy - y0);
                        if x < 0 || y < 0 {
                            continue;
                        }
                        if let Some(px) = self.mask.get_mut(x as usize, y as usize) {
                            *px = 1.0;
                        }
                    }
                }
                None => {
                    for y in 0..h {
                        let gy = (y as i64 + y0) as f64;
                        for (x, px) in self.mask.row_mut(y).iter_mut().enumerate() {
                            if region.contains((x as i64 + x0) as f64, gy) {
                                *px = 1.0;
                            }
                        }
                    }
                }
            }
            self.progress.step();
        }
        self.progress.done();
        debug!(
            "mask {w}x{h}: {} of {} pixels set",
            self.mask.data().iter().filter(|&&v| v != 0.0).count(),
            w * h
        );
    }

    pub fn build(self) -> MaskPyramid {
        let Self {
            mask,
            interval,
            reduction,
            cancel,
            mut progress,
        } = self;

        let wanted = interval.reduced_levels();
        let mut levels: Vec<Image<f32>> = Vec::with_capacity(wanted);
        progress.begin("Reducing mask", wanted);
        for depth in 1..interval.pyramid_depth {
            if cancel.is_canceled() {
                debug!("mask pyramid cancelled before level {depth}");
                break;
            }
            let full = levels.last().unwrap_or(&mask);
            let half = half_mask(full, reduction);
            if half.is_empty() {
                break;
            }
            debug!("mask level {depth}: {}x{}", half.width(), half.height());
            levels.push(half);
            progress.step();
        }
        progress.done();
        info!(
            "mask pyramid {}x{} ({reduction:?}): {} levels",
            interval.width,
            interval.height,
            levels.len()
        );

        MaskPyramid {
            interval,
            mask,
            levels,
        }
    }
}

/// Area-accumulating reduction of a mask to `width/2 x height/2`.
pub fn half_mask(full: &Image<f32>, reduction: MaskReduction) -> Image<f32> {
    match reduction {
        MaskReduction::Block2x2 => half_mask_block(full),
        MaskReduction::Overlapping3x3 => half_mask_overlapping(full),
    }
}

fn half_mask_block(full: &Image<f32>) -> Image<f32> {
    let (full_w, full_h) = (full.width(), full.height());
    let (half_w, half_h) = (full_w / 2, full_h / 2);
    let mut half = Image::new_fill(half_w, half_h, 0.0f32);
    if half_w == 0 || half_h == 0 {
        return half;
    }

    for y in 0..full_h {
        let hy = (y / 2).min(half_h - 1);
        let src = full.row(y);
        let dst = half.row_mut(hy);
        for (x, &v) in src.iter().enumerate() {
            dst[(x / 2).min(half_w - 1)] += v.abs();
        }
    }
    half
}

fn half_mask_overlapping(full: &Image<f32>) -> Image<f32> {
    let (half_w, half_h) = (full.width() / 2, full.height() / 2);
    let mut half = Image::new_fill(half_w, half_h, 0.0f32);
    // Only the even-sized part of the level contributes.
    let (span_w, span_h) = (2 * half_w, 2 * half_h);
    let zero = BorderMode::Constant(0.0f32);

    for hy in 0..half_h {
        for hx in 0..half_w {
            let mut acc = 0.0f32;
            for dy in -1isize..=1 {
                let Some(y) = map_index(2 * hy as isize + dy, span_h, &zero) else {
                    continue;
                };
                for dx in -1isize..=1 {
                    if let Some(x) = map_index(2 * hx as isize + dx, span_w, &zero) {
                        acc += full.row(y)[x].abs();
                    }
                }
            }
            half.row_mut(hy)[hx] = acc;
        }
    }
    half
}
