use log::{debug, info, warn};
use rp_core::{
    CancelToken, Error, Image, ProgressFn, Role, SelectionRect, TransformKind, pyramid_depth,
};
use rp_landmark::{LandmarkSet, LandmarkTable, OverlayPoint};
use rp_pyr::{ImagePyramid, ImagePyramidBuilder, MaskPyramid, MaskPyramidBuilder};
use serde::Serialize;

use crate::{ImageDisplay, PrepareOptions, RegistrationSolver};

/// Everything a solver needs for one registration.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub transform: TransformKind,
    pub source: ImagePyramid,
    pub target: ImagePyramid,
    pub source_mask: MaskPyramid,
    pub target_mask: MaskPyramid,
    pub source_landmarks: LandmarkSet,
    pub target_landmarks: LandmarkSet,
}

impl Prepared {
    pub fn pyramid_depth(&self) -> usize {
        self.source.interval().pyramid_depth
    }

    pub fn overlay(&self) -> Overlay {
        Overlay {
            source: self.source_landmarks.overlay_points(),
            target: self.target_landmarks.overlay_points(),
        }
    }
}

/// Landmarks of both images for drawing, in image coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub source: Vec<OverlayPoint>,
    pub target: Vec<OverlayPoint>,
}

/// Runs the builds for a registration or a final transform.
#[derive(Clone, Default)]
pub struct Preparation {
    options: PrepareOptions,
    cancel: CancelToken,
    progress: Option<ProgressFn>,
}

struct Plane {
    image: Image<f32>,
    offset: (i64, i64),
    extent: (usize, usize),
    selection: Option<SelectionRect>,
}

struct MaskJob<'a> {
    builder: MaskPyramidBuilder,
    regions_from: Option<&'a dyn ImageDisplay>,
}

impl Preparation {
    pub fn new(options: PrepareOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, callback: ProgressFn) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn options(&self) -> &PrepareOptions {
        &self.options
    }

    /// Builds both pyramids, both masks and both landmark sets.
    ///
    /// Landmarks are restored from `table` when it matches the
    /// transformation, otherwise laid out by default.
    pub fn prepare(
        &self,
        source: &dyn ImageDisplay,
        target: &dyn ImageDisplay,
        table: Option<&LandmarkTable>,
    ) -> Result<Prepared, Error> {
        let kind = self.options.transform;
        let src = active_plane(source)?;
        let tgt = active_plane(target)?;
        let depth = pyramid_depth(src.extent, tgt.extent);
        info!(
            "preparing {kind}: source {}x{}, target {}x{}, depth {depth}",
            src.image.width(),
            src.image.height(),
            tgt.image.width(),
            tgt.image.height()
        );

        let source_mask = MaskJob {
            builder: self.mask_builder(&src, Role::Source, depth)?,
            regions_from: self.options.use_source_regions.then_some(source),
        };
        let target_mask = MaskJob {
            builder: self.mask_builder(&tgt, Role::Target, depth)?,
            regions_from: self.options.use_target_regions.then_some(target),
        };
        let source_image = self.image_builder(src.image, src.offset, Role::Source, depth)?;
        let target_image = self.image_builder(tgt.image, tgt.offset, Role::Target, depth)?;

        Ok(self.build_all(source_image, target_image, source_mask, target_mask, table))
    }

    /// Prepares, runs the solver and stores the refined landmarks in
    /// `table`. Returns the landmarks for drawing.
    pub fn register<S: RegistrationSolver + ?Sized>(
        &self,
        solver: &mut S,
        source: &dyn ImageDisplay,
        target: &dyn ImageDisplay,
        table: &mut LandmarkTable,
    ) -> Result<Overlay, Error> {
        let mut prepared = self.prepare(source, target, Some(table))?;
        solver.register(&mut prepared)?;
        prepared.source_landmarks.write_table(table);
        prepared.target_landmarks.write_table(table);
        debug!("stored {} landmark rows", table.row_count());
        Ok(prepared.overlay())
    }

    /// Prepares a single plane for a final transform with stored landmarks.
    ///
    /// The plane is the source; the target is a zero raster of the same
    /// geometry and both masks weight everything.
    pub fn prepare_apply(
        &self,
        display: &dyn ImageDisplay,
        table: Option<&LandmarkTable>,
    ) -> Result<Prepared, Error> {
        let plane = active_plane(display)?;
        let depth = pyramid_depth(plane.extent, plane.extent);
        let (w, h) = (plane.image.width(), plane.image.height());
        info!("preparing final {} transform of {w}x{h}", self.options.transform);

        let source_mask = MaskJob {
            builder: self.full_mask_builder(w, h, plane.offset, Role::Source, depth)?,
            regions_from: None,
        };
        let target_mask = MaskJob {
            builder: self.full_mask_builder(w, h, plane.offset, Role::Target, depth)?,
            regions_from: None,
        };
        let zeros = Image::new_fill(w, h, 0.0f32);
        let source_image = self.image_builder(plane.image, plane.offset, Role::Source, depth)?;
        let target_image = self.image_builder(zeros, plane.offset, Role::Target, depth)?;

        Ok(self.build_all(source_image, target_image, source_mask, target_mask, table))
    }

    /// Final transform of the display's plane, clamped to the output range.
    pub fn apply<S: RegistrationSolver + ?Sized>(
        &self,
        solver: &mut S,
        display: &dyn ImageDisplay,
        table: Option<&LandmarkTable>,
    ) -> Result<Image<f32>, Error> {
        let mut prepared = self.prepare_apply(display, table)?;
        let mut output = solver.batch_final_transform(&mut prepared)?;
        clamp_output(&mut output, self.options.output_range);
        Ok(output)
    }

    fn build_all(
        &self,
        source: ImagePyramidBuilder,
        target: ImagePyramidBuilder,
        source_mask: MaskJob<'_>,
        target_mask: MaskJob<'_>,
        table: Option<&LandmarkTable>,
    ) -> Prepared {
        let ((source, target), (source_mask, target_mask)) = rayon::join(
            move || rayon::join(move || source.build(), move || target.build()),
            move || rayon::join(move || source_mask.build(), move || target_mask.build()),
        );
        if self.cancel.is_canceled() {
            warn!("preparation cancelled; pyramids may be incomplete");
        }

        let transform = self.options.transform;
        Prepared {
            transform,
            source_landmarks: LandmarkSet::from_table(transform, table, *source.interval()),
            target_landmarks: LandmarkSet::from_table(transform, table, *target.interval()),
            source,
            target,
            source_mask,
            target_mask,
        }
    }

    fn image_builder(
        &self,
        image: Image<f32>,
        (x_offset, y_offset): (i64, i64),
        role: Role,
        depth: usize,
    ) -> Result<ImagePyramidBuilder, Error> {
        let mut builder = ImagePyramidBuilder::new(image, self.options.transform, role)?
            .with_offset(x_offset, y_offset)
            .with_pyramid_depth(depth)
            .with_cancel(self.cancel.clone());
        if let Some(cb) = &self.progress {
            builder = builder.with_progress(cb.clone());
        }
        Ok(builder)
    }

    fn mask_builder(
        &self,
        plane: &Plane,
        role: Role,
        depth: usize,
    ) -> Result<MaskPyramidBuilder, Error> {
        match plane.selection {
            Some(sel) => {
                Ok(self.configure_mask(MaskPyramidBuilder::from_selection(&sel, role)?, depth))
            }
            None => self.full_mask_builder(
                plane.image.width(),
                plane.image.height(),
                plane.offset,
                role,
                depth,
            ),
        }
    }

    fn full_mask_builder(
        &self,
        width: usize,
        height: usize,
        (x_offset, y_offset): (i64, i64),
        role: Role,
        depth: usize,
    ) -> Result<MaskPyramidBuilder, Error> {
        let builder = MaskPyramidBuilder::new(width, height, role)?.with_offset(x_offset, y_offset);
        Ok(self.configure_mask(builder, depth))
    }

    fn configure_mask(&self, builder: MaskPyramidBuilder, depth: usize) -> MaskPyramidBuilder {
        let mut builder = builder
            .with_pyramid_depth(depth)
            .with_reduction(self.options.mask_reduction)
            .with_cancel(self.cancel.clone());
        if let Some(cb) = &self.progress {
            builder = builder.with_progress(cb.clone());
        }
        builder
    }
}

impl MaskJob<'_> {
    fn build(self) -> MaskPyramid {
        let Self {
            mut builder,
            regions_from,
        } = self;
        match regions_from {
            Some(display) => builder.set_regions(&display.regions()),
            None => builder.clear_mask(),
        }
        builder.build()
    }
}

/// Copies the display's active plane, cropped to its selection if any.
fn active_plane(display: &dyn ImageDisplay) -> Result<Plane, Error> {
    let view = display.active_plane().ok_or(Error::NoActiveImage)?;
    if let Some(sel) = display.selection() {
        // Crop, depth and mask all follow the part of the selection on the image.
        let (w, h) = (view.width(), view.height());
        match sel.clip_to(w, h).and_then(|c| Some((c, c.pixel_bounds(w, h)?))) {
            Some((clipped, b)) => {
                let image = view.subview(b.x, b.y, b.width, b.height)?.to_image();
                debug!("selection crop {}x{} at ({}, {})", b.width, b.height, b.x, b.y);
                return Ok(Plane {
                    image,
                    offset: (b.x as i64, b.y as i64),
                    extent: clipped.extent(),
                    selection: Some(clipped),
                });
            }
            None => warn!("selection {sel:?} lies outside the image; using the whole plane"),
        }
    }

    let image = view.to_image();
    let extent = (image.width(), image.height());
    Ok(Plane {
        image,
        offset: (0, 0),
        extent,
        selection: None,
    })
}

/// Clamps every sample into `[lo, hi]`.
pub fn clamp_output(image: &mut Image<f32>, [lo, hi]: [f32; 2]) {
    for v in image.data_mut() {
        *v = v.max(lo).min(hi);
    }
}
