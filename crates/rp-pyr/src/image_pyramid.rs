use log::{debug, info, warn};
use rp_core::{
    CancelToken, Error, Image, ImageView, Interval, Progress, ProgressFn, Role, TransformKind,
};
use rp_spline::{
    Gradients, SplineDegree, cardinal_to_dual_2d, coefficient_to_xy_gradient_2d,
    coefficients_to_samples_2d, dual_to_cardinal_2d, image_to_xy_gradient_2d, reduce_dual_2d,
    samples_to_coefficients_2d,
};

/// What each reduced level of an image pyramid stores.
///
/// | role \ model | affine family      | bilinear         |
/// |--------------|--------------------|------------------|
/// | target       | `Coefficients`     | `Samples`        |
/// | source       | `ImageAndGradient` | `Coefficients`   |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyramidShape {
    Coefficients,
    ImageAndGradient,
    Samples,
}

impl PyramidShape {
    pub fn for_role(transform: TransformKind, role: Role) -> Self {
        match (transform.is_affine_family(), role) {
            (true, Role::Target) => Self::Coefficients,
            (true, Role::Source) => Self::ImageAndGradient,
            (false, Role::Target) => Self::Samples,
            (false, Role::Source) => Self::Coefficients,
        }
    }
}

/// One reduced level of an image pyramid.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageLevel {
    /// Septic B-spline coefficients of the level.
    Coefficients(Image<f32>),
    /// Cubic cardinal samples with their analytic gradients.
    ImageAndGradient {
        samples: Image<f32>,
        gradients: Gradients,
    },
    /// Cubic cardinal samples.
    Samples(Image<f32>),
}

impl ImageLevel {
    fn raster(&self) -> &Image<f32> {
        match self {
            Self::Coefficients(img) | Self::Samples(img) => img,
            Self::ImageAndGradient { samples, .. } => samples,
        }
    }

    pub fn width(&self) -> usize {
        self.raster().width()
    }

    pub fn height(&self) -> usize {
        self.raster().height()
    }

    pub fn coefficients(&self) -> Option<&Image<f32>> {
        match self {
            Self::Coefficients(img) => Some(img),
            _ => None,
        }
    }

    pub fn samples(&self) -> Option<&Image<f32>> {
        match self {
            Self::Samples(img) => Some(img),
            Self::ImageAndGradient { samples, .. } => Some(samples),
            Self::Coefficients(_) => None,
        }
    }

    pub fn gradients(&self) -> Option<&Gradients> {
        match self {
            Self::ImageAndGradient { gradients, .. } => Some(gradients),
            _ => None,
        }
    }
}

/// Preprocessed image: full-size data plus reduced levels.
///
/// Levels are stored finest first. [`ImagePyramid::pop_coarsest`] hands them
/// out coarsest first, the order a coarse-to-fine optimizer consumes them.
#[derive(Debug, Clone)]
pub struct ImagePyramid {
    interval: Interval,
    transform: TransformKind,
    shape: PyramidShape,
    image: Image<f32>,
    coefficients: Image<f32>,
    gradients: Option<Gradients>,
    levels: Vec<ImageLevel>,
}

impl ImagePyramid {
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn transform(&self) -> TransformKind {
        self.transform
    }

    pub fn shape(&self) -> PyramidShape {
        self.shape
    }

    pub fn width(&self) -> usize {
        self.interval.width
    }

    pub fn height(&self) -> usize {
        self.interval.height
    }

    /// Full-size samples.
    pub fn image(&self) -> &Image<f32> {
        &self.image
    }

    /// Full-size cubic B-spline coefficients.
    pub fn coefficients(&self) -> &Image<f32> {
        &self.coefficients
    }

    /// Full-size gradients; present only for affine-family sources.
    pub fn gradients(&self) -> Option<&Gradients> {
        self.gradients.as_ref()
    }

    pub fn levels(&self) -> &[ImageLevel] {
        &self.levels
    }

    /// Reduced level `i`, `0` being the first reduction.
    pub fn level(&self, i: usize) -> Option<&ImageLevel> {
        self.levels.get(i)
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// `false` when a cancellation cut the build short.
    pub fn is_complete(&self) -> bool {
        self.levels.len() == self.interval.reduced_levels()
    }

    pub fn coarsest(&self) -> Option<&ImageLevel> {
        self.levels.last()
    }

    pub fn pop_coarsest(&mut self) -> Option<ImageLevel> {
        self.levels.pop()
    }

    pub fn coarse_to_fine(&self) -> impl Iterator<Item = &ImageLevel> {
        self.levels.iter().rev()
    }

    /// Releases the full-size raster, e.g. to be overwritten by a final
    /// transform.
    pub fn into_image(self) -> Image<f32> {
        self.image
    }
}

/// Builds an [`ImagePyramid`] from one raster.
#[derive(Debug, Clone)]
pub struct ImagePyramidBuilder {
    image: Image<f32>,
    interval: Interval,
    transform: TransformKind,
    cancel: CancelToken,
    progress: Progress,
}

impl ImagePyramidBuilder {
    pub fn new(image: Image<f32>, transform: TransformKind, role: Role) -> Result<Self, Error> {
        if image.is_empty() {
            return Err(Error::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }

        let interval = Interval::new(image.width(), image.height(), role);
        Ok(Self {
            image,
            interval,
            transform,
            cancel: CancelToken::new(),
            progress: Progress::default(),
        })
    }

    /// Copies a possibly strided host view.
    pub fn from_view(
        view: &ImageView<'_, f32>,
        transform: TransformKind,
        role: Role,
    ) -> Result<Self, Error> {
        Self::new(view.to_image(), transform, role)
    }

    pub fn with_offset(mut self, x_offset: i64, y_offset: i64) -> Self {
        self.interval = self.interval.with_offset(x_offset, y_offset);
        self
    }

    pub fn with_pyramid_depth(mut self, pyramid_depth: usize) -> Self {
        self.interval = self.interval.with_pyramid_depth(pyramid_depth);
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

    pub fn set_transformation(&mut self, transform: TransformKind) {
        self.transform = transform;
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn build(self) -> ImagePyramid {
        let Self {
            image,
            interval,
            transform,
            cancel,
            mut progress,
        } = self;
        let shape = PyramidShape::for_role(transform, interval.role);
        let role_name = if interval.is_target() { "target" } else { "source" };

        // Full-size coefficients are needed by every shape and are never
        // interrupted.
        progress.begin(&format!("Interpolating {role_name} image"), 1);
        let mut coefficients = image.clone();
        samples_to_coefficients_2d(&mut coefficients, SplineDegree::Cubic);
        progress.done();

        let mut gradients = None;
        let levels = match shape {
            PyramidShape::Coefficients => {
                build_coefficient_levels(&coefficients, &interval, &cancel, &mut progress)
            }
            PyramidShape::ImageAndGradient => {
                gradients = Some(image_to_xy_gradient_2d(&image));
                build_image_and_gradient_levels(&image, &interval, &cancel, &mut progress)
            }
            PyramidShape::Samples => {
                build_sample_levels(&image, &interval, &cancel, &mut progress)
            }
        };

        if levels.len() < interval.reduced_levels() {
            warn!(
                "{role_name} pyramid stopped at {} of {} levels",
                levels.len(),
                interval.reduced_levels()
            );
        }
        info!(
            "{role_name} pyramid {}x{} ({transform}, {shape:?}): {} levels",
            interval.width,
            interval.height,
            levels.len()
        );

        ImagePyramid {
            interval,
            transform,
            shape,
            image,
            coefficients,
            gradients,
            levels,
        }
    }
}

/// Runs `step` once per reduced level on successive half-size duals.
///
/// Stops early, keeping what was built, when the token is cancelled or a
/// dimension reaches zero.
fn reduce_levels(
    full_dual: Option<Image<f32>>,
    interval: &Interval,
    cancel: &CancelToken,
    progress: &mut Progress,
    message: &str,
    mut step: impl FnMut(&Image<f32>) -> ImageLevel,
) -> Vec<ImageLevel> {
    let wanted = interval.reduced_levels();
    let mut levels = Vec::with_capacity(wanted);
    let Some(mut dual) = full_dual else {
        return levels;
    };

    progress.begin(message, wanted);
    for depth in 1..interval.pyramid_depth {
        if cancel.is_canceled() {
            debug!("pyramid cancelled before level {depth}");
            break;
        }
        let half = reduce_dual_2d(&dual);
        if half.is_empty() {
            debug!("pyramid level {depth} would be empty, stopping");
            break;
        }
        debug!("pyramid level {depth}: {}x{}", half.width(), half.height());
        levels.push(step(&half));
        dual = half;
        progress.step();
    }
    progress.done();
    levels
}

fn build_coefficient_levels(
    coefficients: &Image<f32>,
    interval: &Interval,
    cancel: &CancelToken,
    progress: &mut Progress,
) -> Vec<ImageLevel> {
    let full_dual = (interval.pyramid_depth > 1).then(|| {
        let mut dual = coefficients.clone();
        coefficients_to_samples_2d(&mut dual, SplineDegree::Septic);
        dual
    });

    reduce_levels(
        full_dual,
        interval,
        cancel,
        progress,
        "Building coefficient pyramid",
        |half_dual| {
            let mut c = half_dual.clone();
            samples_to_coefficients_2d(&mut c, SplineDegree::Septic);
            ImageLevel::Coefficients(c)
        },
    )
}

fn build_image_and_gradient_levels(
    image: &Image<f32>,
    interval: &Interval,
    cancel: &CancelToken,
    progress: &mut Progress,
) -> Vec<ImageLevel> {
    let full_dual = (interval.pyramid_depth > 1).then(|| {
        let mut dual = image.clone();
        cardinal_to_dual_2d(&mut dual);
        dual
    });

    reduce_levels(
        full_dual,
        interval,
        cancel,
        progress,
        "Building image and gradient pyramid",
        |half_dual| {
            let mut c = half_dual.clone();
            samples_to_coefficients_2d(&mut c, SplineDegree::Septic);
            let gradients = coefficient_to_xy_gradient_2d(&c);
            coefficients_to_samples_2d(&mut c, SplineDegree::Cubic);
            ImageLevel::ImageAndGradient {
                samples: c,
                gradients,
            }
        },
    )
}

fn build_sample_levels(
    image: &Image<f32>,
    interval: &Interval,
    cancel: &CancelToken,
    progress: &mut Progress,
) -> Vec<ImageLevel> {
    let full_dual = (interval.pyramid_depth > 1).then(|| {
        let mut dual = image.clone();
        cardinal_to_dual_2d(&mut dual);
        dual
    });

    reduce_levels(
        full_dual,
        interval,
        cancel,
        progress,
        "Building image pyramid",
        |half_dual| {
            let mut samples = half_dual.clone();
            dual_to_cardinal_2d(&mut samples);
            ImageLevel::Samples(samples)
        },
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rp_core::{CancelToken, Error, Image, ImageView, ProgressFn, Role, TransformKind};

    use super::{ImageLevel, ImagePyramidBuilder, PyramidShape};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn smooth_image(w: usize, h: usize) -> Image<f32> {
        let data = (0..w * h)
            .map(|i| {
                let (x, y) = ((i % w) as f32, (i / w) as f32);
                128.0 + 60.0 * (0.05 * x).sin() * (0.07 * y).cos()
            })
            .collect();
        Image::from_vec(w, h, data).expect("valid image")
    }

    #[test]
    fn shape_follows_role_and_model() {
        use PyramidShape::*;
        let cases = [
            (TransformKind::Translation, Role::Target, Coefficients),
            (TransformKind::Affine, Role::Source, ImageAndGradient),
            (TransformKind::Bilinear, Role::Target, Samples),
            (TransformKind::Bilinear, Role::Source, Coefficients),
        ];
        for (kind, role, expected) in cases {
            assert_eq!(PyramidShape::for_role(kind, role), expected);
        }
    }

    #[test]
    fn affine_source_levels_carry_gradients() {
        init_logger();
        let pyr = ImagePyramidBuilder::new(
            smooth_image(100, 80),
            TransformKind::RigidBody,
            Role::Source,
        )
        .expect("non-empty")
        .with_pyramid_depth(3)
        .build();

        assert!(pyr.is_complete());
        assert_eq!(pyr.shape(), PyramidShape::ImageAndGradient);
        let full = pyr.gradients().expect("full-size gradients");
        assert_eq!((full.x.width(), full.x.height()), (100, 80));

        let dims: Vec<(usize, usize)> = pyr
            .levels()
            .iter()
            .map(|l| (l.width(), l.height()))
            .collect();
        assert_eq!(dims, vec![(50, 40), (25, 20)]);
        for level in pyr.levels() {
            let g = level.gradients().expect("gradients on every level");
            assert_eq!(g.x.width(), level.width());
            assert_eq!(g.y.height(), level.height());
            assert!(level.coefficients().is_none());
        }
    }

    #[test]
    fn sample_levels_match_across_shapes() {
        let img = smooth_image(96, 72);
        let build = |kind, role| {
            ImagePyramidBuilder::new(img.clone(), kind, role)
                .expect("non-empty")
                .with_pyramid_depth(3)
                .build()
        };
        let bilinear_target = build(TransformKind::Bilinear, Role::Target);
        let affine_source = build(TransformKind::Affine, Role::Source);
        assert_eq!(bilinear_target.shape(), PyramidShape::Samples);
        assert_eq!(affine_source.shape(), PyramidShape::ImageAndGradient);
        assert_eq!(bilinear_target.num_levels(), 2);
        assert_eq!(affine_source.num_levels(), 2);

        for (a, b) in bilinear_target.levels().iter().zip(affine_source.levels()) {
            assert!(matches!(a, ImageLevel::Samples(_)));
            let (a, b) = (a.samples().expect("samples"), b.samples().expect("samples"));
            assert_eq!((a.width(), a.height()), (b.width(), b.height()));
            let max_diff = a
                .data()
                .iter()
                .zip(b.data())
                .map(|(p, q)| (p - q).abs())
                .fold(0.0f32, f32::max);
            assert!(max_diff < 1e-4, "max diff {max_diff}");
        }
    }

    #[test]
    fn reduced_levels_keep_constant_images() {
        let img = Image::new_fill(64, 48, 42.0f32);
        for (kind, role) in [
            (TransformKind::Affine, Role::Source),
            (TransformKind::Affine, Role::Target),
            (TransformKind::Bilinear, Role::Target),
        ] {
            let pyr = ImagePyramidBuilder::new(img.clone(), kind, role)
                .expect("non-empty")
                .with_pyramid_depth(3)
                .build();
            assert_eq!(pyr.num_levels(), 2);
            for level in pyr.levels() {
                let raster = level
                    .samples()
                    .or(level.coefficients())
                    .expect("level raster");
                assert!(raster.data().iter().all(|&v| (v - 42.0).abs() < 1e-2));
                if let Some(g) = level.gradients() {
                    assert!(g.x.data().iter().all(|v| v.abs() < 1e-3));
                    assert!(g.y.data().iter().all(|v| v.abs() < 1e-3));
                }
            }
        }
    }

    #[test]
    fn depth_one_builds_no_levels() {
        let mut pyr =
            ImagePyramidBuilder::new(smooth_image(20, 20), TransformKind::Affine, Role::Target)
                .expect("non-empty")
                .build();
        assert_eq!(pyr.num_levels(), 0);
        assert!(pyr.is_complete());
        assert!(pyr.pop_coarsest().is_none());
        assert_eq!(pyr.coefficients().width(), 20);
    }

    #[test]
    fn pop_coarsest_returns_smallest_level_first() {
        let mut pyr =
            ImagePyramidBuilder::new(smooth_image(96, 96), TransformKind::Bilinear, Role::Target)
                .expect("non-empty")
                .with_pyramid_depth(4)
                .build();
        let widths: Vec<usize> = pyr.coarse_to_fine().map(ImageLevel::width).collect();
        assert_eq!(widths, vec![12, 24, 48]);

        let first = pyr.pop_coarsest().expect("level");
        assert_eq!(first.width(), 12);
        assert!(matches!(first, ImageLevel::Samples(_)));
        assert_eq!(pyr.num_levels(), 2);
    }

    #[test]
    fn cancelled_build_is_truncated_without_error() {
        init_logger();
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let cb: ProgressFn = Arc::new(move |current: usize, _total: usize, msg: &str| {
            if msg.contains("pyramid") && current == 1 {
                trigger.cancel();
            }
        });

        let pyr =
            ImagePyramidBuilder::new(smooth_image(128, 128), TransformKind::Affine, Role::Target)
                .expect("non-empty")
                .with_pyramid_depth(5)
                .with_cancel(cancel)
                .with_progress(cb)
                .build();

        assert_eq!(pyr.num_levels(), 1);
        assert!(!pyr.is_complete());
    }

    #[test]
    fn progress_reports_every_level() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressFn = Arc::new(move |current: usize, total: usize, msg: &str| {
            sink.lock().unwrap().push((current, total, msg.to_owned()));
        });

        ImagePyramidBuilder::new(smooth_image(50, 50), TransformKind::Translation, Role::Target)
            .expect("non-empty")
            .with_pyramid_depth(3)
            .with_progress(cb)
            .build();

        let seen = seen.lock().unwrap();
        let level_steps: Vec<usize> = seen
            .iter()
            .filter(|(_, _, m)| m == "Building coefficient pyramid")
            .map(|(c, _, _)| *c)
            .collect();
        assert_eq!(level_steps, vec![0, 1, 2, 2]);
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = ImagePyramidBuilder::new(
            Image::new_fill(0, 4, 0.0f32),
            TransformKind::Affine,
            Role::Source,
        )
        .unwrap_err();
        assert_eq!(err, Error::EmptyImage { width: 0, height: 4 });
    }

    #[test]
    fn strided_views_are_packed() {
        let data = [1.0f32, 2.0, -1.0, 3.0, 4.0, -1.0];
        let view = ImageView::from_slice(2, 2, 3, &data).expect("valid view");
        let pyr = ImagePyramidBuilder::from_view(&view, TransformKind::Affine, Role::Source)
            .expect("non-empty")
            .with_offset(10, 20)
            .build();
        assert_eq!(pyr.image().data(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(pyr.interval().x_offset, 10);
        assert_eq!(pyr.interval().y_offset, 20);
    }
}
