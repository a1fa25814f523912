use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use log::{debug, info};
use regprep::spline::{SplineDegree, coefficients_to_samples_2d};
use regprep::{
    CROSS_HALFSIZE, Image, ImageLevel, ImagePyramidBuilder, Interval, LandmarkSet, LandmarkTable,
    MaskPyramid, MaskPyramidBuilder, MaskReduction, MemoryDisplay, Overlay, OverlayPoint,
    PixelRegion, Preparation, PrepareOptions, ProgressFn, RectRegion, Region, Role,
    SelectionRect, TransformKind, pyramid_depth, to_f32, to_f32_u16,
};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(name = "rp_prep")]
#[command(about = "Build registration pyramids, masks and landmarks from image files")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(name = "pyramid")]
    Pyramid(PyramidArgs),
    #[command(name = "mask")]
    Mask(MaskArgs),
    #[command(name = "landmarks")]
    Landmarks(LandmarkArgs),
    #[command(name = "prepare")]
    Prepare(PrepareArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum RoleArg {
    Source,
    Target,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Source => Role::Source,
            RoleArg::Target => Role::Target,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ReductionArg {
    #[value(name = "block2x2")]
    Block2x2,
    #[value(name = "overlapping3x3")]
    Overlapping3x3,
}

impl From<ReductionArg> for MaskReduction {
    fn from(reduction: ReductionArg) -> Self {
        match reduction {
            ReductionArg::Block2x2 => MaskReduction::Block2x2,
            ReductionArg::Overlapping3x3 => MaskReduction::Overlapping3x3,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct PyramidArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long, default_value = "out/pyramid")]
    out: PathBuf,
    #[arg(long, default_value_t = TransformKind::RigidBody)]
    transform: TransformKind,
    #[arg(long, value_enum, default_value_t = RoleArg::Target)]
    role: RoleArg,
    /// Pyramid depth; by default the depth of the image paired with itself.
    #[arg(long)]
    depth: Option<usize>,
}

#[derive(Args, Debug, Clone)]
struct MaskArgs {
    /// Mask image; nonzero pixels are inside. Also fixes the mask size.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    /// Rectangle `x,y,width,height`; repeatable.
    #[arg(long = "rect", value_parser = parse_rect)]
    rects: Vec<RectRegion>,
    #[arg(long, value_enum, default_value_t = ReductionArg::Block2x2)]
    reduction: ReductionArg,
    #[arg(long)]
    depth: Option<usize>,
    #[arg(long, default_value = "out/mask")]
    out: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct LandmarkArgs {
    #[arg(long, default_value_t = TransformKind::RigidBody)]
    transform: TransformKind,
    #[arg(long, required = true)]
    width: usize,
    #[arg(long, required = true)]
    height: usize,
    #[arg(long, default_value_t = 0)]
    x_offset: i64,
    #[arg(long, default_value_t = 0)]
    y_offset: i64,
    #[arg(long, value_enum, default_value_t = RoleArg::Source)]
    role: RoleArg,
    /// Table to restore the points from; other columns are kept.
    #[arg(long)]
    table: Option<PathBuf>,
    /// Move a point, `index:x,y` in image coordinates; repeatable.
    #[arg(long = "move", value_parser = parse_move)]
    moves: Vec<PointMove>,
    #[arg(long, required = true)]
    out: PathBuf,
    /// Draw the points onto this image and save it next to `out`.
    #[arg(long)]
    draw_on: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct PrepareArgs {
    #[arg(long, required = true)]
    source: PathBuf,
    #[arg(long, required = true)]
    target: PathBuf,
    #[arg(long)]
    source_mask: Option<PathBuf>,
    #[arg(long)]
    target_mask: Option<PathBuf>,
    /// Selection on the source, `x,y,width,height`.
    #[arg(long, value_parser = parse_selection)]
    source_selection: Option<SelectionRect>,
    #[arg(long, value_parser = parse_selection)]
    target_selection: Option<SelectionRect>,
    #[arg(long)]
    landmarks: Option<PathBuf>,
    /// JSON options; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    transform: Option<TransformKind>,
    #[arg(long, value_enum)]
    reduction: Option<ReductionArg>,
    #[arg(long, default_value = "out/prepare")]
    out: PathBuf,
}

#[derive(Debug, Clone)]
struct PointMove {
    index: usize,
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Serialize)]
struct MetaPyramid {
    transform: TransformKind,
    role: Role,
    shape: String,
    pyramid_depth: usize,
    built_levels: usize,
    level_sizes: Vec<[usize; 2]>,
    policy: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct MetaMask {
    reduction: MaskReduction,
    width: usize,
    height: usize,
    pyramid_depth: usize,
    regions: usize,
    coverage: f32,
    level_sizes: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, Serialize)]
struct PyramidSummary {
    role: Role,
    shape: String,
    width: usize,
    height: usize,
    x_offset: i64,
    y_offset: i64,
    level_sizes: Vec<[usize; 2]>,
    complete: bool,
}

#[derive(Debug, Clone, Serialize)]
struct MaskSummary {
    width: usize,
    height: usize,
    coverage: f32,
    level_sizes: Vec<[usize; 2]>,
    complete: bool,
}

#[derive(Debug, Clone, Serialize)]
struct PrepareSummary {
    options: PrepareOptions,
    pyramid_depth: usize,
    source: PyramidSummary,
    target: PyramidSummary,
    source_mask: MaskSummary,
    target_mask: MaskSummary,
    landmarks: Overlay,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Pyramid(args) => run_pyramid(args),
        Command::Mask(args) => run_mask(args),
        Command::Landmarks(args) => run_landmarks(args),
        Command::Prepare(args) => run_prepare(args),
    }
}

fn run_pyramid(args: PyramidArgs) -> Result<()> {
    ensure_file_exists(&args.input, "input")?;
    create_out_dir(&args.out)?;
    let img = load_input_f32(&args.input)?;
    let (w, h) = (img.width(), img.height());
    let depth = args.depth.unwrap_or_else(|| pyramid_depth((w, h), (w, h)));

    let pyr = ImagePyramidBuilder::new(img, args.transform, args.role.into())
        .with_context(|| format!("building pyramid of {}", args.input.display()))?
        .with_pyramid_depth(depth)
        .build();

    let mut sizes = Vec::new();
    for (i, level) in pyr.levels().iter().enumerate() {
        sizes.push([level.width(), level.height()]);
        save_f32_vis(args.out.join(format!("level_{i}.png")), &level_samples(level))?;
        if let Some(g) = level.gradients() {
            save_f32_vis(args.out.join(format!("level_{i}_gx.png")), &g.x)?;
            save_f32_vis(args.out.join(format!("level_{i}_gy.png")), &g.y)?;
        }
    }
    info!("wrote {} levels to {}", sizes.len(), args.out.display());

    write_json(
        args.out.join("meta.json"),
        &MetaPyramid {
            transform: args.transform,
            role: args.role.into(),
            shape: format!("{:?}", pyr.shape()),
            pyramid_depth: depth,
            built_levels: pyr.num_levels(),
            level_sizes: sizes,
            policy: "septic dual reduction, drop-odd dimensions",
        },
    )
}

fn run_mask(args: MaskArgs) -> Result<()> {
    create_out_dir(&args.out)?;
    let mut pixel_region = None;
    let (w, h) = match &args.input {
        Some(path) => {
            ensure_file_exists(path, "mask")?;
            let (w, h, region) = load_mask_region(path)?;
            pixel_region = Some(region);
            (w, h)
        }
        None => match (args.width, args.height) {
            (Some(w), Some(h)) => (w, h),
            _ => bail!("mask needs either --input or both --width and --height."),
        },
    };
    let depth = args.depth.unwrap_or_else(|| pyramid_depth((w, h), (w, h)));

    let mut builder = MaskPyramidBuilder::new(w, h, Role::Target)
        .context("creating mask builder")?
        .with_pyramid_depth(depth)
        .with_reduction(args.reduction.into());
    let mut regions: Vec<&dyn Region> = args.rects.iter().map(|r| r as &dyn Region).collect();
    if let Some(region) = &pixel_region {
        regions.push(region);
    }
    builder.set_regions(&regions);
    let pyr = builder.build();

    save_f32_vis(args.out.join("mask.png"), pyr.mask())?;
    for (i, level) in pyr.levels().iter().enumerate() {
        save_f32_vis(args.out.join(format!("level_{i}.png")), level)?;
    }

    write_json(
        args.out.join("meta.json"),
        &MetaMask {
            reduction: args.reduction.into(),
            width: w,
            height: h,
            pyramid_depth: depth,
            regions: regions.len(),
            coverage: coverage(pyr.mask()),
            level_sizes: mask_level_sizes(&pyr),
        },
    )
}

fn run_landmarks(args: LandmarkArgs) -> Result<()> {
    let mut table = match &args.table {
        Some(path) => {
            ensure_file_exists(path, "table")?;
            read_table(path)?
        }
        None => LandmarkTable::new(),
    };

    let interval = Interval::new(args.width, args.height, args.role.into())
        .with_offset(args.x_offset, args.y_offset);
    let mut set = LandmarkSet::from_table(
        args.transform,
        args.table.is_some().then_some(&table),
        interval,
    );
    for m in &args.moves {
        set.set_current_point(m.index)
            .with_context(|| format!("selecting landmark {}", m.index))?;
        // Moves are clipped against the offset interval.
        set.move_point(m.x, m.y);
        debug!("landmark {} now at {:?}", m.index, set.point());
    }

    set.write_table(&mut table);
    write_table(&args.out, &table)?;
    info!("wrote {} {} landmarks to {}", set.point_count(), set.transform(), args.out.display());

    if let Some(path) = &args.draw_on {
        ensure_file_exists(path, "image")?;
        let img = load_input_f32(path)?;
        let rgb = render_overlay(&img, &set.overlay_points())?;
        let png = args.out.with_extension("png");
        rgb.save(&png).with_context(|| format!("saving overlay {}", png.display()))?;
    }
    Ok(())
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    ensure_file_exists(&args.source, "source")?;
    ensure_file_exists(&args.target, "target")?;
    create_out_dir(&args.out)?;

    let mut options = match &args.config {
        Some(path) => read_json::<PrepareOptions>(path)?,
        None => PrepareOptions::default(),
    };
    if let Some(transform) = args.transform {
        options.transform = transform;
    }
    if let Some(reduction) = args.reduction {
        options.mask_reduction = reduction.into();
    }

    let source = load_display(&args.source, args.source_mask.as_deref(), args.source_selection)?;
    let target = load_display(&args.target, args.target_mask.as_deref(), args.target_selection)?;
    let mut table = match &args.landmarks {
        Some(path) => {
            ensure_file_exists(path, "landmarks")?;
            Some(read_table(path)?)
        }
        None => None,
    };

    let progress: ProgressFn = Arc::new(|current: usize, total: usize, message: &str| {
        debug!("{message}: {current}/{total}");
    });
    let prepared = Preparation::new(options)
        .with_progress(progress)
        .prepare(&source, &target, table.as_ref())
        .context("preparing pyramids")?;

    let table = table.get_or_insert_with(LandmarkTable::new);
    prepared.source_landmarks.write_table(table);
    prepared.target_landmarks.write_table(table);
    write_table(&args.out.join("landmarks.csv"), table)?;

    let overlay = prepared.overlay();
    for (name, display, points) in [
        ("source", &source, &overlay.source),
        ("target", &target, &overlay.target),
    ] {
        if let Some(plane) = display.plane() {
            let path = args.out.join(format!("overlay_{name}.png"));
            render_overlay(plane, points)?
                .save(&path)
                .with_context(|| format!("saving overlay {}", path.display()))?;
        }
    }

    write_json(
        args.out.join("summary.json"),
        &PrepareSummary {
            options,
            pyramid_depth: prepared.pyramid_depth(),
            source: pyramid_summary(&prepared.source),
            target: pyramid_summary(&prepared.target),
            source_mask: mask_summary(&prepared.source_mask),
            target_mask: mask_summary(&prepared.target_mask),
            landmarks: overlay,
        },
    )
}

fn load_display(
    path: &Path,
    mask: Option<&Path>,
    selection: Option<SelectionRect>,
) -> Result<MemoryDisplay> {
    let mut display = MemoryDisplay::new(load_input_f32(path)?);
    if let Some(sel) = selection {
        display = display.with_selection(sel);
    }
    if let Some(mask) = mask {
        ensure_file_exists(mask, "mask")?;
        let (_, _, region) = load_mask_region(mask)?;
        display = display.with_region(region);
    }
    Ok(display)
}

fn pyramid_summary(pyr: &regprep::ImagePyramid) -> PyramidSummary {
    let interval = pyr.interval();
    PyramidSummary {
        role: interval.role,
        shape: format!("{:?}", pyr.shape()),
        width: interval.width,
        height: interval.height,
        x_offset: interval.x_offset,
        y_offset: interval.y_offset,
        level_sizes: pyr.levels().iter().map(|l| [l.width(), l.height()]).collect(),
        complete: pyr.is_complete(),
    }
}

fn mask_summary(pyr: &MaskPyramid) -> MaskSummary {
    MaskSummary {
        width: pyr.mask().width(),
        height: pyr.mask().height(),
        coverage: coverage(pyr.mask()),
        level_sizes: mask_level_sizes(pyr),
        complete: pyr.is_complete(),
    }
}

fn mask_level_sizes(pyr: &MaskPyramid) -> Vec<[usize; 2]> {
    pyr.levels().iter().map(|m| [m.width(), m.height()]).collect()
}

fn coverage(mask: &Image<f32>) -> f32 {
    if mask.is_empty() {
        return 0.0;
    }
    mask.data().iter().filter(|&&v| v != 0.0).count() as f32 / mask.len() as f32
}

/// Samples of a level; coefficient levels are evaluated at the integers.
fn level_samples(level: &ImageLevel) -> Image<f32> {
    match (level.samples(), level.coefficients()) {
        (Some(samples), _) => samples.clone(),
        (None, Some(c)) => {
            let mut samples = c.clone();
            coefficients_to_samples_2d(&mut samples, SplineDegree::Septic);
            samples
        }
        (None, None) => Image::new_fill(level.width(), level.height(), 0.0),
    }
}

fn parse_rect(s: &str) -> Result<RectRegion, String> {
    let v = parse_numbers::<4>(s)?;
    if v[2] < 0.0 || v[3] < 0.0 {
        return Err(format!("negative rectangle size in '{s}'"));
    }
    Ok(RectRegion {
        x: v[0] as i64,
        y: v[1] as i64,
        width: v[2] as usize,
        height: v[3] as usize,
    })
}

fn parse_selection(s: &str) -> Result<SelectionRect, String> {
    let [x, y, width, height] = parse_numbers::<4>(s)?;
    Ok(SelectionRect {
        x,
        y,
        width,
        height,
    })
}

fn parse_move(s: &str) -> Result<PointMove, String> {
    let (index, xy) = s
        .split_once(':')
        .ok_or_else(|| format!("expected index:x,y, got '{s}'"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("landmark index '{index}': {e}"))?;
    let [x, y] = parse_numbers::<2>(xy)?;
    Ok(PointMove { index, x, y })
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated numbers, got '{s}'"));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|e| format!("'{part}': {e}"))?;
    }
    Ok(out)
}

fn load_input_f32(path: &Path) -> Result<Image<f32>> {
    let dyn_img =
        image::open(path).with_context(|| format!("opening input image {}", path.display()))?;
    let wide = matches!(
        dyn_img,
        DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_)
    );

    if wide {
        let luma = dyn_img.to_luma16();
        let (w, h) = luma.dimensions();
        let img = Image::from_vec(w as usize, h as usize, luma.into_raw())
            .with_context(|| format!("constructing image from {}", path.display()))?;
        Ok(to_f32_u16(&img.as_view()))
    } else {
        let luma = dyn_img.to_luma8();
        let (w, h) = luma.dimensions();
        let img = Image::from_vec(w as usize, h as usize, luma.into_raw())
            .with_context(|| format!("constructing image from {}", path.display()))?;
        Ok(to_f32(&img.as_view()))
    }
}

/// Nonzero pixels of a mask image, with the image size.
fn load_mask_region(path: &Path) -> Result<(usize, usize, PixelRegion)> {
    let luma = image::open(path)
        .with_context(|| format!("opening mask image {}", path.display()))?
        .to_luma8();
    let (w, h) = luma.dimensions();
    let pixels = luma
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] != 0)
        .map(|(x, y, _)| (x as i64, y as i64))
        .collect();
    Ok((w as usize, h as usize, PixelRegion { pixels }))
}

fn render_overlay(img: &Image<f32>, points: &[OverlayPoint]) -> Result<RgbImage> {
    let vis = f32_to_u8_vis(img.data());
    let gray = GrayImage::from_raw(img.width() as u32, img.height() as u32, vis)
        .context("constructing GrayImage from raw bytes")?;
    let mut rgb = DynamicImage::ImageLuma8(gray).to_rgb8();
    for p in points {
        draw_cross(&mut rgb, p.position.x, p.position.y, Rgb(p.color));
    }
    Ok(rgb)
}

fn draw_cross(img: &mut RgbImage, x: f64, y: f64, color: Rgb<u8>) {
    let xi = x.round() as i64;
    let yi = y.round() as i64;
    let half = CROSS_HALFSIZE as i64;

    for d in -half..=half {
        for (nx, ny) in [(xi + d, yi), (xi, yi + d)] {
            if nx < 0 || ny < 0 {
                continue;
            }
            let (ux, uy) = (nx as u32, ny as u32);
            if ux >= img.width() || uy >= img.height() {
                continue;
            }
            img.put_pixel(ux, uy, color);
        }
    }
}

fn save_f32_vis(path: PathBuf, img: &Image<f32>) -> Result<()> {
    let vis = f32_to_u8_vis(img.data());
    let gray = GrayImage::from_raw(img.width() as u32, img.height() as u32, vis)
        .context("constructing GrayImage from raw bytes")?;
    gray.save(&path)
        .with_context(|| format!("saving image {}", path.display()))
}

fn f32_to_u8_vis(data: &[f32]) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }

    let mut min_v = f32::INFINITY;
    let mut max_v = f32::NEG_INFINITY;
    for &v in data {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }

    if (max_v - min_v).abs() < 1e-12 {
        let fill = if max_v > 0.0 { 255 } else { 0 };
        return vec![fill; data.len()];
    }

    let scale = 255.0 / (max_v - min_v);
    data.iter()
        .map(|&v| ((v - min_v) * scale).round().clamp(0.0, 255.0) as u8)
        .collect()
}

fn write_json(path: PathBuf, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(&path, bytes).with_context(|| format!("writing json {}", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing json {}", path.display()))
}

fn read_table(path: &Path) -> Result<LandmarkTable> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading table {}", path.display()))?;
    LandmarkTable::from_csv(&text)
        .with_context(|| format!("parsing landmark table {}", path.display()))
}

fn write_table(path: &Path, table: &LandmarkTable) -> Result<()> {
    fs::write(path, table.to_csv()).with_context(|| format!("writing table {}", path.display()))
}

fn create_out_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))
}

fn ensure_file_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} file does not exist: {}", what, path.display());
    }
    if !path.is_file() {
        bail!("{} path is not a file: {}", what, path.display());
    }
    Ok(())
}
