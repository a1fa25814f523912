use log::{debug, warn};
use rp_core::{Error, Interval, Point2d, TransformKind};
use serde::{Deserialize, Serialize};

use crate::table::{LandmarkTable, SOURCE_X, SOURCE_Y, TARGET_X, TARGET_Y};

/// `(sqrt(5) - 1) / 2`, used to inset the default landmark layouts.
pub const GOLDEN_RATIO: f64 = 0.618_033_988_749_894_8;

/// Half-size of the cross drawn for a landmark; also the minimal separation
/// enforced between rigid-body rotation points.
pub const CROSS_HALFSIZE: f64 = 5.0;

const GREEN: [u8; 3] = [0, 128, 0];
const YELLOW: [u8; 3] = [255, 255, 0];
const MAGENTA: [u8; 3] = [255, 0, 255];
const CYAN: [u8; 3] = [0, 255, 255];
const RIGID_SPECTRUM: [[u8; 3]; 3] = [GREEN, [16, 119, 169], [119, 85, 51]];
const SPECTRUM: [[u8; 3]; 4] = [GREEN, YELLOW, MAGENTA, CYAN];

/// One landmark in image coordinates, as handed to a drawing host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPoint {
    pub position: Point2d,
    pub color: [u8; 3],
}

/// Ordered landmark points of one image, in interval-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    interval: Interval,
    kind: TransformKind,
    points: Vec<Point2d>,
    current: usize,
    interactive: bool,
}

impl LandmarkSet {
    /// Default layout for `kind`, first point current.
    pub fn new(kind: TransformKind, interval: Interval) -> Self {
        Self {
            interval,
            kind,
            points: default_layout(kind, interval.width, interval.height),
            current: 0,
            interactive: true,
        }
    }

    /// Restores points from the column pair matching the interval's role.
    ///
    /// Stored values are in image coordinates. A missing table, a row count
    /// that does not match the transformation, or a missing column yields
    /// the default layout. Missing cells leave that coordinate at zero.
    pub fn from_table(
        kind: TransformKind,
        table: Option<&LandmarkTable>,
        interval: Interval,
    ) -> Self {
        let (x_name, y_name) = columns_for(&interval);
        let Some(table) = table else {
            debug!("no landmark table, using the default {kind} layout");
            return Self::new(kind, interval);
        };
        if table.row_count() != kind.point_count() {
            warn!(
                "landmark table has {} rows, {kind} needs {}; using the default layout",
                table.row_count(),
                kind.point_count()
            );
            return Self::new(kind, interval);
        }
        let (Some(xs), Some(ys)) = (table.column(x_name), table.column(y_name)) else {
            warn!("landmark table lacks {x_name}/{y_name}; using the default layout");
            return Self::new(kind, interval);
        };

        let x_off = interval.x_offset as f64;
        let y_off = interval.y_offset as f64;
        let points = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| {
                Point2d::new(x.map_or(0.0, |x| x - x_off), y.map_or(0.0, |y| y - y_off))
            })
            .collect();
        Self {
            interval,
            kind,
            points,
            current: 0,
            interactive: false,
        }
    }

    /// Writes the points, in image coordinates, into this role's columns.
    pub fn write_table(&self, table: &mut LandmarkTable) {
        let (x_name, y_name) = columns_for(&self.interval);
        table.set_row_count(self.points.len());
        let x_off = self.interval.x_offset as f64;
        let y_off = self.interval.y_offset as f64;
        for (row, p) in self.points.iter().enumerate() {
            table.set(x_name, row, p.x + x_off);
            table.set(y_name, row, p.y + y_off);
        }
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn transform(&self) -> TransformKind {
        self.kind
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Point2d] {
        &self.points
    }

    /// The current point.
    pub fn point(&self) -> Point2d {
        self.points[self.current]
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// `false` once points were set in bulk or restored from a table.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn set_current_point(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.points.len() {
            return Err(Error::PointIndex {
                index,
                count: self.points.len(),
            });
        }
        self.current = index;
        Ok(())
    }

    /// Replaces all points without clipping. `points` must hold one point
    /// per landmark; otherwise the set is left untouched.
    pub fn set_points(&mut self, points: &[Point2d]) -> Result<(), Error> {
        if points.len() != self.points.len() {
            return Err(Error::SizeMismatch {
                expected: self.points.len(),
                actual: points.len(),
            });
        }
        self.points.copy_from_slice(points);
        self.interactive = false;
        Ok(())
    }

    /// Moves the current point, clipped to the interval.
    ///
    /// For a rigid body the two rotation points must stay apart and must not
    /// land on each other's mirror image about the center point; a move that
    /// breaks either constraint leaves the point where it was.
    pub fn move_point(&mut self, x: f64, y: f64) {
        self.interactive = true;
        let p = Point2d::new(self.interval.clip_x(x), self.interval.clip_y(y));
        if self.kind == TransformKind::RigidBody && self.current != 0 {
            let center = self.points[0];
            let other = self.points[3 - self.current];
            let mirror = Point2d::new(2.0 * center.x - other.x, 2.0 * center.y - other.y);
            if 0.5 * p.distance(other) <= CROSS_HALFSIZE || p.distance(mirror) <= CROSS_HALFSIZE {
                debug!("rejected degenerate rigid-body move to ({:.2}, {:.2})", p.x, p.y);
                return;
            }
        }
        self.points[self.current] = p;
    }

    /// Switches to `kind` with its default layout.
    pub fn set_transformation(&mut self, kind: TransformKind) {
        self.kind = kind;
        self.points = default_layout(kind, self.interval.width, self.interval.height);
        self.current = 0;
        self.interactive = true;
    }

    /// Index of the point nearest to `(x, y)`.
    pub fn find_closest(&self, x: f64, y: f64) -> usize {
        let target = Point2d::new(x, y);
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, p) in self.points.iter().enumerate() {
            let d = p.distance(target);
            if d < best_d {
                best = i;
                best_d = d;
            }
        }
        best
    }

    /// Makes the point nearest to `(x, y)` current and returns its index.
    pub fn select_closest(&mut self, x: f64, y: f64) -> usize {
        self.current = self.find_closest(x, y);
        self.current
    }

    pub fn overlay_color(&self, index: usize) -> [u8; 3] {
        if self.kind == TransformKind::RigidBody {
            RIGID_SPECTRUM[index % RIGID_SPECTRUM.len()]
        } else {
            SPECTRUM[index % SPECTRUM.len()]
        }
    }

    /// Points in image coordinates with their display colors.
    pub fn overlay_points(&self) -> Vec<OverlayPoint> {
        let x_off = self.interval.x_offset as f64;
        let y_off = self.interval.y_offset as f64;
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| OverlayPoint {
                position: Point2d::new(p.x + x_off, p.y + y_off),
                color: self.overlay_color(i),
            })
            .collect()
    }
}

fn columns_for(interval: &Interval) -> (&'static str, &'static str) {
    if interval.is_target() {
        (TARGET_X, TARGET_Y)
    } else {
        (SOURCE_X, SOURCE_Y)
    }
}

/// Initial landmark positions for `kind` in a `width x height` image.
pub fn default_layout(kind: TransformKind, width: usize, height: usize) -> Vec<Point2d> {
    let (w, h) = (width as f64, height as f64);
    let x_mid = 0.5 * w;
    let y_mid = 0.5 * h;
    let x_min = 0.25 * GOLDEN_RATIO * w;
    let y_min = 0.25 * GOLDEN_RATIO * h;
    let x_max = w - x_min;
    let y_max = h - y_min;
    let p = Point2d::new;
    match kind {
        TransformKind::Translation => vec![p(x_mid, y_mid)],
        TransformKind::RigidBody => vec![p(x_mid, y_mid), p(x_mid, y_min), p(x_mid, y_max)],
        TransformKind::ScaledRotation => vec![p(x_min, y_mid), p(x_max, y_mid)],
        TransformKind::Affine => vec![p(x_mid, y_min), p(x_min, y_max), p(x_max, y_max)],
        TransformKind::Bilinear => vec![
            p(x_min, y_min),
            p(x_min, y_max),
            p(x_max, y_min),
            p(x_max, y_max),
        ],
    }
}

#[cfg(test)]
mod tests {
    use rp_core::{Error, Interval, Point2d, Role, TransformKind};

    use super::{CROSS_HALFSIZE, GOLDEN_RATIO, LandmarkSet, default_layout};
    use crate::table::{LandmarkTable, SOURCE_X, SOURCE_Y, TARGET_X, TARGET_Y};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn close(a: Point2d, b: Point2d) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn golden_ratio_constant() {
        assert!((GOLDEN_RATIO - 0.5 * (5f64.sqrt() - 1.0)).abs() < 1e-15);
    }

    #[test]
    fn rigid_body_default_layout() {
        let pts = default_layout(TransformKind::RigidBody, 100, 100);
        let q = 25.0 * GOLDEN_RATIO;
        assert_eq!(pts.len(), 3);
        assert!(close(pts[0], Point2d::new(50.0, 50.0)));
        assert!(close(pts[1], Point2d::new(50.0, q)));
        assert!(close(pts[2], Point2d::new(50.0, 100.0 - q)));
    }

    #[test]
    fn layouts_match_point_counts() {
        for kind in TransformKind::ALL {
            assert_eq!(default_layout(kind, 64, 48).len(), kind.point_count(), "{kind}");
        }
    }

    #[test]
    fn rigid_body_rejects_mirror_of_other_point() {
        init();
        let interval = Interval::new(100, 100, Role::Source);
        let mut set = LandmarkSet::new(TransformKind::RigidBody, interval);
        set.set_current_point(1).unwrap();
        let before = set.point();

        // Point 2 mirrored about (50, 50) is point 1's default position.
        let mirror = Point2d::new(100.0 - set.points()[2].x, 100.0 - set.points()[2].y);
        set.move_point(mirror.x + 2.0, mirror.y + 3.0);
        assert!(close(set.point(), before));

        // Too close to point 2 itself.
        let other = set.points()[2];
        set.move_point(other.x + 4.0, other.y);
        assert!(close(set.point(), before));

        set.move_point(20.0, 30.0);
        assert!(close(set.point(), Point2d::new(20.0, 30.0)));
        assert!(set.is_interactive());
    }

    #[test]
    fn rigid_body_accepts_far_moves_and_center_moves() {
        let interval = Interval::new(100, 100, Role::Target);
        let mut set = LandmarkSet::new(TransformKind::RigidBody, interval);
        set.move_point(52.0, 51.0);
        assert!(close(set.point(), Point2d::new(52.0, 51.0)));

        set.set_current_point(2).unwrap();
        set.move_point(50.0 + 3.0 * CROSS_HALFSIZE, 90.0);
        assert!(close(set.point(), Point2d::new(65.0, 90.0)));
    }

    #[test]
    fn move_point_clips_to_interval() {
        let interval = Interval::new(40, 30, Role::Source).with_offset(10, 5);
        let mut set = LandmarkSet::new(TransformKind::Translation, interval);
        set.move_point(-3.0, 100.0);
        assert!(close(set.point(), Point2d::new(10.0, 35.0)));
    }

    #[test]
    fn set_points_does_not_clip() {
        let interval = Interval::new(20, 20, Role::Source);
        let mut set = LandmarkSet::new(TransformKind::ScaledRotation, interval);
        let pts = [Point2d::new(-5.0, 1.0), Point2d::new(40.0, 2.0)];
        set.set_points(&pts).unwrap();
        assert_eq!(set.points(), &pts);
        assert!(!set.is_interactive());
    }

    #[test]
    fn set_points_rejects_wrong_count() {
        let interval = Interval::new(60, 60, Role::Target);
        let mut set = LandmarkSet::new(TransformKind::Affine, interval);
        let before = set.points().to_vec();
        let err = set.set_points(&[Point2d::new(1.0, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            Error::SizeMismatch {
                expected: 3,
                actual: 1
            }
        );
        assert_eq!(set.points(), before.as_slice());
        assert!(set.is_interactive());
    }

    #[test]
    fn current_point_out_of_range() {
        let interval = Interval::new(20, 20, Role::Source);
        let mut set = LandmarkSet::new(TransformKind::Affine, interval);
        assert_eq!(set.set_current_point(3), Err(Error::PointIndex { index: 3, count: 3 }));
        assert_eq!(set.current(), 0);
    }

    #[test]
    fn set_transformation_resets_layout() {
        let interval = Interval::new(80, 60, Role::Source);
        let mut set = LandmarkSet::new(TransformKind::Affine, interval);
        set.set_current_point(2).unwrap();
        set.set_transformation(TransformKind::Bilinear);
        assert_eq!(set.current(), 0);
        assert_eq!(set.points(), default_layout(TransformKind::Bilinear, 80, 60).as_slice());
    }

    #[test]
    fn select_closest_picks_nearest() {
        let interval = Interval::new(100, 100, Role::Source);
        let mut set = LandmarkSet::new(TransformKind::Bilinear, interval);
        assert_eq!(set.select_closest(90.0, 12.0), 2);
        assert_eq!(set.current(), 2);
    }

    #[test]
    fn table_round_trip_applies_offsets() {
        init();
        let source = Interval::new(50, 50, Role::Source).with_offset(7, 3);
        let target = Interval::new(50, 50, Role::Target).with_offset(1, 2);
        let mut table = LandmarkTable::new();

        let mut src = LandmarkSet::new(TransformKind::Affine, source);
        src.set_points(&[
            Point2d::new(1.0, 2.0),
            Point2d::new(3.0, 4.0),
            Point2d::new(5.0, 6.0),
        ])
        .unwrap();
        src.write_table(&mut table);
        LandmarkSet::new(TransformKind::Affine, target).write_table(&mut table);

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.get(SOURCE_X, 0), Some(8.0));
        assert_eq!(table.get(SOURCE_Y, 2), Some(9.0));
        assert!(table.get(TARGET_X, 0).is_some());

        let restored = LandmarkSet::from_table(TransformKind::Affine, Some(&table), source);
        assert_eq!(restored.points(), src.points());
        assert!(!restored.is_interactive());
    }

    #[test]
    fn table_mismatch_falls_back_to_default() {
        init();
        let interval = Interval::new(60, 40, Role::Target);
        let default = default_layout(TransformKind::RigidBody, 60, 40);

        let short = LandmarkTable::with_landmark_columns(2);
        let set = LandmarkSet::from_table(TransformKind::RigidBody, Some(&short), interval);
        assert_eq!(set.points(), default.as_slice());

        let mut missing = LandmarkTable::new();
        missing.set(SOURCE_X, 2, 1.0);
        missing.set(SOURCE_Y, 2, 1.0);
        let set = LandmarkSet::from_table(TransformKind::RigidBody, Some(&missing), interval);
        assert_eq!(set.points(), default.as_slice());

        let set = LandmarkSet::from_table(TransformKind::RigidBody, None, interval);
        assert_eq!(set.points(), default.as_slice());
    }

    #[test]
    fn missing_cells_read_as_zero() {
        let interval = Interval::new(60, 40, Role::Target).with_offset(10, 10);
        let mut table = LandmarkTable::with_landmark_columns(1);
        table.set(TARGET_X, 0, 25.0);
        let set = LandmarkSet::from_table(TransformKind::Translation, Some(&table), interval);
        assert!(close(set.point(), Point2d::new(15.0, 0.0)));
    }

    #[test]
    fn overlay_points_are_global_and_colored() {
        let interval = Interval::new(100, 100, Role::Source).with_offset(5, 6);
        let set = LandmarkSet::new(TransformKind::RigidBody, interval);
        let overlay = set.overlay_points();
        assert_eq!(overlay.len(), 3);
        assert!(close(overlay[0].position, Point2d::new(55.0, 56.0)));
        assert_eq!(overlay[0].color, [0, 128, 0]);
        assert_eq!(overlay[1].color, [16, 119, 169]);

        let set = LandmarkSet::new(TransformKind::Bilinear, interval);
        assert_eq!(set.overlay_color(3), [0, 255, 255]);
    }
}
