use serde::{Deserialize, Serialize};

/// Minimal linear dimension of an image at the coarsest pyramid level.
pub const MIN_SIZE: usize = 12;

/// Which side of the registration an interval belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Target,
}

impl Role {
    pub fn is_target(self) -> bool {
        matches!(self, Role::Target)
    }
}

/// Geometry shared by image and mask pyramids.
///
/// `pyramid_depth` counts the full-size level, which is never stored in a
/// pyramid, so a complete pyramid holds `pyramid_depth - 1` reduced levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub width: usize,
    pub height: usize,
    pub x_offset: i64,
    pub y_offset: i64,
    pub pyramid_depth: usize,
    pub role: Role,
}

impl Interval {
    pub fn new(width: usize, height: usize, role: Role) -> Self {
        Self {
            width,
            height,
            x_offset: 0,
            y_offset: 0,
            pyramid_depth: 1,
            role,
        }
    }

    pub fn with_offset(mut self, x_offset: i64, y_offset: i64) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    pub fn with_pyramid_depth(mut self, pyramid_depth: usize) -> Self {
        self.pyramid_depth = pyramid_depth.max(1);
        self
    }

    pub fn is_target(&self) -> bool {
        self.role.is_target()
    }

    /// Number of reduced levels a complete pyramid holds.
    pub fn reduced_levels(&self) -> usize {
        self.pyramid_depth.saturating_sub(1)
    }

    pub fn clip_x(&self, x: f64) -> f64 {
        let lo = self.x_offset as f64;
        let hi = lo + self.width as f64;
        if x < lo { lo } else if x > hi { hi } else { x }
    }

    pub fn clip_y(&self, y: f64) -> f64 {
        let lo = self.y_offset as f64;
        let hi = lo + self.height as f64;
        if y < lo { lo } else if y > hi { hi } else { y }
    }
}

/// Shared pyramid depth for a source/target pair.
///
/// Starts at 1 and, while every dimension of both images is at least
/// `2 * MIN_SIZE`, halves all four dimensions and adds a level.
pub fn pyramid_depth(source: (usize, usize), target: (usize, usize)) -> usize {
    let (mut sw, mut sh) = source;
    let (mut tw, mut th) = target;
    let mut depth = 1;
    while 2 * MIN_SIZE <= sw && 2 * MIN_SIZE <= sh && 2 * MIN_SIZE <= tw && 2 * MIN_SIZE <= th {
        sw /= 2;
        sh /= 2;
        tw /= 2;
        th /= 2;
        depth += 1;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::{Interval, MIN_SIZE, Role, pyramid_depth};

    #[test]
    fn depth_counts_halvings_above_min_size() {
        assert_eq!(pyramid_depth((24, 24), (24, 24)), 2);
        assert_eq!(pyramid_depth((48, 48), (48, 48)), 3);
        assert_eq!(pyramid_depth((100, 100), (100, 100)), 4);
        assert_eq!(pyramid_depth((512, 384), (512, 384)), 6);
    }

    #[test]
    fn depth_is_limited_by_smallest_dimension() {
        assert_eq!(pyramid_depth((2 * MIN_SIZE - 1, 500), (500, 500)), 1);
        assert_eq!(pyramid_depth((500, 500), (500, 23)), 1);
        assert_eq!(pyramid_depth((1000, 1000), (50, 1000)), 3);
    }

    #[test]
    fn clip_holds_to_offset_extent() {
        let iv = Interval::new(10, 20, Role::Source).with_offset(5, -3);
        assert_eq!(iv.clip_x(0.0), 5.0);
        assert_eq!(iv.clip_x(15.0), 15.0);
        assert_eq!(iv.clip_x(15.5), 15.0);
        assert_eq!(iv.clip_y(-10.0), -3.0);
        assert_eq!(iv.clip_y(4.25), 4.25);
        assert_eq!(iv.clip_y(30.0), 17.0);
    }

    #[test]
    fn depth_is_never_below_one() {
        let iv = Interval::new(4, 4, Role::Target).with_pyramid_depth(0);
        assert_eq!(iv.pyramid_depth, 1);
        assert_eq!(iv.reduced_levels(), 0);
        assert!(iv.is_target());
    }
}
