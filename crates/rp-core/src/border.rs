#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BorderMode<T> {
    /// Samples outside the line read as the given value.
    Constant(T),
    /// Half-sample symmetric extension: `c[-1-k] = c[k]`, `c[n+k] = c[n-1-k]`.
    Mirror,
}

/// Maps a possibly out-of-range index onto `0..len`.
///
/// Returns `None` when the border mode supplies a constant instead of a
/// stored sample, or when the line is empty.
pub fn map_index<T>(i: isize, len: usize, mode: &BorderMode<T>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match mode {
        BorderMode::Constant(_) => {
            if i < 0 || i as usize >= len {
                None
            } else {
                Some(i as usize)
            }
        }
        BorderMode::Mirror => {
            let period = (2 * len) as isize;
            let r = i.rem_euclid(period) as usize;
            if r < len { Some(r) } else { Some(2 * len - 1 - r) }
        }
    }
}
