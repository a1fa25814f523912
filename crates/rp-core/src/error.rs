#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("out of bounds")]
    OutOfBounds,
    #[error("invalid stride")]
    InvalidStride,
    #[error("empty image: {width}x{height}")]
    EmptyImage { width: usize, height: usize },
    #[error("The display doesn't have an active dataset (image)")]
    NoActiveImage,
    #[error("unknown transformation '{0}'")]
    UnknownTransform(String),
    #[error("point index {index} out of range for {count} points")]
    PointIndex { index: usize, count: usize },
    #[error("malformed table at line {line}: {reason}")]
    MalformedTable { line: usize, reason: String },
}
