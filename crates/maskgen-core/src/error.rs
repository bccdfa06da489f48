use thiserror::Error;

/// Failures reported by the pattern-composition engine.
///
/// Every operation either completes or returns one of these before any
/// partial geometry reaches the caller's pattern.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    /// A count, step or pitch that is nonsensical or would never terminate.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A primitive was requested with a non-positive or non-finite size.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The boolean compositor could not resolve its input.
    #[error("Geometry operation failed: {0}")]
    GeometryOpFailed(String),

    /// A pattern with this name is already registered in the library.
    #[error("Pattern '{0}' is already defined")]
    DuplicateName(String),

    /// A pattern was looked up or referenced but is not registered.
    #[error("Pattern '{0}' referenced but not defined")]
    UnknownPattern(String),
}

pub type Result<T> = std::result::Result<T, PatternError>;

/// Fail with `InvalidParameter` unless `count` is at least one.
pub(crate) fn require_count(what: &str, count: usize) -> Result<()> {
    if count == 0 {
        return Err(PatternError::InvalidParameter(format!(
            "{what} must be at least 1"
        )));
    }
    Ok(())
}

/// Element count of a `count_x` by `count_y` grid, failing on overflow.
pub(crate) fn grid_size(what: &str, count_x: usize, count_y: usize) -> Result<usize> {
    count_x.checked_mul(count_y).ok_or_else(|| {
        PatternError::InvalidParameter(format!("{what} of {count_x} x {count_y} is too large"))
    })
}

/// Fail with `InvalidParameter` if any of the given values is NaN or infinite.
pub(crate) fn require_finite(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(PatternError::InvalidParameter(format!(
            "{what} must be finite, got {values:?}"
        )));
    }
    Ok(())
}
