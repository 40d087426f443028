//! The fatal error type of the front end.

use thiserror::Error;

use crate::Location;

/// A compilation error: a location and a human-readable message.
///
/// Rendered as `filename:lineno: message`, which is exactly what the
/// driver prints to stderr.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{location}: {message}")]
pub struct CompileError {
    /// Where the error was detected.
    pub location: Location,

    /// The message, with all substitutions already performed.
    pub message: String,
}

impl CompileError {
    /// Creates an error at the given location.
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// Result type used by every fallible front-end operation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Fails the current function with a formatted [`CompileError`].
///
/// ```
/// use veldc_util::{fail, CompileResult, Location};
///
/// fn check(n: i64, loc: Location) -> CompileResult<()> {
///     if n < 0 {
///         fail!(loc, "negative value: {}", n);
///     }
///     Ok(())
/// }
///
/// let err = check(-1, Location::new("x.veld", 7)).unwrap_err();
/// assert_eq!(err.to_string(), "x.veld:7: negative value: -1");
/// ```
#[macro_export]
macro_rules! fail {
    ($location:expr, $($arg:tt)*) => {
        return Err($crate::CompileError::new($location, format!($($arg)*)))
    };
}
