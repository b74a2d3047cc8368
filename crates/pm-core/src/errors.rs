//! Error types for the property Monte Carlo engine.
//!
//! A single `thiserror`-derived enum covers the whole workspace. The
//! variants follow the engine's propagation policy: configuration errors
//! are fatal and raised before any trial runs, numeric degeneracies are
//! recovered inside a trial, worker failures degrade to sequential
//! execution, and cancellation aborts the run without partial results.

use thiserror::Error;

/// The top-level error type used throughout the workspace.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Malformed distribution, correlation matrix, or settings.
    ///
    /// Always fatal; surfaced before any trial runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Precondition violated by a caller.
    #[error("precondition not satisfied: {0}")]
    Precondition(String),

    /// Postcondition violated by a computation.
    #[error("postcondition not satisfied: {0}")]
    Postcondition(String),

    /// General runtime error.
    #[error("{0}")]
    Runtime(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Index out of range.
    #[error("index ({index}) out of range [0, {size})")]
    IndexOutOfRange {
        /// The index that was out of range.
        index: usize,
        /// The size of the container.
        size: usize,
    },

    /// A cash-flow sequence admits no finite rate of return.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    /// A parallel worker failed to start or crashed.
    #[error("worker execution failure: {0}")]
    WorkerExecution(String),

    /// The caller cancelled the run.
    #[error("simulation cancelled")]
    Cancelled,
}

impl Error {
    /// `true` for errors that must abort a run before any trial executes.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Shorthand `Result` type used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::Precondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use pm_core::{ensure, errors::Error};
/// fn positive(x: f64) -> pm_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(matches!(positive(-1.0), Err(Error::Precondition(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Precondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Configuration(...))` if `$cond` is false.
///
/// Used by every validation path whose failure must reach the caller as a
/// configuration error.
///
/// # Example
/// ```
/// use pm_core::{ensure_config, errors::Error};
/// fn ordered(lo: f64, hi: f64) -> pm_core::errors::Result<()> {
///     ensure_config!(lo <= hi, "bounds ({lo}, {hi}) are reversed");
///     Ok(())
/// }
/// assert!(ordered(0.0, 1.0).is_ok());
/// assert!(ordered(1.0, 0.0).unwrap_err().is_configuration());
/// ```
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Configuration(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Postcondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use pm_core::{ensure_post, errors::Error};
/// fn halve(x: f64) -> pm_core::errors::Result<f64> {
///     let result = x / 2.0;
///     ensure_post!(result.is_finite(), "result must be finite, got {result}");
///     Ok(result)
/// }
/// assert!(halve(1.0).is_ok());
/// assert!(halve(f64::INFINITY).is_err());
/// ```
#[macro_export]
macro_rules! ensure_post {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Postcondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use pm_core::{fail, errors::Error};
/// fn always_err() -> pm_core::errors::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_config(flag: bool) -> Result<()> {
        ensure_config!(flag, "flag was {flag}");
        Ok(())
    }

    #[test]
    fn ensure_config_produces_configuration_error() {
        assert!(check_config(true).is_ok());
        let err = check_config(false).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "configuration error: flag was false");
    }

    #[test]
    fn non_configuration_errors_are_not_fatal_class() {
        assert!(!Error::Cancelled.is_configuration());
        assert!(!Error::WorkerExecution("pool".into()).is_configuration());
    }
}
