//! Error types for the bridge layer.

use thiserror::Error;

use crate::host::DType;

/// Errors that abort a solve.
///
/// Every variant is fatal to the solve in progress. The first one raised by a
/// callback ends the solve and is returned from [`crate::run_with`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Host array element type differs from the destination buffer type.
    #[error("host array of {found} can not be copied into a buffer of {expected}")]
    TypeMismatch { expected: DType, found: DType },

    /// Host array is not contiguous in row-major order.
    #[error("host array is not C-ordered (contiguous row-major)")]
    Layout,

    /// A produced or supplied sequence is shorter than its declared count.
    #[error("{what} is shorter than expected: got {found} of {expected} elements")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Objective result can not be interpreted as a scalar.
    #[error("the result of {what} can not be converted to a scalar")]
    Conversion { what: &'static str },

    /// The solver asked for something this bridge does not provide.
    #[error("unsupported request: {0}")]
    UnsupportedRequest(String),

    /// A host callable failed.
    #[error("host callable {callable} failed")]
    HostFault {
        callable: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Problem definition is inconsistent.
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// The solver returned without finalizing the solution.
    #[error("solver returned without calling finalize")]
    MissingResult,

    /// Solver application could not be created or configured.
    #[error("solver error: {0}")]
    Solver(String),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("config serialization error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Wrap an error raised by the named host callable.
    pub fn host(callable: &'static str, source: anyhow::Error) -> Self {
        BridgeError::HostFault { callable, source }
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
