//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing and encoding a page
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open the rendering surface
    #[error("Surface initialization failed: {0}")]
    InitializationError(String),

    /// Navigation failed or never became ready
    #[error("Source unreachable: {0}")]
    UnreachableSource(String),

    /// A scroll or screenshot failed part way through the capture sequence
    #[error("Capture failed at frame {step}: {reason}")]
    CaptureError { step: usize, reason: String },

    /// A script evaluated in the page failed or returned garbage
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Resizing a batch of frames failed
    #[error("Frame transform failed: {0}")]
    TransformError(String),

    /// The animation encoder rejected a frame or the output could not be written
    #[error("Encoding failed: {0}")]
    EncodeError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The worker thread that owns the surface is gone
    #[error("Surface closed: {0}")]
    SurfaceClosed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Coarse classification callers use to report failures differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The page could not be loaded
    SourceUnreachable,
    /// Anything that went wrong on our side
    Internal,
}

impl Error {
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::UnreachableSource(_) => FailureKind::SourceUnreachable,
            _ => FailureKind::Internal,
        }
    }

    pub fn is_source_unreachable(&self) -> bool {
        self.kind() == FailureKind::SourceUnreachable
    }

    /// Classify a navigation failure. A dead worker stays internal.
    pub(crate) fn unreachable(err: Error) -> Error {
        match err {
            Error::UnreachableSource(_) | Error::SurfaceClosed(_) => err,
            other => Error::UnreachableSource(other.to_string()),
        }
    }

    pub(crate) fn capture(step: usize, err: Error) -> Error {
        Error::CaptureError {
            step,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unreachable_is_source_failure() {
        assert!(Error::UnreachableSource("dns".into()).is_source_unreachable());
        assert_eq!(Error::EncodeError("x".into()).kind(), FailureKind::Internal);
        assert_eq!(
            Error::capture(3, Error::Other("boom".into())).to_string(),
            "Capture failed at frame 3: boom"
        );
    }
}
