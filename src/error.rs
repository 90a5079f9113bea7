use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for macro operations.
pub type MacroResult<T> = Result<T, MacroError>;

/// The error type for capture, matching, configuration and input operations.
#[derive(Debug, Error)]
pub enum MacroError {
    #[error("Failed to capture the target window: {reason}")]
    CaptureFailure { reason: String },

    #[error("Target window of process {pid} is minimized")]
    WindowMinimized { pid: u32 },

    #[error(
        "Pattern {pattern_width}x{pattern_height} does not fit in frame {frame_width}x{frame_height}"
    )]
    InvalidMatchGeometry {
        pattern_width: u32,
        pattern_height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("A fishing run is already active")]
    AlreadyRunning,

    #[error("No pattern image selected. Pass --pattern <file> or enable the default pattern")]
    MissingPattern,

    #[error("Scale search reached the size floor at scale {scale:.1} without a qualifying match")]
    CalibrationNonConvergence { scale: f64 },

    #[error("Failed to load pattern {path:?}: {source}")]
    PatternLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Bundled default pattern could not be decoded: {source}")]
    BundledPatternCorrupt { source: image::ImageError },

    #[error("Pattern '{name}' is empty")]
    EmptyPattern { name: String },

    #[error("Failed to send input action: {reason}")]
    InputFailure { reason: String },

    #[error("Invalid configuration: {description}")]
    InvalidConfig { description: String },

    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write snapshot {path:?}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl MacroError {
    /// Errors that only cost the current tick; the run keeps going.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MacroError::WindowMinimized { .. }
                | MacroError::InvalidMatchGeometry { .. }
                | MacroError::CalibrationNonConvergence { .. }
                | MacroError::InputFailure { .. }
        )
    }

    pub fn capture(reason: impl Into<String>) -> Self {
        MacroError::CaptureFailure {
            reason: reason.into(),
        }
    }

    pub fn input(reason: impl Into<String>) -> Self {
        MacroError::InputFailure {
            reason: reason.into(),
        }
    }
}
