//! Image matching for the fishing macro
//!
//! Frames are compared against a single reference pattern with zero-mean
//! normalized cross-correlation. When the bundled pattern is in use, frames
//! are first shrunk to the resolution the pattern was authored at.

pub mod adapt;
pub mod calibrator;
pub mod engine;
pub mod pattern;


// Re-export main types and functions
pub use calibrator::{
    CalibrationConfig, CalibrationPhase, NormalizeOutcome, Normalized, ScaleCalibrator, ScaleState,
};
pub use engine::{MatchEngine, MatchResult, PatternMatcher};
pub use pattern::{BUNDLED_PATTERN_NAME, Pattern, PatternSource, PatternStore};
