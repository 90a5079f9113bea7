//! Resolution calibration for the bundled pattern
//!
//! The bundled pattern was cut from an 854x480 capture. Live windows are
//! usually larger, so frames are shrunk until the pattern is found in them.
//! The search starts at 0.9 and steps down by 0.1; the first scale that
//! produces a match is remembered and reused for every later frame.

use super::adapt;
use super::engine::MatchEngine;
use super::pattern::Pattern;
use crate::error::MacroError;
use image::{DynamicImage, GrayImage};
use log::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    /// Width of the capture the bundled pattern was authored at
    pub reference_width: u32,
    /// Height of the capture the bundled pattern was authored at
    pub reference_height: u32,
    /// Minimum score that proves the resolutions line up
    pub threshold: f32,
    /// First scale tried, in tenths
    pub initial_scale_tenths: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            reference_width: 854,
            reference_height: 480,
            // Subtitle strip tested value; rough alignment is enough here
            threshold: 0.28,
            initial_scale_tenths: 9,
        }
    }
}

impl CalibrationConfig {
    /// Frames this small or smaller are used as captured.
    fn needs_scaling(&self, width: u32, height: u32) -> bool {
        width > self.reference_width && height > self.reference_height
    }

    /// Guard against shrinking past the reference capture.
    fn below_envelope(&self, width: u32, height: u32) -> bool {
        width < self.reference_width && height < self.reference_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Uncalibrated,
    Searching,
    Calibrated,
}

/// Calibration memory carried across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleState {
    phase: CalibrationPhase,
    candidate_tenths: u32,
    resolved_tenths: Option<u32>,
    attempts: u32,
}

impl ScaleState {
    pub fn new(initial_scale_tenths: u32) -> Self {
        Self {
            phase: CalibrationPhase::Uncalibrated,
            candidate_tenths: initial_scale_tenths,
            resolved_tenths: None,
            attempts: 0,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn found(&self) -> bool {
        self.resolved_tenths.is_some()
    }

    /// Scale the next search attempt will try
    pub fn candidate_scale(&self) -> f64 {
        adapt::scale_from_tenths(self.candidate_tenths)
    }

    /// Scale that produced the qualifying match, once found
    pub fn resolved_scale(&self) -> Option<f64> {
        self.resolved_tenths.map(adapt::scale_from_tenths)
    }

    /// Total resize-and-check iterations run so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn resolve(&mut self, tenths: u32) {
        self.resolved_tenths = Some(tenths);
        self.phase = CalibrationPhase::Calibrated;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizeOutcome {
    /// Frame was not larger than the reference envelope
    Passthrough,
    /// Resized with the remembered scale
    Cached { scale: f64 },
    /// Search found a scale on this call
    Converged { scale: f64, score: f32 },
    /// Search hit the size floor; the frame is best effort
    GuardReached { scale: f64 },
}

/// A frame ready for matching against the bundled pattern.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub image: DynamicImage,
    pub outcome: NormalizeOutcome,
}

#[derive(Debug, Clone)]
pub struct ScaleCalibrator {
    config: CalibrationConfig,
    state: ScaleState,
    reference: Pattern,
    engine: MatchEngine,
}

impl ScaleCalibrator {
    pub fn new(reference: Pattern, config: CalibrationConfig) -> Self {
        Self {
            state: ScaleState::new(config.initial_scale_tenths),
            config,
            reference,
            engine: MatchEngine::new(),
        }
    }

    /// Calibrator for the bundled pattern with the reference constants.
    pub fn with_defaults(reference: Pattern) -> Self {
        Self::new(reference, CalibrationConfig::default())
    }

    pub fn state(&self) -> &ScaleState {
        &self.state
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn reference(&self) -> &Pattern {
        &self.reference
    }

    /// Bring a raw frame to the reference resolution.
    ///
    /// Never fails: frames too small to scale pass through, and a search that
    /// runs into the size floor returns the last resized frame.
    pub fn normalize(&mut self, frame: &DynamicImage) -> Normalized {
        let (width, height) = (frame.width(), frame.height());
        if !self.config.needs_scaling(width, height) {
            return Normalized {
                image: frame.clone(),
                outcome: NormalizeOutcome::Passthrough,
            };
        }

        let gray = adapt::to_luma(frame);

        if let Some(scale) = self.state.resolved_scale() {
            return Normalized {
                image: DynamicImage::ImageLuma8(adapt::resize_by_scale(&gray, scale)),
                outcome: NormalizeOutcome::Cached { scale },
            };
        }

        if self.state.phase == CalibrationPhase::Uncalibrated {
            info!("🔎 Searching for the best scale for the bundled pattern...");
            self.state.phase = CalibrationPhase::Searching;
        }
        self.search(&gray)
    }

    fn search(&mut self, gray: &GrayImage) -> Normalized {
        loop {
            let tenths = self.state.candidate_tenths;
            let scale = adapt::scale_from_tenths(tenths);
            let resized = adapt::resize_by_scale(gray, scale);
            self.state.attempts += 1;

            if self.config.below_envelope(resized.width(), resized.height()) {
                warn!("{}", MacroError::CalibrationNonConvergence { scale });
                return Normalized {
                    image: DynamicImage::ImageLuma8(resized),
                    outcome: NormalizeOutcome::GuardReached { scale },
                };
            }

            match self.engine.find_in_luma(&resized, self.reference.luma()) {
                Ok(result) if result.score >= self.config.threshold => {
                    info!(
                        "✅ Found the best scale: {scale:.1} ({}x{}, score {:.3})",
                        resized.width(),
                        resized.height(),
                        result.score
                    );
                    self.state.resolve(tenths);
                    return Normalized {
                        image: DynamicImage::ImageLuma8(resized),
                        outcome: NormalizeOutcome::Converged {
                            scale,
                            score: result.score,
                        },
                    };
                }
                Ok(result) => {
                    debug!("  scale {scale:.1}: score {:.3} too low", result.score);
                }
                Err(e) => {
                    debug!("  scale {scale:.1}: {e}");
                }
            }

            if tenths == 0 {
                warn!("{}", MacroError::CalibrationNonConvergence { scale });
                return Normalized {
                    image: DynamicImage::ImageLuma8(resized),
                    outcome: NormalizeOutcome::GuardReached { scale },
                };
            }
            self.state.candidate_tenths = tenths - 1;
        }
    }
}
