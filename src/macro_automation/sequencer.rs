//! Per-tick capture, match and input sequence

use super::controller::MacroController;
use super::run_state::RecordOutcome;
use super::types::TickOutcome;
use crate::capture::FrameSource;
use crate::config::MacroConfig;
use crate::error::{MacroError, MacroResult};
use crate::input::{ActionKind, InputInjector};
use crate::match_image::{MatchEngine, NormalizeOutcome, Pattern, PatternMatcher, ScaleCalibrator};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::time::sleep;

/// Turns one capture into at most one collect/throw cycle.
///
/// `tick` borrows the sequencer mutably, so two ticks can never overlap.
pub struct ActionSequencer<S, I> {
    source: S,
    injector: I,
    matcher: Arc<dyn PatternMatcher>,
    pattern: Arc<Pattern>,
    calibrator: Option<ScaleCalibrator>,
    config: MacroConfig,
    calibrated_scale: Option<f64>,
    hidden_ticks: u32,
}

impl<S: FrameSource, I: InputInjector> ActionSequencer<S, I> {
    /// The bundled pattern gets a scale calibrator; user patterns are matched
    /// at the captured resolution.
    pub fn new(source: S, injector: I, pattern: Pattern, config: MacroConfig) -> Self {
        let calibrator = pattern
            .is_bundled()
            .then(|| ScaleCalibrator::with_defaults(pattern.clone()));
        Self {
            source,
            injector,
            matcher: Arc::new(MatchEngine::new()),
            pattern: Arc::new(pattern),
            calibrator,
            config,
            calibrated_scale: None,
            hidden_ticks: 0,
        }
    }

    /// Replace the calibrator, e.g. one with a different reference envelope.
    pub fn with_calibrator(mut self, calibrator: ScaleCalibrator) -> Self {
        self.calibrator = Some(calibrator);
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn PatternMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn config(&self) -> &MacroConfig {
        &self.config
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn calibrator(&self) -> Option<&ScaleCalibrator> {
        self.calibrator.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    /// Scale found by the last tick that completed calibration, once.
    pub fn take_calibrated_scale(&mut self) -> Option<f64> {
        self.calibrated_scale.take()
    }

    /// Fire-and-forget input: failures are logged and the caller carries on.
    pub fn send(&mut self, kind: ActionKind) {
        match self.injector.send_action(kind) {
            Ok(()) => debug!("🖱️ Sent {kind}"),
            Err(e) => warn!("⚠️ {e}"),
        }
    }

    /// Run one tick against the controller's run state.
    ///
    /// Only capture failures that should end the run are returned as errors;
    /// everything else is reported through the outcome.
    pub async fn tick(&mut self, controller: &MacroController) -> MacroResult<TickOutcome> {
        if !controller.is_active() {
            return Ok(TickOutcome::Inactive);
        }

        let frame = match self.source.capture() {
            Ok(frame) => frame,
            Err(MacroError::WindowMinimized { pid }) => {
                self.hidden_ticks += 1;
                if self.hidden_ticks == 1 {
                    warn!("⚠️ Window of process {pid} is minimized, restore it to keep fishing");
                } else {
                    debug!("⏭️ Window still minimized ({} ticks)", self.hidden_ticks);
                }
                return Ok(TickOutcome::WindowHidden {
                    consecutive: self.hidden_ticks,
                });
            }
            Err(e) if e.is_transient() => {
                debug!("⏭️ Skipping tick: {e}");
                return Ok(TickOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        if self.hidden_ticks > 0 {
            info!("🪟 Window visible again after {} tick(s)", self.hidden_ticks);
            self.hidden_ticks = 0;
        }
        debug!(
            "📸 Captured {}x{} in {}ms",
            frame.image.width(),
            frame.image.height(),
            frame.duration_ms
        );

        // Calibration and matching are CPU bound, keep them off the runtime
        let matcher = Arc::clone(&self.matcher);
        let pattern = Arc::clone(&self.pattern);
        let mut calibrator = self.calibrator.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut converged = None;
            let image = match calibrator.as_mut() {
                Some(calibrator) => {
                    let normalized = calibrator.normalize(&frame.image);
                    if let NormalizeOutcome::Converged { scale, .. } = normalized.outcome {
                        converged = Some(scale);
                    }
                    normalized.image
                }
                None => frame.image,
            };
            let result = matcher.find(&image, &pattern);
            (calibrator, converged, result)
        })
        .await;

        let (calibrator, converged, result) = match joined {
            Ok(parts) => parts,
            Err(e) => {
                warn!("⚠️ Matching task failed: {e}");
                return Ok(TickOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        };
        self.calibrator = calibrator;
        if converged.is_some() {
            self.calibrated_scale = converged;
        }

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                warn!("⚠️ {e}");
                return Ok(TickOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        };
        if !result.is_match(self.config.match_threshold) {
            return Ok(TickOutcome::NoMatch {
                score: result.score,
            });
        }
        info!(
            "🐟 Bite detected (score {:.3} at {:?})",
            result.score,
            result.center()
        );

        sleep(self.config.collect_delay()).await;
        if !controller.is_active() {
            return Ok(TickOutcome::Interrupted);
        }
        self.send(ActionKind::Collect);

        let fished_count = match controller.record_match() {
            RecordOutcome::Continue { fished_count } => fished_count,
            RecordOutcome::LimitReached { fished_count } => {
                info!("🏁 Run limit reached after {fished_count} fish");
                return Ok(TickOutcome::LimitReached { fished_count });
            }
            RecordOutcome::Inactive => return Ok(TickOutcome::Interrupted),
        };
        info!("🎣 Fished: {fished_count}");

        sleep(self.config.throw_delay()).await;
        if !controller.is_active() {
            return Ok(TickOutcome::Interrupted);
        }
        self.send(ActionKind::Throw);

        sleep(self.config.start_delay()).await;
        Ok(TickOutcome::Fished {
            score: result.score,
            fished_count,
        })
    }
}
