//! Drives one fishing run from start to finish

use super::controller::MacroController;
use super::sequencer::ActionSequencer;
use super::types::{AutomationEvent, MacroState, RunSummary, TickOutcome};
use crate::capture::FrameSource;
use crate::config::MacroConfig;
use crate::error::{MacroError, MacroResult};
use crate::input::{ActionKind, InputInjector};
use crate::match_image::PatternStore;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{self, MissedTickBehavior};

/// Helper function to create the event channel a runner reports on
pub fn create_event_channel() -> (mpsc::Sender<AutomationEvent>, mpsc::Receiver<AutomationEvent>) {
    mpsc::channel(32)
}

pub struct MacroRunner<S, I> {
    sequencer: ActionSequencer<S, I>,
    controller: MacroController,
    event_tx: mpsc::Sender<AutomationEvent>,
}

impl<S: FrameSource, I: InputInjector> MacroRunner<S, I> {
    pub fn new(
        sequencer: ActionSequencer<S, I>,
        controller: MacroController,
        event_tx: mpsc::Sender<AutomationEvent>,
    ) -> Self {
        Self {
            sequencer,
            controller,
            event_tx,
        }
    }

    /// Resolve the run's pattern from the config and build a runner for it.
    /// Fails with `MissingPattern` before anything is captured or clicked.
    pub fn prepare(
        source: S,
        injector: I,
        config: MacroConfig,
        controller: MacroController,
        event_tx: mpsc::Sender<AutomationEvent>,
    ) -> MacroResult<Self> {
        config.validate()?;
        let pattern = PatternStore::from_config(&config).select()?;
        let sequencer = ActionSequencer::new(source, injector, pattern, config);
        Ok(Self::new(sequencer, controller, event_tx))
    }

    pub fn controller(&self) -> &MacroController {
        &self.controller
    }

    pub fn sequencer(&self) -> &ActionSequencer<S, I> {
        &self.sequencer
    }

    /// Run until the controller is stopped, the run limit is reached or a
    /// capture fails. `RunFinished` is sent exactly once per started run.
    pub async fn run(&mut self) -> MacroResult<RunSummary> {
        let run_limit = self.sequencer.config().run_limit;
        if !self.controller.start(run_limit) {
            return Err(MacroError::AlreadyRunning);
        }
        self.emit(AutomationEvent::StateChanged(MacroState::Running));

        // Cast the line right away, the first bite arrives on a later tick
        self.sequencer.send(ActionKind::Throw);

        let period = self.sequencer.config().tick_interval().max(Duration::from_millis(1));
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut state_rx = self.controller.subscribe();
        let mut ticks = 0u64;
        let mut failure = None;

        while self.controller.is_active() {
            tokio::select! {
                _ = interval.tick() => {
                    ticks += 1;
                    match self.sequencer.tick(&self.controller).await {
                        Ok(outcome) => self.report(&outcome),
                        Err(e) => {
                            error!("❌ {e}");
                            self.controller.stop();
                            self.emit(AutomationEvent::Error(e.to_string()));
                            failure = Some(e);
                        }
                    }
                }
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        self.controller.stop();
                    }
                }
            }
        }

        let summary = RunSummary {
            fished_count: self.controller.snapshot().fished_count(),
            ticks,
        };
        info!(
            "🏁 Run finished: {} fish in {} tick(s)",
            summary.fished_count, summary.ticks
        );
        self.emit(AutomationEvent::StateChanged(MacroState::Idle));
        self.emit(AutomationEvent::RunFinished(summary));

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    fn report(&mut self, outcome: &TickOutcome) {
        if let Some(scale) = self.sequencer.take_calibrated_scale() {
            self.emit(AutomationEvent::Calibrated { scale });
        }
        match outcome {
            TickOutcome::Fished { fished_count, .. }
            | TickOutcome::LimitReached { fished_count } => {
                self.emit(AutomationEvent::FishedCountUpdated(*fished_count));
            }
            TickOutcome::NoMatch { score } => debug!("👀 No bite (score {score:.3})"),
            TickOutcome::Skipped { reason } => debug!("⏭️ Tick skipped: {reason}"),
            TickOutcome::WindowHidden { consecutive: 1 } => {
                self.emit(AutomationEvent::WindowHidden);
            }
            TickOutcome::WindowHidden { .. } => {}
            TickOutcome::Interrupted => debug!("⏹️ Tick interrupted by stop"),
            TickOutcome::Inactive => {}
        }
    }

    /// Events are best effort; a slow or missing listener never stalls a tick.
    fn emit(&self, event: AutomationEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!("⚠️ Event queue full, dropped {event:?}"),
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
