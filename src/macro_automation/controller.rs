//! Shared handle on the run state

use super::run_state::{RecordOutcome, RunState};
use log::info;
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle the UI and the runner share. Every change to the run
/// state is published to subscribers.
#[derive(Debug, Clone)]
pub struct MacroController {
    state: Arc<watch::Sender<RunState>>,
}

impl Default for MacroController {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunState::default());
        Self { state: Arc::new(tx) }
    }

    pub fn start(&self, target_count: u32) -> bool {
        let started = self.state.send_if_modified(|s| s.start(target_count));
        if started {
            info!("▶️ Run started (limit {})", describe_limit(target_count));
        }
        started
    }

    pub fn stop(&self) -> bool {
        let stopped = self.state.send_if_modified(|s| s.stop());
        if stopped {
            info!("⏹️ Run stopped");
        }
        stopped
    }

    pub fn record_match(&self) -> RecordOutcome {
        let mut outcome = RecordOutcome::Inactive;
        self.state.send_if_modified(|s| {
            outcome = s.record_match();
            outcome != RecordOutcome::Inactive
        });
        outcome
    }

    pub fn reset_fished(&self) {
        self.state.send_modify(|s| s.reset_fished());
        info!("🔄 Fished count reset");
    }

    pub fn snapshot(&self) -> RunState {
        self.state.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().is_active()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }
}

fn describe_limit(target_count: u32) -> String {
    if target_count == 0 {
        "unlimited".to_string()
    } else {
        target_count.to_string()
    }
}
