// Types and enums for the fishing automation

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroState {
    Idle,
    Running,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Run was not active, nothing captured
    Inactive,
    /// Tick abandoned without side effects (bad geometry, failed match task)
    Skipped { reason: String },
    /// Game window is minimized; `consecutive` counts ticks in this episode
    WindowHidden { consecutive: u32 },
    /// Best score stayed under the threshold
    NoMatch { score: f32 },
    /// Run was stopped before the next action
    Interrupted,
    /// Fish collected and the line thrown again
    Fished { score: f32, fished_count: u64 },
    /// Fish collected and the run limit reached
    LimitReached { fished_count: u64 },
}

impl TickOutcome {
    pub fn is_catch(&self) -> bool {
        matches!(
            self,
            TickOutcome::Fished { .. } | TickOutcome::LimitReached { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Total catches recorded by the controller when the run ended
    pub fished_count: u64,
    /// Ticks executed by this run
    pub ticks: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEvent {
    StateChanged(MacroState),
    FishedCountUpdated(u64),
    /// Game window got minimized; sent once per episode
    WindowHidden,
    Calibrated { scale: f64 },
    Error(String),
    RunFinished(RunSummary),
}
