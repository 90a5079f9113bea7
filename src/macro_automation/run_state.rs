//! Run flags and counters

/// Result of recording a catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Run not active, nothing counted
    Inactive,
    Continue { fished_count: u64 },
    /// The catch completed the run limit; the run is now stopped
    LimitReached { fished_count: u64 },
}

/// Whether a run is active plus its counters.
///
/// `fished_count` spans runs and only resets on request. `done_count` counts
/// catches toward `target_count` within one run; `target_count == 0` means no
/// limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    active: bool,
    fished_count: u64,
    done_count: u32,
    target_count: u32,
}

impl RunState {
    /// Begin a run. Returns false when one is already active.
    pub fn start(&mut self, target_count: u32) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.target_count = target_count;
        self.done_count = 0;
        true
    }

    /// End the active run. Returns false when nothing was running.
    pub fn stop(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        true
    }

    pub fn record_match(&mut self) -> RecordOutcome {
        if !self.active {
            return RecordOutcome::Inactive;
        }
        self.fished_count += 1;
        if self.target_count != 0 {
            self.done_count += 1;
            if self.done_count >= self.target_count {
                self.active = false;
                self.done_count = 0;
                return RecordOutcome::LimitReached {
                    fished_count: self.fished_count,
                };
            }
        }
        RecordOutcome::Continue {
            fished_count: self.fished_count,
        }
    }

    pub fn reset_fished(&mut self) {
        self.fished_count = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn fished_count(&self) -> u64 {
        self.fished_count
    }

    pub fn done_count(&self) -> u32 {
        self.done_count
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }
}
