// Fishing automation
// A periodic timer drives ticks; each tick captures the game window, looks for
// the bite subtitle and, on a match, reels in and casts again.

pub mod controller;
pub mod run_state;
pub mod runner;
pub mod sequencer;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export the main types for easy access
pub use controller::MacroController;
pub use run_state::{RecordOutcome, RunState};
pub use runner::{MacroRunner, create_event_channel};
pub use sequencer::ActionSequencer;
pub use types::{AutomationEvent, MacroState, RunSummary, TickOutcome};
