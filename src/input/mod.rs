//! Simulated player input

#[cfg(feature = "desktop")]
pub mod mouse;

use crate::error::MacroResult;
use log::info;
use std::fmt;

#[cfg(feature = "desktop")]
pub use mouse::MouseInjector;

/// What an injected input means to the game. Both are a right click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Reel the line in
    Collect,
    /// Cast the line out
    Throw,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Collect => write!(f, "collect"),
            ActionKind::Throw => write!(f, "throw"),
        }
    }
}

// Delivers actions to the game process
pub trait InputInjector {
    fn send_action(&mut self, kind: ActionKind) -> MacroResult<()>;
}

impl<T: InputInjector + ?Sized> InputInjector for Box<T> {
    fn send_action(&mut self, kind: ActionKind) -> MacroResult<()> {
        (**self).send_action(kind)
    }
}

/// Logs actions instead of clicking. Used with replays and `--dry-run`.
#[derive(Debug, Default)]
pub struct DryRunInjector {
    sent: u64,
}

impl DryRunInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl InputInjector for DryRunInjector {
    fn send_action(&mut self, kind: ActionKind) -> MacroResult<()> {
        self.sent += 1;
        info!("🖱️ [dry-run] right click ({kind}) #{}", self.sent);
        Ok(())
    }
}
