//! Right clicks through enigo

use super::{ActionKind, InputInjector};
use crate::error::{MacroError, MacroResult};
use enigo::{Button, Direction, Enigo, Mouse, Settings};
use log::debug;

/// Clicks at the current cursor position, so the game window must have focus.
pub struct MouseInjector {
    enigo: Enigo,
    pid: Option<u32>,
}

impl MouseInjector {
    pub fn new(pid: Option<u32>) -> MacroResult<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| MacroError::input(format!("cannot open input connection: {e}")))?;
        Ok(Self { enigo, pid })
    }
}

impl InputInjector for MouseInjector {
    fn send_action(&mut self, kind: ActionKind) -> MacroResult<()> {
        debug!("🖱️ Right click ({kind}) for process {:?}", self.pid);
        self.enigo
            .button(Button::Right, Direction::Click)
            .map_err(|e| MacroError::input(e.to_string()))
    }
}
