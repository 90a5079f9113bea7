//! Minecraft auto-fishing: watch the game window for the bobber subtitle and
//! right click to reel in and cast again.

pub mod args;
pub mod capture;
pub mod config;
pub mod error;
pub mod input;
pub mod macro_automation;
pub mod match_image;

pub use config::MacroConfig;
pub use error::{MacroError, MacroResult};
pub use macro_automation::{MacroController, MacroRunner};
