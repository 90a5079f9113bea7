//! Frame capture of the game window
//!
//! The automation only needs "give me the current picture of the window".
//! Backends implement [`FrameSource::capture_image`]; timing is added by the
//! default [`FrameSource::capture`] wrapper.

pub mod replay;
pub mod restore;
#[cfg(feature = "desktop")]
pub mod window;

use crate::error::{MacroError, MacroResult};
use image::DynamicImage;
use log::info;
use std::path::Path;
use std::time::Instant;

pub use replay::ReplaySource;
#[cfg(feature = "desktop")]
pub use window::{WindowInfo, WindowSource, list_windows};

/// One captured picture of the target window.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    pub captured_at: Instant,
    pub duration_ms: u128,
}

impl Frame {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

// Anything that can produce frames of the game window
pub trait FrameSource {
    /// Raw capture. Must not return a zero-sized image.
    fn capture_image(&mut self) -> MacroResult<DynamicImage>;

    /// Human readable name of the capture target, for logs
    fn describe(&self) -> String;

    fn capture(&mut self) -> MacroResult<Frame> {
        let start = Instant::now();
        let image = self.capture_image()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(MacroError::capture(format!(
                "{} returned an empty frame",
                self.describe()
            )));
        }
        Ok(Frame {
            image,
            captured_at: start,
            duration_ms: start.elapsed().as_millis(),
        })
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn capture_image(&mut self) -> MacroResult<DynamicImage> {
        (**self).capture_image()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Capture one frame and write it to `path`. Format follows the extension.
pub fn save_snapshot<S: FrameSource + ?Sized>(source: &mut S, path: &Path) -> MacroResult<Frame> {
    let frame = source.capture()?;
    frame
        .image
        .save(path)
        .map_err(|source| MacroError::SnapshotWrite {
            path: path.to_path_buf(),
            source,
        })?;
    let (width, height) = frame.dimensions();
    info!(
        "📸 Snapshot of {} ({}x{}, {}ms) saved to {:?}",
        source.describe(),
        width,
        height,
        frame.duration_ms,
        path
    );
    Ok(frame)
}
