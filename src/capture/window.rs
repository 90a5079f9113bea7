//! Live capture of a desktop window through xcap

use super::FrameSource;
use super::restore;
use crate::error::{MacroError, MacroResult};
use image::DynamicImage;
use log::{debug, info};

fn xcap_error(e: xcap::XCapError) -> MacroError {
    MacroError::capture(e.to_string())
}

/// Summary of a window visible to the capture backend.
#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub pid: u32,
    pub app_name: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Every window xcap can see, for choosing a `--pid`.
pub fn list_windows() -> MacroResult<Vec<WindowInfo>> {
    let mut windows = Vec::new();
    for window in xcap::Window::all().map_err(xcap_error)? {
        windows.push(WindowInfo {
            pid: window.pid().map_err(xcap_error)?,
            app_name: window.app_name().unwrap_or_default(),
            title: window.title().unwrap_or_default(),
            width: window.width().unwrap_or(0),
            height: window.height().unwrap_or(0),
        });
    }
    Ok(windows)
}

/// Captures the main window of one process.
///
/// The window is looked up again on every capture, so a game restarted under
/// the same process id is picked up and a closed one fails the capture.
pub struct WindowSource {
    pid: u32,
}

impl WindowSource {
    pub fn for_process(pid: u32) -> Self {
        Self { pid }
    }

    /// First process whose window title contains `needle` (case-insensitive).
    pub fn find_by_title(needle: &str) -> MacroResult<Self> {
        let needle = needle.to_lowercase();
        list_windows()?
            .into_iter()
            .find(|info| info.title.to_lowercase().contains(&needle))
            .map(|info| {
                debug!("🪟 '{}' belongs to process {}", info.title, info.pid);
                Self::for_process(info.pid)
            })
            .ok_or_else(|| MacroError::capture(format!("no window titled like '{needle}'")))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn locate(&self) -> MacroResult<xcap::Window> {
        let mut fallback = None;
        for window in xcap::Window::all().map_err(xcap_error)? {
            if window.pid().map_err(xcap_error)? != self.pid {
                continue;
            }
            // Prefer the titled top-level window over helper surfaces
            if !window.title().unwrap_or_default().is_empty() {
                return Ok(window);
            }
            fallback.get_or_insert(window);
        }
        fallback.ok_or_else(|| MacroError::capture(format!("process {} has no window", self.pid)))
    }
}

impl FrameSource for WindowSource {
    fn capture_image(&mut self) -> MacroResult<DynamicImage> {
        let window = self.locate()?;
        let window_id = window.id().map_err(xcap_error)?;
        if window.is_minimized().map_err(xcap_error)? {
            if !restore::restore_window(window_id) || window.is_minimized().map_err(xcap_error)? {
                return Err(MacroError::WindowMinimized { pid: self.pid });
            }
            info!("🪟 Restored the minimized window of process {}", self.pid);
        }
        let mut image = window.capture_image().map_err(xcap_error)?;
        restore::clip_to_window_region(window_id, &mut image);
        Ok(DynamicImage::ImageRgba8(image))
    }

    fn describe(&self) -> String {
        format!("window of process {}", self.pid)
    }
}
