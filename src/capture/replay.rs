//! Frames played back from memory or a directory of screenshots

use super::FrameSource;
use crate::error::{MacroError, MacroResult};
use image::DynamicImage;
use log::{debug, info};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Cycles through a fixed list of frames, one per capture.
pub struct ReplaySource {
    frames: Vec<DynamicImage>,
    next: usize,
    label: String,
}

impl ReplaySource {
    pub fn from_images(frames: Vec<DynamicImage>) -> Self {
        let label = format!("replay of {} frame(s)", frames.len());
        Self {
            frames,
            next: 0,
            label,
        }
    }

    /// Load every PNG/JPEG in `dir`, in file name order.
    pub fn from_directory(dir: &Path) -> MacroResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            MacroError::capture(format!("cannot read replay directory {dir:?}: {e}"))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let image = image::open(path)
                .map_err(|e| MacroError::capture(format!("cannot decode {path:?}: {e}")))?;
            debug!(
                "🎞️ Loaded replay frame {:?} ({}x{})",
                path,
                image.width(),
                image.height()
            );
            frames.push(image);
        }

        if frames.is_empty() {
            return Err(MacroError::capture(format!(
                "no PNG or JPEG frames in {dir:?}"
            )));
        }
        info!("🎞️ Replaying {} frame(s) from {:?}", frames.len(), dir);

        let mut source = Self::from_images(frames);
        source.label = format!("replay of {dir:?}");
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
}

impl FrameSource for ReplaySource {
    fn capture_image(&mut self) -> MacroResult<DynamicImage> {
        if self.frames.is_empty() {
            return Err(MacroError::capture("replay has no frames"));
        }
        let frame = self.frames[self.next].clone();
        self.next = (self.next + 1) % self.frames.len();
        Ok(frame)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
