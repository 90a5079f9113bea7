//! Reference patterns and pattern selection for a run

use super::adapt;
use crate::config::MacroConfig;
use crate::error::{MacroError, MacroResult};
use image::{DynamicImage, GrayImage};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Placeholder subtitle strip drawn at the scale of an 854x480 capture.
/// Replace `assets/default_pattern.png` with a crop of the real subtitle from
/// an 854x480 screenshot before relying on `--default-pattern`.
const BUNDLED_PATTERN_PNG: &[u8] = include_bytes!("../../assets/default_pattern.png");

pub const BUNDLED_PATTERN_NAME: &str = "bundled-subtitle";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    /// Compiled into the binary, authored at the reference resolution
    Bundled,
    /// Loaded from an operator-chosen image file
    File(PathBuf),
    /// Built in memory (crops, generated images)
    Memory,
}

/// Immutable luminance image of the visual signature to look for.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    source: PatternSource,
    luma: GrayImage,
}

impl Pattern {
    pub fn from_image(
        name: impl Into<String>,
        source: PatternSource,
        image: &DynamicImage,
    ) -> MacroResult<Self> {
        Self::build(name.into(), source, adapt::to_luma(image))
    }

    pub fn from_luma(name: impl Into<String>, luma: GrayImage) -> MacroResult<Self> {
        Self::build(name.into(), PatternSource::Memory, luma)
    }

    fn build(name: String, source: PatternSource, luma: GrayImage) -> MacroResult<Self> {
        if luma.width() == 0 || luma.height() == 0 {
            return Err(MacroError::EmptyPattern { name });
        }
        Ok(Self { name, source, luma })
    }

    /// The default pattern shipped with the binary
    pub fn bundled() -> MacroResult<Self> {
        let image = image::load_from_memory(BUNDLED_PATTERN_PNG)
            .map_err(|source| MacroError::BundledPatternCorrupt { source })?;
        Self::from_image(BUNDLED_PATTERN_NAME, PatternSource::Bundled, &image)
    }

    /// Load a user pattern. It is assumed to be cut from a capture at the
    /// live game resolution, so it is never rescaled.
    pub fn open(path: &Path) -> MacroResult<Self> {
        let is_jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            .unwrap_or(false);
        if !is_jpeg {
            warn!("⚠️ Pattern {path:?} is not a JPEG file, decoding it anyway");
        }

        let image = image::open(path).map_err(|source| MacroError::PatternLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("pattern")
            .to_string();
        Self::from_image(name, PatternSource::File(path.to_path_buf()), &image)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &PatternSource {
        &self.source
    }

    pub fn is_bundled(&self) -> bool {
        self.source == PatternSource::Bundled
    }

    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    pub fn width(&self) -> u32 {
        self.luma.width()
    }

    pub fn height(&self) -> u32 {
        self.luma.height()
    }
}

/// Chooses the pattern a run will use and rejects runs that have none.
#[derive(Debug, Clone)]
pub struct PatternStore {
    use_default: bool,
    user_path: Option<PathBuf>,
}

impl PatternStore {
    pub fn new(use_default: bool, user_path: Option<PathBuf>) -> Self {
        Self {
            use_default,
            user_path,
        }
    }

    pub fn from_config(config: &MacroConfig) -> Self {
        Self::new(config.use_default_pattern, config.pattern_path.clone())
    }

    /// Resolve the pattern for a run. Called once at start.
    pub fn select(&self) -> MacroResult<Pattern> {
        if self.use_default {
            let pattern = Pattern::bundled()?;
            info!(
                "🖼️ Using bundled pattern ({}x{})",
                pattern.width(),
                pattern.height()
            );
            return Ok(pattern);
        }

        match &self.user_path {
            Some(path) => {
                let pattern = Pattern::open(path)?;
                info!(
                    "🖼️ Registered pattern {:?} ({}x{})",
                    path,
                    pattern.width(),
                    pattern.height()
                );
                Ok(pattern)
            }
            None => Err(MacroError::MissingPattern),
        }
    }
}
