//! Zero-mean normalized cross-correlation template search

use super::adapt;
use super::pattern::Pattern;
use crate::error::{MacroError, MacroResult};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use log::debug;

/// Best alignment of a pattern inside a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Correlation coefficient in [-1, 1], 1.0 is a perfect match
    pub score: f32,
    /// Top-left X of the best window
    pub x: u32,
    /// Top-left Y of the best window
    pub y: u32,
    /// Pattern width used for the search
    pub width: u32,
    /// Pattern height used for the search
    pub height: u32,
}

impl MatchResult {
    pub fn location(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    /// Center of the matched window
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn is_match(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// Summed-area tables of pixel values and squared pixel values.
struct WindowSums {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl WindowSums {
    fn new(image: &GrayImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sum_sq = vec![0u64; stride * (height + 1)];

        for (y, row) in image.rows().enumerate() {
            let mut row_sum = 0u64;
            let mut row_sum_sq = 0u64;
            for (x, pixel) in row.enumerate() {
                let value = u64::from(pixel[0]);
                row_sum += value;
                row_sum_sq += value * value;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sum_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// (sum, sum of squares) of the window with top-left (x, y)
    fn window(&self, x: u32, y: u32, width: u32, height: u32) -> (u64, u64) {
        let (x, y) = (x as usize, y as usize);
        let (w, h) = (width as usize, height as usize);
        let top_left = y * self.stride + x;
        let top_right = top_left + w;
        let bottom_left = (y + h) * self.stride + x;
        let bottom_right = bottom_left + w;

        let sum = (self.sum[bottom_right] + self.sum[top_left])
            - (self.sum[top_right] + self.sum[bottom_left]);
        let sum_sq = (self.sum_sq[bottom_right] + self.sum_sq[top_left])
            - (self.sum_sq[top_right] + self.sum_sq[bottom_left]);
        (sum, sum_sq)
    }
}

// Anything that can locate a pattern in a frame. Runs on a blocking thread.
pub trait PatternMatcher: Send + Sync + 'static {
    fn find(&self, frame: &DynamicImage, pattern: &Pattern) -> MacroResult<MatchResult>;
}

/// Compares frames against a pattern and reports the best-aligned window.
#[derive(Debug, Clone, Default)]
pub struct MatchEngine;

impl PatternMatcher for MatchEngine {
    fn find(&self, frame: &DynamicImage, pattern: &Pattern) -> MacroResult<MatchResult> {
        MatchEngine::find(self, frame, pattern)
    }
}

impl MatchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Match a color frame against a pattern. Logs the resulting score.
    pub fn find(&self, frame: &DynamicImage, pattern: &Pattern) -> MacroResult<MatchResult> {
        let frame_gray = adapt::to_luma(frame);
        let result = self.find_in_luma(&frame_gray, pattern.luma())?;
        debug!(
            "🎣 Pattern '{}' score {:.3} at ({}, {})",
            pattern.name(),
            result.score,
            result.x,
            result.y
        );
        Ok(result)
    }

    /// Match two luminance images. The pattern must fit inside the frame.
    pub fn find_in_luma(&self, frame: &GrayImage, pattern: &GrayImage) -> MacroResult<MatchResult> {
        let (frame_width, frame_height) = frame.dimensions();
        let (pattern_width, pattern_height) = pattern.dimensions();

        if pattern_width == 0
            || pattern_height == 0
            || pattern_width > frame_width
            || pattern_height > frame_height
        {
            return Err(MacroError::InvalidMatchGeometry {
                pattern_width,
                pattern_height,
                frame_width,
                frame_height,
            });
        }

        let scores = self.score_map(frame, pattern);

        let mut best_score = f32::NEG_INFINITY;
        let mut best_x = 0u32;
        let mut best_y = 0u32;
        for (x, y, pixel) in scores.enumerate_pixels() {
            let score = pixel[0];
            if score > best_score {
                best_score = score;
                best_x = x;
                best_y = y;
            }
        }

        Ok(MatchResult {
            score: best_score,
            x: best_x,
            y: best_y,
            width: pattern_width,
            height: pattern_height,
        })
    }

    /// Correlation coefficient for every placement of `pattern` inside `frame`.
    ///
    /// The raw cross term comes from imageproc; mean removal and variance
    /// normalization use exact integer window sums, so a uniform brightness
    /// or contrast change of either image leaves the scores unchanged.
    fn score_map(&self, frame: &GrayImage, pattern: &GrayImage) -> ImageBuffer<Luma<f32>, Vec<f32>> {
        let (pattern_width, pattern_height) = pattern.dimensions();
        let n = i128::from(pattern_width) * i128::from(pattern_height);

        let (pattern_sum, pattern_sum_sq) =
            pattern
                .pixels()
                .fold((0u64, 0u64), |(sum, sum_sq), pixel| {
                    let value = u64::from(pixel[0]);
                    (sum + value, sum_sq + value * value)
                });
        let pattern_var_n = n * i128::from(pattern_sum_sq) - i128::from(pattern_sum).pow(2);

        let cross = match_template(frame, pattern, MatchTemplateMethod::CrossCorrelation);
        let windows = WindowSums::new(frame);

        ImageBuffer::from_fn(cross.width(), cross.height(), |x, y| {
            if pattern_var_n <= 0 {
                return Luma([0.0]);
            }
            let (window_sum, window_sum_sq) = windows.window(x, y, pattern_width, pattern_height);
            let window_var_n = n * i128::from(window_sum_sq) - i128::from(window_sum).pow(2);
            if window_var_n <= 0 {
                return Luma([0.0]);
            }

            let cross_term = f64::from(cross.get_pixel(x, y)[0]);
            let numerator =
                n as f64 * cross_term - (i128::from(pattern_sum) * i128::from(window_sum)) as f64;
            let denominator = ((pattern_var_n as f64) * (window_var_n as f64)).sqrt();
            Luma([(numerator / denominator).clamp(-1.0, 1.0) as f32])
        })
    }
}
