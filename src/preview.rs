// ============================================================================
// PROGRESSIVE PREVIEW: resolution-adaptive processing for large buffers
// ============================================================================

use std::collections::HashMap;

use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Total pixel count above which passes run on a downscaled working copy.
pub const DEFAULT_MAX_PIXELS: u64 = 4_000_000;
/// Longest-side cap for the downscaled working copy, in pixels.
pub const DEFAULT_MAX_EDGE: u32 = 1920;

/// Whether a scaled run is interactive feedback or a committed result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderIntent {
    /// Interactive feedback: the result stays at working-copy resolution.
    Preview,
    /// Commit or export: the result is resampled back to source dimensions.
    Final,
}

/// Decides when a pass should run on a downscaled copy instead of the full
/// buffer. The scale factor is pure in (width, height), and interactive
/// callers ask for it on every frame, so results are memoized per dimension
/// pair.
#[derive(Clone, Debug)]
pub struct PreviewScaler {
    max_pixels: u64,
    max_edge: u32,
    cache: HashMap<(u32, u32), f32>,
}

impl Default for PreviewScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewScaler {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_PIXELS, DEFAULT_MAX_EDGE)
    }

    /// Override the pixel threshold and longest-side cap.
    pub fn with_limits(max_pixels: u64, max_edge: u32) -> Self {
        Self {
            max_pixels: max_pixels.max(1),
            max_edge: max_edge.max(1),
            cache: HashMap::new(),
        }
    }

    /// Scale factor for a buffer of the given dimensions: 1.0 at or under
    /// the pixel threshold, otherwise max_edge divided by the longest side.
    pub fn scale_for(&mut self, width: u32, height: u32) -> f32 {
        if let Some(&s) = self.cache.get(&(width, height)) {
            return s;
        }
        let s = self.compute_scale(width, height);
        self.cache.insert((width, height), s);
        s
    }

    fn compute_scale(&self, width: u32, height: u32) -> f32 {
        let total = width as u64 * height as u64;
        if total <= self.max_pixels {
            return 1.0;
        }
        let longest = width.max(height).max(1);
        (self.max_edge as f32 / longest as f32).min(1.0)
    }

    /// Run `op` over `src`, downscaling first when the buffer is over the
    /// threshold. With `Preview` intent the small result is returned as-is;
    /// with `Final` intent it is resampled back up to the source dimensions.
    /// Buffers at or under the threshold run at full resolution either way.
    pub fn run<F>(&mut self, src: &RgbaImage, intent: RenderIntent, op: F) -> RgbaImage
    where
        F: FnOnce(&RgbaImage) -> RgbaImage,
    {
        let (w, h) = src.dimensions();
        let scale = self.scale_for(w, h);
        if scale >= 1.0 {
            return op(src);
        }

        let nw = ((w as f32 * scale).round() as u32).max(1);
        let nh = ((h as f32 * scale).round() as u32).max(1);
        log::debug!(
            "scaled run: {}x{} at {:.3} ({}x{} working copy)",
            w,
            h,
            scale,
            nw,
            nh
        );
        let small = imageops::resize(src, nw, nh, FilterType::Triangle);
        let result = op(&small);

        match intent {
            RenderIntent::Preview => result,
            RenderIntent::Final => imageops::resize(&result, w, h, FilterType::Lanczos3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn small_buffers_keep_scale_one() {
        let mut scaler = PreviewScaler::new();
        assert_eq!(scaler.scale_for(800, 600), 1.0);
        assert_eq!(scaler.scale_for(1920, 1920), 1.0);
    }

    #[test]
    fn oversized_buffers_scale_to_the_edge_cap() {
        let mut scaler = PreviewScaler::new();
        let scale = scaler.scale_for(8000, 4000);
        assert!(scale < 1.0);
        let scaled_edge = (8000.0 * scale).round() as u32;
        assert!(scaled_edge <= DEFAULT_MAX_EDGE + 1);
        assert!(scaled_edge >= DEFAULT_MAX_EDGE - 1);
    }

    #[test]
    fn scale_factor_is_memoized_per_dimension_pair() {
        let mut scaler = PreviewScaler::new();
        let first = scaler.scale_for(5000, 3000);
        let second = scaler.scale_for(5000, 3000);
        assert_eq!(first, second);
        assert_eq!(scaler.cache.len(), 1);
        scaler.scale_for(3000, 5000);
        assert_eq!(scaler.cache.len(), 2);
    }

    #[test]
    fn small_buffers_run_at_full_resolution() {
        let img = RgbaImage::from_pixel(64, 48, Rgba([1, 2, 3, 4]));
        let mut scaler = PreviewScaler::new();
        let out = scaler.run(&img, RenderIntent::Preview, |src| {
            assert_eq!(src.dimensions(), (64, 48));
            src.clone()
        });
        assert_eq!(out.dimensions(), (64, 48));
    }

    #[test]
    fn preview_intent_returns_the_downscaled_result() {
        // A tiny threshold forces the scaled path without a 4MP test image.
        let mut scaler = PreviewScaler::with_limits(1_000, 20);
        let img = RgbaImage::from_pixel(100, 50, Rgba([9, 9, 9, 255]));
        let out = scaler.run(&img, RenderIntent::Preview, |src| src.clone());
        assert_eq!(out.dimensions(), (20, 10));
    }

    #[test]
    fn final_intent_restores_source_dimensions() {
        let mut scaler = PreviewScaler::with_limits(1_000, 20);
        let img = RgbaImage::from_pixel(100, 50, Rgba([9, 9, 9, 255]));
        let mut op_dims = (0, 0);
        let out = scaler.run(&img, RenderIntent::Final, |src| {
            op_dims = src.dimensions();
            src.clone()
        });
        assert_eq!(op_dims, (20, 10));
        assert_eq!(out.dimensions(), (100, 50));
    }
}
