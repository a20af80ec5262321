// ============================================================================
// EDIT SESSION: base/working buffers, the fixed pipeline, history wiring
// ============================================================================

use image::{GrayImage, RgbaImage, imageops};

use crate::history::{HistoryEntry, HistoryLog};
use crate::io::{self, EngineError, ExportFormat};
use crate::ops::convolve::{self, Kernel};
use crate::ops::{threshold, tone};
use crate::params::EffectParams;
use crate::preview::{PreviewScaler, RenderIntent};

/// One open image. The base buffer holds the last committed starting point
/// and is never mutated by effect passes; every `apply` clones it, runs the
/// enabled passes over the clone, and commits the finished clone as the new
/// working buffer. A failed or abandoned run therefore never leaves the
/// session half-edited.
pub struct EditSession {
    base: RgbaImage,
    working: RgbaImage,
    params: EffectParams,
    history: HistoryLog,
    selection: Option<GrayImage>,
    scaler: PreviewScaler,
}

impl EditSession {
    /// Open a session over a decoded buffer. The first history entry is the
    /// untouched original, flagged as a base checkpoint.
    pub fn new(base: RgbaImage) -> Self {
        let working = base.clone();
        let mut history = HistoryLog::default();
        history.push(HistoryEntry {
            snapshot: working.clone(),
            label: "original".to_string(),
            is_base: true,
            params: EffectParams::default(),
        });
        Self {
            base,
            working,
            params: EffectParams::default(),
            history,
            selection: None,
            scaler: PreviewScaler::new(),
        }
    }

    /// Decode `bytes` and open a session over the result.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        Ok(Self::new(io::decode_image(bytes)?))
    }

    /// Read, decode and open an image file.
    pub fn load(path: &std::path::Path) -> Result<Self, EngineError> {
        Ok(Self::new(io::load_image(path)?))
    }

    pub fn width(&self) -> u32 {
        self.working.width()
    }

    pub fn height(&self) -> u32 {
        self.working.height()
    }

    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    pub fn working(&self) -> &RgbaImage {
        &self.working
    }

    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn selection(&self) -> Option<&GrayImage> {
        self.selection.as_ref()
    }

    // ------------------------------------------------------------------------
    //  Effects
    // ------------------------------------------------------------------------

    /// Apply a parameter record: clone the base buffer, run the enabled
    /// passes in pipeline order, and commit the result as the new working
    /// buffer. Out-of-range sliders are clamped, never rejected. A record
    /// identical to the current one commits the same pixels but adds no
    /// history entry.
    pub fn apply(&mut self, params: &EffectParams) {
        let clamped = params.clamped();
        let result = if clamped.is_neutral() {
            self.base.clone()
        } else {
            self.scaler
                .run(&self.base, RenderIntent::Final, |img| {
                    run_pipeline(img, &clamped)
                })
        };

        let label = clamped.diff_label(&self.params);
        self.working = result;
        if !label.is_empty() {
            self.history.push(HistoryEntry {
                snapshot: self.working.clone(),
                label,
                is_base: false,
                params: clamped.clone(),
            });
        }
        self.params = clamped;
    }

    /// Interactive variant of `apply`: runs the pipeline at preview
    /// resolution and returns the result without committing it or touching
    /// history. For oversized buffers the returned image is the downscaled
    /// working copy, not the source resolution.
    pub fn preview(&mut self, params: &EffectParams) -> RgbaImage {
        let clamped = params.clamped();
        if clamped.is_neutral() {
            return self.base.clone();
        }
        self.scaler.run(&self.base, RenderIntent::Preview, |img| {
            run_pipeline(img, &clamped)
        })
    }

    // ------------------------------------------------------------------------
    //  History
    // ------------------------------------------------------------------------

    /// Step back one history entry, restoring its snapshot, its parameters
    /// and the base checkpoint that governed it.
    pub fn undo(&mut self) -> bool {
        let restored = match self.history.undo() {
            Some(entry) => (entry.snapshot.clone(), entry.params.clone()),
            None => return false,
        };
        self.working = restored.0;
        self.params = restored.1;
        self.sync_base_to_history();
        true
    }

    /// Step forward one history entry.
    pub fn redo(&mut self) -> bool {
        let restored = match self.history.redo() {
            Some(entry) => (entry.snapshot.clone(), entry.params.clone()),
            None => return false,
        };
        self.working = restored.0;
        self.params = restored.1;
        self.sync_base_to_history();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn sync_base_to_history(&mut self) {
        if let Some(snapshot) = self.history.base_snapshot() {
            self.base = snapshot.clone();
        }
        self.drop_stale_selection();
    }

    fn drop_stale_selection(&mut self) {
        let stale = self
            .selection
            .as_ref()
            .is_some_and(|m| m.dimensions() != self.working.dimensions());
        if stale {
            log::debug!("selection mask dropped after dimension change");
            self.selection = None;
        }
    }

    // ------------------------------------------------------------------------
    //  Selection
    // ------------------------------------------------------------------------

    /// Install a finalized selection mask. A mask whose dimensions do not
    /// match the working buffer is ignored.
    pub fn set_selection(&mut self, mask: GrayImage) {
        if mask.dimensions() != self.working.dimensions() {
            log::warn!(
                "selection mask {}x{} does not match image {}x{}, ignored",
                mask.width(),
                mask.height(),
                self.working.width(),
                self.working.height()
            );
            return;
        }
        self.selection = Some(mask);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Fade out the selected pixels: alpha scales by the inverse mask, so a
    /// feathered selection erases softly. No selection means no change. The
    /// result is committed as a new base checkpoint and the mask consumed.
    pub fn erase_selected(&mut self) {
        let Some(mask) = self.selection.as_ref() else {
            return;
        };
        let mask_raw = mask.as_raw();
        let mut result = self.working.clone();
        for (i, px) in result.pixels_mut().enumerate() {
            let m = mask_raw[i] as f32 / 255.0;
            px.0[3] = (px.0[3] as f32 * (1.0 - m)).round() as u8;
        }
        self.commit_base(result, "erase selection");
    }

    /// Keep only the selected pixels: alpha scales by the mask and the rest
    /// of the image fades to transparent. The result is committed as a new
    /// base checkpoint and the mask consumed.
    pub fn extract_selected(&mut self) {
        let Some(mask) = self.selection.as_ref() else {
            return;
        };
        let mask_raw = mask.as_raw();
        let mut result = self.working.clone();
        for (i, px) in result.pixels_mut().enumerate() {
            let m = mask_raw[i] as f32 / 255.0;
            px.0[3] = (px.0[3] as f32 * m).round() as u8;
        }
        self.commit_base(result, "extract selection");
    }

    // ------------------------------------------------------------------------
    //  Structural edits
    // ------------------------------------------------------------------------

    /// Crop to the given rect, clamped to the buffer. Zero-area rects and
    /// rects starting outside the buffer are a silent no-op, as is a crop
    /// covering the full frame.
    pub fn crop(&mut self, x: u32, y: u32, width: u32, height: u32) {
        if x >= self.working.width() || y >= self.working.height() {
            log::debug!("crop origin outside the buffer, ignored");
            return;
        }
        let w = width.min(self.working.width() - x);
        let h = height.min(self.working.height() - y);
        if w == 0 || h == 0 {
            log::debug!("zero-area crop rect ignored");
            return;
        }
        if x == 0 && y == 0 && w == self.working.width() && h == self.working.height() {
            return;
        }
        let cropped = imageops::crop_imm(&self.working, x, y, w, h).to_image();
        self.commit_base(cropped, "crop");
    }

    /// Mirror left-right.
    pub fn flip_horizontal(&mut self) {
        let flipped = imageops::flip_horizontal(&self.working);
        self.commit_base(flipped, "flip horizontal");
    }

    /// Mirror top-bottom.
    pub fn flip_vertical(&mut self) {
        let flipped = imageops::flip_vertical(&self.working);
        self.commit_base(flipped, "flip vertical");
    }

    /// Rotate 90 degrees clockwise. Dimensions swap.
    pub fn rotate90(&mut self) {
        let rotated = imageops::rotate90(&self.working);
        self.commit_base(rotated, "rotate 90");
    }

    /// Rotate 180 degrees.
    pub fn rotate180(&mut self) {
        let rotated = imageops::rotate180(&self.working);
        self.commit_base(rotated, "rotate 180");
    }

    /// Rotate 90 degrees counter-clockwise. Dimensions swap.
    pub fn rotate270(&mut self) {
        let rotated = imageops::rotate270(&self.working);
        self.commit_base(rotated, "rotate 270");
    }

    /// Bake the current working state into a fresh base checkpoint. The
    /// parameter record resets to neutral: everything applied so far is now
    /// part of the base pixels, not pending sliders.
    fn commit_base(&mut self, committed: RgbaImage, label: &str) {
        self.base = committed.clone();
        self.working = committed;
        self.params = EffectParams::default();
        self.selection = None;
        self.history.push(HistoryEntry {
            snapshot: self.working.clone(),
            label: label.to_string(),
            is_base: true,
            params: EffectParams::default(),
        });
    }

    // ------------------------------------------------------------------------
    //  Export
    // ------------------------------------------------------------------------

    /// Encode the working buffer.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, EngineError> {
        io::encode_image(&self.working, format)
    }

    /// Encode the working buffer and write it to a file.
    pub fn export_to(&self, path: &std::path::Path, format: ExportFormat) -> Result<(), EngineError> {
        io::save_image(&self.working, path, format)
    }
}

/// The fixed pipeline every commit runs: tone passes first, then the
/// convolution passes, then threshold alpha removal last so it keys off the
/// adjusted colors. The order is part of the engine contract; repeated
/// commits of the same record are deterministic.
fn run_pipeline(src: &RgbaImage, p: &EffectParams) -> RgbaImage {
    let mut img = src.clone();

    tone::apply_tone(&mut img, p);

    if p.blur > 0.0 {
        img = convolve::convolve(&img, &Kernel::boxcar(p.blur.round() as u32));
    }
    if p.gaussian_blur > 0.0 {
        img = convolve::convolve(&img, &Kernel::gaussian(p.gaussian_blur.round() as u32));
    }
    if p.sharpen > 0.0 {
        img = convolve::convolve(&img, &Kernel::sharpen(p.sharpen / 100.0));
    }
    if p.texture != 0.0 {
        img = convolve::convolve(&img, &Kernel::texture(p.texture / 100.0));
    }
    if p.clarity != 0.0 {
        img = convolve::convolve(&img, &Kernel::clarity(p.clarity / 100.0));
    }
    if p.threshold_white > 0.0 {
        threshold::threshold_alpha_white(&mut img, p.threshold_white);
    }
    if p.threshold_black > 0.0 {
        threshold::threshold_alpha_black(&mut img, p.threshold_black);
    }

    img
}
