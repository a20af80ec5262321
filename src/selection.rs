// ============================================================================
// SELECTION: state machine, shape rasterization, flood fill, mask morphology
// ============================================================================

use image::{GrayImage, Luma, RgbaImage};

use crate::ops::convolve::blur_mask;

// ----------------------------------------------------------------------------
//  State machine
// ----------------------------------------------------------------------------

/// Which selection tool is driving the pointer gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionTool {
    #[default]
    Rectangle,
    Ellipse,
    Lasso,
    Polygon,
    MagicWand,
}

/// Lifecycle phase of the current gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionPhase {
    #[default]
    Idle,
    Active,
    Finalized,
}

/// Pointer-driven selection builder. Callers feed pointer positions through
/// `begin`/`update` and call `finish` against the rendered pixels to obtain
/// an 8-bit coverage mask (255 = selected, 0 = not).
///
/// Coordinates are continuous; rasterization happens only at `finish`, so
/// the gesture can be replayed against any buffer of matching dimensions.
#[derive(Clone, Debug, Default)]
pub struct SelectionEngine {
    tool: SelectionTool,
    phase: SelectionPhase,
    anchor: (f32, f32),
    end: (f32, f32),
    points: Vec<(f32, f32)>,
    /// Feather radius in pixels, applied to the finalized mask.
    pub feather_radius: u32,
    /// Magic wand color threshold: Euclidean RGB distance, 0..~441.
    pub tolerance: f32,
}

impl SelectionEngine {
    pub fn new(tool: SelectionTool) -> Self {
        Self {
            tool,
            ..Self::default()
        }
    }

    pub fn tool(&self) -> SelectionTool {
        self.tool
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    /// Switch tools, discarding any gesture in progress.
    pub fn set_tool(&mut self, tool: SelectionTool) {
        if self.tool != tool {
            self.clear();
            self.tool = tool;
        }
    }

    /// Drop all gesture state and return to Idle.
    pub fn clear(&mut self) {
        self.phase = SelectionPhase::Idle;
        self.anchor = (0.0, 0.0);
        self.end = (0.0, 0.0);
        self.points.clear();
    }

    /// Record the gesture's starting point and go Active. A begin while
    /// Active or Finalized starts the gesture over.
    pub fn begin(&mut self, x: f32, y: f32) {
        self.clear();
        self.phase = SelectionPhase::Active;
        self.anchor = (x, y);
        self.end = (x, y);
        self.points.push((x, y));
    }

    /// Accumulate a pointer position: the opposite corner for rectangle and
    /// ellipse, a new vertex for lasso and polygon, the seed for the magic
    /// wand. Ignored unless a gesture is Active.
    pub fn update(&mut self, x: f32, y: f32) {
        if self.phase != SelectionPhase::Active {
            return;
        }
        match self.tool {
            SelectionTool::Rectangle | SelectionTool::Ellipse => self.end = (x, y),
            SelectionTool::Lasso | SelectionTool::Polygon => self.points.push((x, y)),
            SelectionTool::MagicWand => {
                self.anchor = (x, y);
                self.end = (x, y);
            }
        }
    }

    /// Rasterize the gesture against `target` and go Finalized. Degenerate
    /// geometry (zero-area rectangle or ellipse, polygon with fewer than 3
    /// vertices, wand seed outside the buffer) yields `None` rather than an
    /// error. A nonzero feather radius softens the finished mask.
    pub fn finish(&mut self, target: &RgbaImage) -> Option<GrayImage> {
        if self.phase != SelectionPhase::Active {
            return None;
        }
        self.phase = SelectionPhase::Finalized;

        let (w, h) = target.dimensions();
        if w == 0 || h == 0 {
            return None;
        }

        let mask = match self.tool {
            SelectionTool::Rectangle => fill_rectangle(w, h, self.anchor, self.end),
            SelectionTool::Ellipse => fill_ellipse(w, h, self.anchor, self.end),
            SelectionTool::Lasso | SelectionTool::Polygon => fill_polygon(w, h, &self.points),
            SelectionTool::MagicWand => {
                let sx = self.anchor.0.round();
                let sy = self.anchor.1.round();
                if sx < 0.0 || sy < 0.0 {
                    log::debug!("magic wand seed outside the buffer, no selection");
                    None
                } else {
                    magic_wand(target, sx as u32, sy as u32, self.tolerance)
                }
            }
        }?;

        if self.feather_radius > 0 {
            return Some(feather(&mask, self.feather_radius));
        }
        Some(mask)
    }
}

// ----------------------------------------------------------------------------
//  Shape rasterization
// ----------------------------------------------------------------------------

fn fill_rectangle(w: u32, h: u32, a: (f32, f32), b: (f32, f32)) -> Option<GrayImage> {
    let x0 = a.0.min(b.0).floor().clamp(0.0, w as f32) as u32;
    let y0 = a.1.min(b.1).floor().clamp(0.0, h as f32) as u32;
    let x1 = a.0.max(b.0).ceil().clamp(0.0, w as f32) as u32;
    let y1 = a.1.max(b.1).ceil().clamp(0.0, h as f32) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let mut mask = GrayImage::new(w, h);
    for y in y0..y1 {
        for x in x0..x1 {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    Some(mask)
}

fn fill_ellipse(w: u32, h: u32, a: (f32, f32), b: (f32, f32)) -> Option<GrayImage> {
    let cx = (a.0 + b.0) * 0.5;
    let cy = (a.1 + b.1) * 0.5;
    let rx = (a.0 - b.0).abs() * 0.5;
    let ry = (a.1 - b.1).abs() * 0.5;
    if rx < 0.5 || ry < 0.5 {
        return None;
    }

    let y0 = (cy - ry).floor().clamp(0.0, h as f32) as u32;
    let y1 = ((cy + ry).ceil() + 1.0).clamp(0.0, h as f32) as u32;
    let x0 = (cx - rx).floor().clamp(0.0, w as f32) as u32;
    let x1 = ((cx + rx).ceil() + 1.0).clamp(0.0, w as f32) as u32;

    let mut mask = GrayImage::new(w, h);
    let mut any = false;
    for y in y0..y1 {
        let dy = (y as f32 + 0.5 - cy) / ry;
        for x in x0..x1 {
            let dx = (x as f32 + 0.5 - cx) / rx;
            if dx * dx + dy * dy <= 1.0 {
                mask.put_pixel(x, y, Luma([255]));
                any = true;
            }
        }
    }
    if any { Some(mask) } else { None }
}

/// Even-odd scanline fill of the closed polygon through the pixel centers.
/// Fewer than 3 vertices is degenerate and yields no mask.
fn fill_polygon(w: u32, h: u32, points: &[(f32, f32)]) -> Option<GrayImage> {
    if points.len() < 3 {
        log::debug!("polygon with {} vertices ignored", points.len());
        return None;
    }
    let n = points.len();
    let mut mask = GrayImage::new(w, h);
    let mut any = false;
    let mut nodes: Vec<f32> = Vec::new();
    for y in 0..h {
        let yf = y as f32 + 0.5;
        nodes.clear();
        for i in 0..n {
            let j = (i + 1) % n;
            let (xi, yi) = points[i];
            let (xj, yj) = points[j];
            if (yi < yf && yj >= yf) || (yj < yf && yi >= yf) {
                let t = (yf - yi) / (yj - yi);
                nodes.push(xi + t * (xj - xi));
            }
        }
        nodes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mut k = 0;
        while k + 1 < nodes.len() {
            let x_start = (nodes[k].max(0.0) as u32).min(w);
            let x_end = ((nodes[k + 1] + 1.0).max(0.0) as u32).min(w);
            for x in x_start..x_end {
                mask.put_pixel(x, y, Luma([255]));
                any = true;
            }
            k += 2;
        }
    }
    if any { Some(mask) } else { None }
}

// ----------------------------------------------------------------------------
//  Magic wand flood fill
// ----------------------------------------------------------------------------

/// Flood fill outward from the seed. A pixel joins the region iff its
/// Euclidean RGB distance from the seed color is within `tolerance`;
/// connectivity is 4-way. The mask doubles as the visited set and the
/// explicit stack holds packed flat indices, so each pixel is visited at
/// most once and deep regions cannot overflow the call stack.
fn magic_wand(target: &RgbaImage, start_x: u32, start_y: u32, tolerance: f32) -> Option<GrayImage> {
    let (w, h) = target.dimensions();
    if start_x >= w || start_y >= h {
        log::debug!("magic wand seed outside the buffer, no selection");
        return None;
    }
    let wu = w as usize;
    let hu = h as usize;

    let flat = target.as_raw();
    let mut mask = vec![0u8; wu * hu];

    let seed_idx = start_y as usize * wu + start_x as usize;
    let o = seed_idx * 4;
    let seed = [flat[o], flat[o + 1], flat[o + 2]];
    let tol = tolerance.max(0.0);
    let tol_sq = tol * tol;

    #[inline(always)]
    fn matches(flat: &[u8], idx: usize, seed: [u8; 3], tol_sq: f32) -> bool {
        let o = idx * 4;
        let dr = flat[o] as f32 - seed[0] as f32;
        let dg = flat[o + 1] as f32 - seed[1] as f32;
        let db = flat[o + 2] as f32 - seed[2] as f32;
        dr * dr + dg * dg + db * db <= tol_sq
    }

    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    mask[seed_idx] = 255;
    stack.push(seed_idx as u32);

    while let Some(idx) = stack.pop() {
        let idx = idx as usize;
        let x = idx % wu;
        let y = idx / wu;

        if x > 0 {
            let ni = idx - 1;
            if mask[ni] == 0 && matches(flat, ni, seed, tol_sq) {
                mask[ni] = 255;
                stack.push(ni as u32);
            }
        }
        if x + 1 < wu {
            let ni = idx + 1;
            if mask[ni] == 0 && matches(flat, ni, seed, tol_sq) {
                mask[ni] = 255;
                stack.push(ni as u32);
            }
        }
        if y > 0 {
            let ni = idx - wu;
            if mask[ni] == 0 && matches(flat, ni, seed, tol_sq) {
                mask[ni] = 255;
                stack.push(ni as u32);
            }
        }
        if y + 1 < hu {
            let ni = idx + wu;
            if mask[ni] == 0 && matches(flat, ni, seed, tol_sq) {
                mask[ni] = 255;
                stack.push(ni as u32);
            }
        }
    }

    GrayImage::from_raw(w, h, mask)
}

// ----------------------------------------------------------------------------
//  Mask morphology
// ----------------------------------------------------------------------------

/// Soften the mask edge with a Gaussian blur, keeping the resulting gradient
/// as partial coverage. Radius 0 is a true pass-through.
pub fn feather(mask: &GrayImage, radius: u32) -> GrayImage {
    blur_mask(mask, radius)
}

/// Dilate by blur-then-threshold at 50% gray, back to a hard-edged mask.
/// Radius 0 is a true pass-through.
pub fn expand(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let mut out = blur_mask(mask, radius);
    for px in out.pixels_mut() {
        px.0[0] = if px.0[0] >= 128 { 255 } else { 0 };
    }
    out
}

/// Erode: invert, dilate, invert back. Radius 0 is a true pass-through.
pub fn contract(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    invert(&expand(&invert(mask), radius))
}

/// Per-pixel 255-minus. Applying it twice restores the input byte-for-byte.
pub fn invert(mask: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    for px in out.pixels_mut() {
        px.0[0] = 255 - px.0[0];
    }
    out
}
