// ============================================================================
// TONE: color and luminance passes over the RGBA buffer
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

use crate::params::{BAND_CENTERS, EffectParams, HslMixer};

/// Run every enabled tone pass in the pipeline's fixed order:
/// brightness/contrast, dehaze, vibrance/saturation, luminance zones, then
/// the per-hue HSL remap. Passes sitting at their neutral value are skipped
/// entirely so the all-neutral record never touches a byte.
pub fn apply_tone(img: &mut RgbaImage, p: &EffectParams) {
    if p.brightness != 0.0 || p.contrast != 0.0 {
        brightness_contrast(img, p.brightness, p.contrast);
    }
    if p.dehaze != 0.0 {
        dehaze(img, p.dehaze);
    }
    if p.vibrance != 0.0 || p.saturation != 0.0 {
        vibrance_saturation(img, p.vibrance, p.saturation);
    }
    if p.highlights != 0.0 || p.shadows != 0.0 || p.whites != 0.0 || p.blacks != 0.0 {
        tone_zones(img, p.highlights, p.shadows, p.whites, p.blacks);
    }
    if !p.hsl.is_neutral() {
        hsl_remap(img, &p.hsl);
    }
}

/// Apply a per-pixel transform in place, parallel by row. `transform` maps
/// (r, g, b) as f32 to new channel values; results are rounded and clamped
/// to 0..255 and alpha is untouched.
fn transform_pixels<F>(img: &mut RgbaImage, transform: F)
where
    F: Fn(f32, f32, f32) -> (f32, f32, f32) + Sync,
{
    let w = img.width() as usize;
    if w == 0 {
        return;
    }
    let stride = w * 4;
    img.as_mut().par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let (r, g, b) = transform(px[0] as f32, px[1] as f32, px[2] as f32);
            px[0] = r.round().clamp(0.0, 255.0) as u8;
            px[1] = g.round().clamp(0.0, 255.0) as u8;
            px[2] = b.round().clamp(0.0, 255.0) as u8;
        }
    });
}

// ----------------------------------------------------------------------------
//  Brightness / Contrast
// ----------------------------------------------------------------------------

/// Brightness and contrast in one pass.
/// `brightness`: -100..100 (additive offset)
/// `contrast`: -100..100 (remapped to a multiplier around the 128 midpoint)
pub fn brightness_contrast(img: &mut RgbaImage, brightness: f32, contrast: f32) {
    let factor = (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast));
    transform_pixels(img, move |r, g, b| {
        (
            factor * (r + brightness - 128.0) + 128.0,
            factor * (g + brightness - 128.0) + 128.0,
            factor * (b + brightness - 128.0) + 128.0,
        )
    });
}

// ----------------------------------------------------------------------------
//  Dehaze
// ----------------------------------------------------------------------------

/// Dark-channel dehaze. `amount`: -100..100; positive removes haze and adds
/// a mild contrast push, negative re-introduces haze.
///
/// The atmospheric light is estimated as the brightest of every 100th pixel,
/// then each pixel is recovered through the transmission map derived from
/// its dark channel.
pub fn dehaze(img: &mut RgbaImage, amount: f32) {
    let strength = amount / 100.0;
    if strength == 0.0 {
        return;
    }

    let raw = img.as_raw();
    let pixel_count = (img.width() * img.height()) as usize;
    let mut max_brightness = 0.0f32;
    let mut light = [255.0f32; 3];
    for i in (0..pixel_count).step_by(100) {
        let o = i * 4;
        let brightness = (raw[o] as f32 + raw[o + 1] as f32 + raw[o + 2] as f32) / 3.0;
        if brightness > max_brightness {
            max_brightness = brightness;
            light = [raw[o] as f32, raw[o + 1] as f32, raw[o + 2] as f32];
        }
    }
    // Near-black estimates would blow up the per-channel division below.
    let light = [light[0].max(1.0), light[1].max(1.0), light[2].max(1.0)];

    let contrast = if strength > 0.0 {
        1.0 + strength * 0.2
    } else {
        1.0
    };
    transform_pixels(img, move |r, g, b| {
        let dark = (r / light[0]).min(g / light[1]).min(b / light[2]);
        let t = (1.0 - strength * dark).max(0.1);
        let nr = (r - light[0] * (1.0 - t)) / t + light[0] * (1.0 - t);
        let ng = (g - light[1] * (1.0 - t)) / t + light[1] * (1.0 - t);
        let nb = (b - light[2] * (1.0 - t)) / t + light[2] * (1.0 - t);
        (
            (nr - 128.0) * contrast + 128.0,
            (ng - 128.0) * contrast + 128.0,
            (nb - 128.0) * contrast + 128.0,
        )
    });
}

// ----------------------------------------------------------------------------
//  Vibrance / Saturation
// ----------------------------------------------------------------------------

/// Uniform saturation scale plus selective vibrance, both in HSL space.
/// `vibrance`, `saturation`: -100..100. Vibrance weights its boost by how
/// muted a pixel already is, so saturated colors are protected from clipping;
/// negative vibrance drains the most saturated colors first.
pub fn vibrance_saturation(img: &mut RgbaImage, vibrance: f32, saturation: f32) {
    let v = vibrance / 100.0;
    let sat_factor = 1.0 + saturation / 100.0;
    transform_pixels(img, move |r, g, b| {
        let (h, s, l) = rgb_to_hsl(r / 255.0, g / 255.0, b / 255.0);
        let boost = if v >= 0.0 {
            v * (1.0 - s) * (1.0 - s)
        } else {
            v * s * s
        };
        let ns = (s * sat_factor + boost).clamp(0.0, 1.0);
        let (nr, ng, nb) = hsl_to_rgb(h, ns, l);
        (nr * 255.0, ng * 255.0, nb * 255.0)
    });
}

// ----------------------------------------------------------------------------
//  Luminance zones
// ----------------------------------------------------------------------------

/// Four luminance-band remaps in one pass; every amount is -100..100.
/// Shadows weight by (1-L)^2 and highlights by L^2; whites and blacks use
/// the 4th power so they only bite at the extremes. Each band's influence
/// vanishes at the opposite end of the range.
pub fn tone_zones(img: &mut RgbaImage, highlights: f32, shadows: f32, whites: f32, blacks: f32) {
    let highlight_amt = highlights / 100.0;
    let shadow_amt = shadows / 100.0;
    let white_amt = whites / 100.0;
    let black_amt = blacks / 100.0;
    transform_pixels(img, move |r, g, b| {
        let lum = (0.2126 * r + 0.7152 * g + 0.0722 * b) / 255.0;
        let inv = 1.0 - lum;
        let shadow_weight = inv * inv;
        let highlight_weight = lum * lum;
        let black_weight = shadow_weight * shadow_weight;
        let white_weight = highlight_weight * highlight_weight;
        let adjustment = shadow_weight * shadow_amt * 128.0
            + highlight_weight * highlight_amt * 128.0
            + black_weight * black_amt * 128.0
            + white_weight * white_amt * 128.0;
        (r + adjustment, g + adjustment, b + adjustment)
    });
}

// ----------------------------------------------------------------------------
//  Per-hue HSL remap
// ----------------------------------------------------------------------------

/// Remap hue, saturation and lightness per hue band. A pixel's deltas are
/// blended linearly between the two nearest band centers on the hue wheel,
/// so band boundaries stay smooth and a gray axis pixel (s = 0) still lands
/// in a band without visible seams.
pub fn hsl_remap(img: &mut RgbaImage, mixer: &HslMixer) {
    let mixer = *mixer;
    transform_pixels(img, move |r, g, b| {
        let (h, s, l) = rgb_to_hsl(r / 255.0, g / 255.0, b / 255.0);
        let (dh, ds, dl) = mixer_deltas(&mixer, h * 360.0);
        let nh = ((h + dh / 360.0) % 1.0 + 1.0) % 1.0;
        let ns = (s * (1.0 + ds / 100.0)).clamp(0.0, 1.0);
        let (nr, ng, nb) = hsl_to_rgb(nh, ns, l);
        let light_offset = dl * 255.0 / 100.0;
        (
            nr * 255.0 + light_offset,
            ng * 255.0 + light_offset,
            nb * 255.0 + light_offset,
        )
    });
}

/// Interpolated (hue, saturation, lightness) deltas at `hue_deg` (0..360).
/// Walks the band centers as a closed ring and lerps between the pair that
/// brackets the hue.
fn mixer_deltas(mixer: &HslMixer, hue_deg: f32) -> (f32, f32, f32) {
    let n = BAND_CENTERS.len();
    for i in 0..n {
        let c0 = BAND_CENTERS[i];
        let c1 = if i + 1 < n {
            BAND_CENTERS[i + 1]
        } else {
            BAND_CENTERS[0] + 360.0
        };
        // The last segment wraps, so hues below the first center shift up.
        let h = if i + 1 == n && hue_deg < c0 {
            hue_deg + 360.0
        } else {
            hue_deg
        };
        if h >= c0 && h < c1 {
            let t = (h - c0) / (c1 - c0);
            let a = mixer.bands[i];
            let b = mixer.bands[(i + 1) % n];
            return (
                a.hue + (b.hue - a.hue) * t,
                a.saturation + (b.saturation - a.saturation) * t,
                a.lightness + (b.lightness - a.lightness) * t,
            );
        }
    }
    (0.0, 0.0, 0.0)
}

// ----------------------------------------------------------------------------
//  Color space helpers
// ----------------------------------------------------------------------------

/// RGB (0..1) to HSL (H: 0..1, S: 0..1, L: 0..1)
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < 1e-6 {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < 1e-6 {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if (max - g).abs() < 1e-6 {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h / 6.0, s, l)
}

/// HSL (H: 0..1, S: 0..1, L: 0..1) to RGB (0..1)
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s < 1e-6 {
        return (l, l, l);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}
