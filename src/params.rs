// ============================================================================
// EFFECT PARAMETERS: the slider record driving the pixel pipeline
// ============================================================================

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
//  Hue bands
// ----------------------------------------------------------------------------

/// The eight mixer bands, in hue-wheel order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HueBand {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Magenta,
}

impl HueBand {
    pub const ALL: [HueBand; 8] = [
        HueBand::Red,
        HueBand::Orange,
        HueBand::Yellow,
        HueBand::Green,
        HueBand::Cyan,
        HueBand::Blue,
        HueBand::Purple,
        HueBand::Magenta,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HueBand::Red => "red",
            HueBand::Orange => "orange",
            HueBand::Yellow => "yellow",
            HueBand::Green => "green",
            HueBand::Cyan => "cyan",
            HueBand::Blue => "blue",
            HueBand::Purple => "purple",
            HueBand::Magenta => "magenta",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Hue centers in degrees for the mixer bands, in `HueBand::ALL` order.
pub(crate) const BAND_CENTERS: [f32; 8] =
    [0.0, 30.0, 60.0, 120.0, 180.0, 240.0, 280.0, 320.0];

/// Shift applied to pixels falling in one hue band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HslShift {
    /// -180..180 degrees (additive hue rotation)
    pub hue: f32,
    /// -100..100 (saturation scale)
    pub saturation: f32,
    /// -100..100 (additive lightness)
    pub lightness: f32,
}

/// Per-band HSL shifts for all eight bands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HslMixer {
    pub bands: [HslShift; 8],
}

impl HslMixer {
    pub fn band(&self, band: HueBand) -> HslShift {
        self.bands[band.index()]
    }

    pub fn band_mut(&mut self, band: HueBand) -> &mut HslShift {
        &mut self.bands[band.index()]
    }

    pub fn is_neutral(&self) -> bool {
        self.bands
            .iter()
            .all(|b| b.hue == 0.0 && b.saturation == 0.0 && b.lightness == 0.0)
    }
}

// ----------------------------------------------------------------------------
//  The parameter record
// ----------------------------------------------------------------------------

/// Every adjustment the pipeline understands, as a flat record of slider
/// values. The zero record is the neutral state and the engine treats it as
/// a pure copy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParams {
    /// -100..100 (additive offset)
    pub brightness: f32,
    /// -100..100 (multiplier around the 128 midpoint)
    pub contrast: f32,
    /// -100..100 (bright-band luminance remap)
    pub highlights: f32,
    /// -100..100 (dark-band luminance remap)
    pub shadows: f32,
    /// -100..100 (extreme bright end)
    pub whites: f32,
    /// -100..100 (extreme dark end)
    pub blacks: f32,
    /// -100..100 (saturation boost weighted toward muted colors)
    pub vibrance: f32,
    /// -100..100 (uniform saturation scale)
    pub saturation: f32,
    /// -100..100 (positive removes haze)
    pub dehaze: f32,
    /// Box blur radius in pixels, 0..50
    pub blur: f32,
    /// Gaussian blur radius in pixels, 0..50
    pub gaussian_blur: f32,
    /// 0..100 (high-pass sharpening strength)
    pub sharpen: f32,
    /// -100..100 (fine local contrast)
    pub texture: f32,
    /// -100..100 (midtone local contrast)
    pub clarity: f32,
    /// 0..100 (clear alpha above the luminance cutoff)
    pub threshold_white: f32,
    /// 0..100 (clear alpha below the luminance cutoff)
    pub threshold_black: f32,
    /// Per-hue-band HSL shifts
    pub hsl: HslMixer,
}

impl EffectParams {
    /// True when every slider sits at its neutral value.
    pub fn is_neutral(&self) -> bool {
        *self == EffectParams::default()
    }

    /// Copy of the record with every slider clamped to its documented range.
    /// Out-of-range values are corrected, never rejected.
    pub fn clamped(&self) -> EffectParams {
        let mut p = self.clone();
        p.brightness = p.brightness.clamp(-100.0, 100.0);
        p.contrast = p.contrast.clamp(-100.0, 100.0);
        p.highlights = p.highlights.clamp(-100.0, 100.0);
        p.shadows = p.shadows.clamp(-100.0, 100.0);
        p.whites = p.whites.clamp(-100.0, 100.0);
        p.blacks = p.blacks.clamp(-100.0, 100.0);
        p.vibrance = p.vibrance.clamp(-100.0, 100.0);
        p.saturation = p.saturation.clamp(-100.0, 100.0);
        p.dehaze = p.dehaze.clamp(-100.0, 100.0);
        p.blur = p.blur.clamp(0.0, 50.0);
        p.gaussian_blur = p.gaussian_blur.clamp(0.0, 50.0);
        p.sharpen = p.sharpen.clamp(0.0, 100.0);
        p.texture = p.texture.clamp(-100.0, 100.0);
        p.clarity = p.clarity.clamp(-100.0, 100.0);
        p.threshold_white = p.threshold_white.clamp(0.0, 100.0);
        p.threshold_black = p.threshold_black.clamp(0.0, 100.0);
        for band in &mut p.hsl.bands {
            band.hue = band.hue.clamp(-180.0, 180.0);
            band.saturation = band.saturation.clamp(-100.0, 100.0);
            band.lightness = band.lightness.clamp(-100.0, 100.0);
        }
        if p != *self {
            log::debug!("out-of-range parameters clamped");
        }
        p
    }

    /// Short human-readable summary of which sliders differ from `prev`,
    /// e.g. "brightness 20, saturation -35". Empty when the records match.
    pub fn diff_label(&self, prev: &EffectParams) -> String {
        let sliders = [
            ("brightness", self.brightness, prev.brightness),
            ("contrast", self.contrast, prev.contrast),
            ("highlights", self.highlights, prev.highlights),
            ("shadows", self.shadows, prev.shadows),
            ("whites", self.whites, prev.whites),
            ("blacks", self.blacks, prev.blacks),
            ("vibrance", self.vibrance, prev.vibrance),
            ("saturation", self.saturation, prev.saturation),
            ("dehaze", self.dehaze, prev.dehaze),
            ("blur", self.blur, prev.blur),
            ("gaussian blur", self.gaussian_blur, prev.gaussian_blur),
            ("sharpen", self.sharpen, prev.sharpen),
            ("texture", self.texture, prev.texture),
            ("clarity", self.clarity, prev.clarity),
            ("threshold white", self.threshold_white, prev.threshold_white),
            ("threshold black", self.threshold_black, prev.threshold_black),
        ];
        let mut parts: Vec<String> = Vec::new();
        for (name, now, before) in sliders {
            if now != before {
                parts.push(format!("{} {}", name, now));
            }
        }
        for band in HueBand::ALL {
            if self.hsl.band(band) != prev.hsl.band(band) {
                parts.push(format!("hsl {}", band.name()));
            }
        }
        parts.join(", ")
    }
}
