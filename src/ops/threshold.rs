// ============================================================================
// THRESHOLD ALPHA: luminance-keyed background removal
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// Clear alpha on every pixel brighter than the slider's luminance cutoff.
/// `slider`: 0..100; 0 keeps everything, 100 clears all but pure black. The
/// cutoff is 255 - slider * 2.55, compared against BT.709 luminance, one
/// pixel at a time with no neighborhood context.
pub fn threshold_alpha_white(img: &mut RgbaImage, slider: f32) {
    if slider <= 0.0 {
        return;
    }
    let cutoff = 255.0 - slider * 2.55;
    clear_alpha_where(img, move |lum| lum > cutoff);
}

/// Clear alpha on every pixel darker than the slider's luminance cutoff.
/// `slider`: 0..100; 0 keeps everything, 100 clears all but pure white. The
/// cutoff is slider * 2.55.
pub fn threshold_alpha_black(img: &mut RgbaImage, slider: f32) {
    if slider <= 0.0 {
        return;
    }
    let cutoff = slider * 2.55;
    clear_alpha_where(img, move |lum| lum < cutoff);
}

fn clear_alpha_where<F>(img: &mut RgbaImage, keyed: F)
where
    F: Fn(f32) -> bool + Sync,
{
    let w = img.width() as usize;
    if w == 0 {
        return;
    }
    let stride = w * 4;
    img.as_mut().par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let lum = 0.2126 * px[0] as f32 + 0.7152 * px[1] as f32 + 0.0722 * px[2] as f32;
            if keyed(lum) {
                px[3] = 0;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn slider_zero_touches_nothing() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([250, 250, 250, 200]));
        let mut out = img.clone();
        threshold_alpha_white(&mut out, 0.0);
        threshold_alpha_black(&mut out, 0.0);
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn white_removal_keys_bright_pixels_only() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 0, Rgba([30, 30, 30, 255]));
        threshold_alpha_white(&mut img, 20.0);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(1, 0).0[3], 255);
    }

    #[test]
    fn black_removal_keys_dark_pixels_only() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([240, 240, 240, 255]));
        threshold_alpha_black(&mut img, 20.0);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(1, 0).0[3], 255);
    }

    #[test]
    fn full_white_slider_spares_pure_black() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([1, 1, 1, 255]));
        threshold_alpha_white(&mut img, 100.0);
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
        assert_eq!(img.get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn color_channels_survive_removal() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([250, 250, 250, 255]));
        threshold_alpha_white(&mut img, 50.0);
        let px = img.get_pixel(1, 1).0;
        assert_eq!(&px[..3], &[250, 250, 250]);
        assert_eq!(px[3], 0);
    }
}
