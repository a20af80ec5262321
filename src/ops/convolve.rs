// ============================================================================
// CONVOLUTION: kernel construction and 2D convolution with edge clamping
// ============================================================================

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

// ----------------------------------------------------------------------------
//  Kernel construction
// ----------------------------------------------------------------------------

/// An odd-sized square convolution kernel with an explicit divisor. The
/// constructors only build odd sizes, so a kernel always has a center tap.
#[derive(Clone, Debug)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
    divisor: f32,
}

impl Kernel {
    /// 1x1 pass-through kernel.
    pub fn identity() -> Self {
        Self {
            size: 1,
            weights: vec![1.0],
            divisor: 1.0,
        }
    }

    /// Uniform box kernel of the given radius (size = 2r + 1). The divisor is
    /// the tap count, so the kernel averages. Radius 0 is the identity.
    pub fn boxcar(radius: u32) -> Self {
        if radius == 0 {
            return Self::identity();
        }
        let size = radius as usize * 2 + 1;
        let count = size * size;
        Self {
            size,
            weights: vec![1.0; count],
            divisor: count as f32,
        }
    }

    /// Gaussian kernel of the given radius with sigma = max(r/3, 1),
    /// normalized through the divisor. Radius 0 is the identity.
    pub fn gaussian(radius: u32) -> Self {
        if radius == 0 {
            return Self::identity();
        }
        let size = radius as usize * 2 + 1;
        let sigma = (radius as f32 / 3.0).max(1.0);
        let s2 = 2.0 * sigma * sigma;
        let r = radius as i64;
        let mut weights = Vec::with_capacity(size * size);
        let mut sum = 0.0f32;
        for dy in -r..=r {
            for dx in -r..=r {
                let v = (-((dx * dx + dy * dy) as f32) / s2).exp();
                weights.push(v);
                sum += v;
            }
        }
        Self {
            size,
            weights,
            divisor: sum,
        }
    }

    /// 3x3 high-pass sharpen: center 1 + 4a, 4-neighbors -a.
    /// `amount`: 0..1 (0 yields the exact identity kernel).
    pub fn sharpen(amount: f32) -> Self {
        Self::cross3(1.0 + 4.0 * amount, -amount)
    }

    /// 3x3 fine local-contrast kernel: center 1 + 8s, 4-neighbors -2s.
    /// `strength`: -1..1 (negative softens, 0 is the exact identity).
    pub fn texture(strength: f32) -> Self {
        Self::cross3(1.0 + 8.0 * strength, -2.0 * strength)
    }

    /// 3x3 midtone local-contrast kernel: center 1 + 10s, 4-neighbors -2.5s.
    /// `strength`: -1..1 (negative softens, 0 is the exact identity).
    pub fn clarity(strength: f32) -> Self {
        Self::cross3(1.0 + 10.0 * strength, -2.5 * strength)
    }

    /// Cross-shaped 3x3 kernel: `center` in the middle, `edge` at the four
    /// direct neighbors, zero in the corners. Weights sum to center + 4*edge,
    /// which is 1.0 for every caller above, so the divisor stays 1.
    fn cross3(center: f32, edge: f32) -> Self {
        Self {
            size: 3,
            weights: vec![0.0, edge, 0.0, edge, center, edge, 0.0, edge, 0.0],
            divisor: 1.0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

// ----------------------------------------------------------------------------
//  Convolution
// ----------------------------------------------------------------------------

/// Convolve `src` with `kernel` over R/G/B; alpha passes through untouched.
/// Out-of-bounds taps clamp to the nearest edge pixel (edge replication) and
/// each output channel is rounded and clamped to 0..255.
pub fn convolve(src: &RgbaImage, kernel: &Kernel) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let size = kernel.size;
    let half = (size / 2) as isize;
    let inv = 1.0 / kernel.divisor;
    let weights = &kernel.weights;
    let src_raw = src.as_raw();
    let stride = w * 4;

    let mut dst_raw = vec![0u8; w * h * 4];
    dst_raw
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            for x in 0..w {
                let mut r = 0.0f32;
                let mut g = 0.0f32;
                let mut b = 0.0f32;
                let mut ki = 0;
                for ky in 0..size {
                    let sy = (y as isize + ky as isize - half).clamp(0, h as isize - 1) as usize;
                    let row_in = &src_raw[sy * stride..sy * stride + stride];
                    for kx in 0..size {
                        let kv = weights[ki];
                        ki += 1;
                        if kv == 0.0 {
                            continue;
                        }
                        let sx =
                            (x as isize + kx as isize - half).clamp(0, w as isize - 1) as usize;
                        let o = sx * 4;
                        r += row_in[o] as f32 * kv;
                        g += row_in[o + 1] as f32 * kv;
                        b += row_in[o + 2] as f32 * kv;
                    }
                }
                let o = x * 4;
                row_out[o] = (r * inv).round().clamp(0.0, 255.0) as u8;
                row_out[o + 1] = (g * inv).round().clamp(0.0, 255.0) as u8;
                row_out[o + 2] = (b * inv).round().clamp(0.0, 255.0) as u8;
                row_out[o + 3] = src_raw[y * stride + o + 3];
            }
        });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap()
}

// ----------------------------------------------------------------------------
//  Single-channel Gaussian blur (separable)
// ----------------------------------------------------------------------------

/// Separable Gaussian blur over a single-channel mask, used by feathering and
/// the morphology passes. Radius 0 returns a plain copy; otherwise a 1D
/// kernel of length 2r + 1 with sigma = max(r/3, 1) runs horizontally, then
/// vertically. Out-of-bounds taps clamp to the edge.
pub fn blur_mask(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let w = mask.width() as usize;
    let h = mask.height() as usize;
    if w == 0 || h == 0 {
        return mask.clone();
    }

    let sigma = (radius as f32 / 3.0).max(1.0);
    let kernel = gaussian_weights(radius as usize, sigma);
    let half = (kernel.len() / 2) as isize;
    let src: Vec<f32> = mask.as_raw().iter().map(|&v| v as f32).collect();

    // Horizontal pass into a float buffer.
    let mut tmp = vec![0.0f32; w * h];
    tmp.par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
        let row_in = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - half).clamp(0, w as isize - 1) as usize;
                acc += row_in[sx] * kv;
            }
            row_out[x] = acc;
        }
    });

    // Vertical pass back down to bytes.
    let mut out = vec![0u8; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as isize + ki as isize - half).clamp(0, h as isize - 1) as usize;
                acc += tmp[sy * w + x] * kv;
            }
            row_out[x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    });

    GrayImage::from_raw(w as u32, h as u32, out).unwrap()
}

/// 1D Gaussian weights of length 2*radius + 1, normalized to sum 1.
fn gaussian_weights(radius: usize, sigma: f32) -> Vec<f32> {
    let len = radius * 2 + 1;
    let s2 = 2.0 * sigma * sigma;
    let mut weights = vec![0.0f32; len];
    let mut sum = 0.0f32;
    for (i, w) in weights.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        let v = (-x * x / s2).exp();
        *w = v;
        sum += v;
    }
    let inv = 1.0 / sum;
    for w in &mut weights {
        *w *= inv;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([
                (x * 17 % 256) as u8,
                (y * 31 % 256) as u8,
                ((x + y) * 11 % 256) as u8,
                ((x * y) % 200) as u8 + 55,
            ])
        })
    }

    #[test]
    fn identity_kernel_is_byte_exact() {
        let img = gradient_image(13, 9);
        let out = convolve(&img, &Kernel::identity());
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn sharpen_amount_zero_is_byte_exact() {
        let img = gradient_image(16, 10);
        let out = convolve(&img, &Kernel::sharpen(0.0));
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn texture_and_clarity_at_zero_are_byte_exact() {
        let img = gradient_image(8, 8);
        assert_eq!(convolve(&img, &Kernel::texture(0.0)).as_raw(), img.as_raw());
        assert_eq!(convolve(&img, &Kernel::clarity(0.0)).as_raw(), img.as_raw());
    }

    #[test]
    fn sharpen_unit_amount_matches_the_classic_kernel() {
        let k = Kernel::sharpen(1.0);
        assert_eq!(k.size(), 3);
        assert_eq!(
            k.weights,
            vec![0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0]
        );
        assert_eq!(k.divisor, 1.0);
    }

    #[test]
    fn boxcar_preserves_a_uniform_image() {
        let img = RgbaImage::from_pixel(12, 12, Rgba([100, 150, 200, 255]));
        let out = convolve(&img, &Kernel::boxcar(3));
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn boxcar_radius_zero_is_the_identity() {
        let img = gradient_image(7, 7);
        let out = convolve(&img, &Kernel::boxcar(0));
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn gaussian_weights_are_normalized() {
        let k = Kernel::gaussian(4);
        let total: f32 = k.weights.iter().sum();
        assert!((total - k.divisor).abs() < 1e-4);
        // Averaging behavior: a uniform image is unchanged.
        let img = RgbaImage::from_pixel(10, 10, Rgba([42, 42, 42, 255]));
        let out = convolve(&img, &Kernel::gaussian(4));
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn convolve_leaves_alpha_untouched() {
        let img = gradient_image(9, 6);
        let out = convolve(&img, &Kernel::boxcar(2));
        for (a, b) in img.pixels().zip(out.pixels()) {
            assert_eq!(a.0[3], b.0[3]);
        }
    }

    #[test]
    fn convolve_survives_tiny_images() {
        let one = RgbaImage::from_pixel(1, 1, Rgba([9, 9, 9, 9]));
        let out = convolve(&one, &Kernel::gaussian(5));
        assert_eq!(out.as_raw(), one.as_raw());

        let thin = gradient_image(3, 1);
        let out = convolve(&thin, &Kernel::boxcar(2));
        assert_eq!(out.dimensions(), (3, 1));
    }

    #[test]
    fn blur_mask_radius_zero_is_a_copy() {
        let mask = GrayImage::from_fn(6, 6, |x, y| image::Luma([((x + y) * 20) as u8]));
        assert_eq!(blur_mask(&mask, 0).as_raw(), mask.as_raw());
    }

    #[test]
    fn blur_mask_preserves_uniform_masks() {
        let full = GrayImage::from_pixel(8, 8, image::Luma([255]));
        assert_eq!(blur_mask(&full, 3).as_raw(), full.as_raw());
        let empty = GrayImage::new(8, 8);
        assert!(blur_mask(&empty, 3).as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn blur_mask_softens_a_hard_edge() {
        let mut mask = GrayImage::new(11, 11);
        for y in 0..11 {
            for x in 0..5 {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
        let soft = blur_mask(&mask, 3);
        let has_gradient = soft.as_raw().iter().any(|&v| v > 0 && v < 255);
        assert!(has_gradient);
    }
}
