// ============================================================================
// PIXEL OPERATIONS: the per-buffer transform passes
// ============================================================================
//
// Architecture:
//   convolve.rs  - kernel construction and 2D convolution
//   tone.rs      - color and luminance passes (HSL based)
//   threshold.rs - luminance-keyed alpha removal
//
// Every pass either mutates an `RgbaImage` in place or maps one buffer to a
// fresh buffer of the same dimensions. Alpha is never touched except by the
// threshold pass.

pub mod convolve;
pub mod threshold;
pub mod tone;
