// ============================================================================
// IMAGE IO: decode/encode boundary and the engine error type
// ============================================================================

use std::fs;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbaImage};

// ----------------------------------------------------------------------------
//  Error type
// ----------------------------------------------------------------------------

/// Error type for engine operations. Decode and encode failures stay
/// distinct from plain I/O so callers can tell a corrupt file from a
/// missing one.
#[derive(Debug)]
pub enum EngineError {
    Io(std::io::Error),
    Decode(String),
    Encode(String),
    InvalidBuffer { width: u32, height: u32, len: usize },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Io(e) => write!(f, "I/O error: {}", e),
            EngineError::Decode(e) => write!(f, "Decode error: {}", e),
            EngineError::Encode(e) => write!(f, "Encode error: {}", e),
            EngineError::InvalidBuffer { width, height, len } => write!(
                f,
                "Invalid buffer: {} bytes for {}x{} (expected {})",
                len,
                width,
                height,
                *width as usize * *height as usize * 4
            ),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}

// ----------------------------------------------------------------------------
//  Decode
// ----------------------------------------------------------------------------

/// Decode an in-memory image (any format with a registered decoder) into an
/// RGBA buffer.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, EngineError> {
    match image::load_from_memory(bytes) {
        Ok(img) => Ok(img.to_rgba8()),
        Err(e) => {
            log::warn!("image decode failed: {}", e);
            Err(EngineError::Decode(e.to_string()))
        }
    }
}

/// Read and decode an image file.
pub fn load_image(path: &Path) -> Result<RgbaImage, EngineError> {
    let bytes = fs::read(path)?;
    decode_image(&bytes)
}

/// Reconstruct an RGBA buffer from raw bytes, verifying the length matches
/// the dimensions exactly.
pub fn image_from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<RgbaImage, EngineError> {
    let len = data.len();
    let expected = width as usize * height as usize * 4;
    if len != expected {
        return Err(EngineError::InvalidBuffer { width, height, len });
    }
    RgbaImage::from_raw(width, height, data).ok_or(EngineError::InvalidBuffer {
        width,
        height,
        len,
    })
}

// ----------------------------------------------------------------------------
//  Encode
// ----------------------------------------------------------------------------

/// Export encoding for the working buffer. Quality applies to JPEG only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg { quality: u8 },
}

/// Encode to an in-memory blob. JPEG has no alpha channel, so RGBA flattens
/// to RGB first.
pub fn encode_image(image: &RgbaImage, format: ExportFormat) -> Result<Vec<u8>, EngineError> {
    let mut buf = Vec::new();
    match format {
        ExportFormat::Png => {
            let encoder = PngEncoder::new(&mut buf);
            #[allow(deprecated)]
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(|e| {
                    log::warn!("png encode failed: {}", e);
                    EngineError::Encode(e.to_string())
                })?;
        }
        ExportFormat::Jpeg { quality } => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder
                .encode(
                    rgb_image.as_raw(),
                    rgb_image.width(),
                    rgb_image.height(),
                    image::ColorType::Rgb8,
                )
                .map_err(|e| {
                    log::warn!("jpeg encode failed: {}", e);
                    EngineError::Encode(e.to_string())
                })?;
        }
    }
    Ok(buf)
}

/// Encode and write to a file.
pub fn save_image(image: &RgbaImage, path: &Path, format: ExportFormat) -> Result<(), EngineError> {
    let blob = encode_image(image, format)?;
    fs::write(path, blob)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn garbage_bytes_fail_with_a_decode_error() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn missing_file_fails_with_an_io_error() {
        let err = load_image(Path::new("/no/such/file.png")).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn png_encode_round_trips() {
        let img = RgbaImage::from_fn(5, 3, |x, y| {
            Rgba([(x * 40) as u8, (y * 80) as u8, 128, 255])
        });
        let blob = encode_image(&img, ExportFormat::Png).unwrap();
        let back = decode_image(&blob).unwrap();
        assert_eq!(back.dimensions(), (5, 3));
        assert_eq!(back.as_raw(), img.as_raw());
    }

    #[test]
    fn jpeg_encode_produces_a_decodable_blob() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 255]));
        let blob = encode_image(&img, ExportFormat::Jpeg { quality: 90 }).unwrap();
        let back = decode_image(&blob).unwrap();
        assert_eq!(back.dimensions(), (8, 8));
    }

    #[test]
    fn from_raw_rejects_mismatched_lengths() {
        let err = image_from_raw(4, 4, vec![0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidBuffer {
                width: 4,
                height: 4,
                len: 10
            }
        ));
        assert!(image_from_raw(2, 2, vec![0u8; 16]).is_ok());
    }

    #[test]
    fn errors_render_a_readable_message() {
        let err = EngineError::InvalidBuffer {
            width: 2,
            height: 2,
            len: 3,
        };
        let text = err.to_string();
        assert!(text.contains("2x2"));
        assert!(text.contains("expected 16"));
    }
}
