//! Thumbnail derivation.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, imageops::FilterType};
use sfumato_error::{StorageError, StorageErrorKind};

/// Longest edge of a thumbnail, in pixels.
pub const THUMBNAIL_MAX_EDGE: u32 = 400;

const THUMBNAIL_QUALITY: u8 = 80;

/// Decoded dimensions of an original and its JPEG thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Width of the original
    pub width: u32,
    /// Height of the original
    pub height: u32,
    /// Encoded JPEG bytes
    pub jpeg: Vec<u8>,
}

/// Decode `bytes` and render a JPEG thumbnail whose longest edge is at most
/// [`THUMBNAIL_MAX_EDGE`]. Smaller images keep their size.
///
/// CPU bound; call from a blocking task.
pub fn render_thumbnail(bytes: &[u8]) -> Result<Thumbnail, StorageError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| StorageError::new(StorageErrorKind::ImageDecode(e.to_string())))?;
    let (width, height) = img.dimensions();

    let scaled = if width > THUMBNAIL_MAX_EDGE || height > THUMBNAIL_MAX_EDGE {
        img.resize(THUMBNAIL_MAX_EDGE, THUMBNAIL_MAX_EDGE, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());
    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, THUMBNAIL_QUALITY))
        .map_err(|e| StorageError::new(StorageErrorKind::Thumbnail(e.to_string())))?;

    Ok(Thumbnail {
        width,
        height,
        jpeg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 90, 128]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn large_image_is_bounded() {
        let thumb = render_thumbnail(&png(1000, 500)).unwrap();
        assert_eq!((thumb.width, thumb.height), (1000, 500));

        let decoded = image::load_from_memory(&thumb.jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (400, 200));
    }

    #[test]
    fn small_image_keeps_size() {
        let thumb = render_thumbnail(&png(32, 48)).unwrap();
        let decoded = image::load_from_memory(&thumb.jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (32, 48));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = render_thumbnail(b"definitely not an image").unwrap_err();
        assert!(matches!(err.kind, StorageErrorKind::ImageDecode(_)));
    }
}
