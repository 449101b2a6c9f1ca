//! Magic-byte detection for uploaded images.

use image::ImageFormat;

/// Detect the MIME type of an image from its leading bytes.
///
/// Only the formats accepted for headshot uploads are recognised; anything
/// else returns `None` regardless of what the client claimed.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_png() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff_image_type(&png), Some("image/png"));
    }

    #[test]
    fn test_sniff_jpeg() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
        assert_eq!(sniff_image_type(&jpeg), Some("image/jpeg"));
    }

    #[test]
    fn test_sniff_rejects_gif_and_text() {
        assert_eq!(sniff_image_type(b"GIF89a......"), None);
        assert_eq!(sniff_image_type(b"<svg xmlns="), None);
        assert_eq!(sniff_image_type(b""), None);
    }
}
