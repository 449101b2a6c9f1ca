//! Thumbnail framing and headshot compositing.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbaImage};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Output width of every thumbnail.
pub const THUMBNAIL_WIDTH: u32 = 1280;

/// Output height of every thumbnail.
pub const THUMBNAIL_HEIGHT: u32 = 720;

/// Smallest headshot edge we are willing to upscale.
const MIN_HEADSHOT_EDGE: u32 = 16;

/// Corner of the frame the headshot is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Corner {
    #[default]
    BottomRight,
    BottomLeft,
}

/// Placement of a headshot on the thumbnail.
///
/// ```ignore
/// let overlay = HeadshotOverlay::default()
///     .with_corner(Corner::BottomLeft)
///     .with_height_ratio(0.5);
/// ```
#[derive(Debug, Clone)]
pub struct HeadshotOverlay {
    /// Anchor corner
    pub corner: Corner,
    /// Horizontal offset from the anchored edge (pixels)
    pub offset_x: u32,
    /// Vertical offset from the bottom edge (pixels)
    pub offset_y: u32,
    /// Headshot height as a fraction of the frame height
    pub height_ratio: f32,
}

impl Default for HeadshotOverlay {
    fn default() -> Self {
        Self {
            corner: Corner::BottomRight,
            offset_x: 40,
            offset_y: 0,
            height_ratio: 0.45,
        }
    }
}

impl HeadshotOverlay {
    pub fn with_corner(mut self, corner: Corner) -> Self {
        self.corner = corner;
        self
    }

    pub fn with_offset(mut self, x: u32, y: u32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    /// Clamped to `0.1..=1.0`.
    pub fn with_height_ratio(mut self, ratio: f32) -> Self {
        self.height_ratio = ratio.clamp(0.1, 1.0);
        self
    }

    /// Top-left position for a headshot of the given size.
    fn position(&self, width: u32, height: u32) -> (i64, i64) {
        let y = THUMBNAIL_HEIGHT as i64 - height as i64 - self.offset_y as i64;
        let x = match self.corner {
            Corner::BottomRight => THUMBNAIL_WIDTH as i64 - width as i64 - self.offset_x as i64,
            Corner::BottomLeft => self.offset_x as i64,
        };
        (x.max(0), y.max(0))
    }
}

/// Crop-to-fill generated artwork into the thumbnail frame and encode as PNG.
pub fn normalize_thumbnail(bytes: &[u8]) -> MediaResult<Vec<u8>> {
    let base = decode(bytes, "thumbnail")?;
    encode_png(&fit_frame(&base))
}

/// Paste a headshot onto a generated background.
///
/// The background is cropped to fill 1280x720; the headshot keeps its aspect
/// ratio and is scaled so its height matches `overlay.height_ratio` of the
/// frame. Transparent pixels in the headshot show the background through.
pub fn composite_headshot(
    background: &[u8],
    headshot: &[u8],
    overlay: &HeadshotOverlay,
) -> MediaResult<Vec<u8>> {
    let base = decode(background, "thumbnail")?;
    let face = decode(headshot, "headshot")?;

    let (w, h) = face.dimensions();
    if w < MIN_HEADSHOT_EDGE || h < MIN_HEADSHOT_EDGE {
        return Err(MediaError::TooSmall {
            width: w,
            height: h,
        });
    }

    let mut canvas: RgbaImage = fit_frame(&base).to_rgba8();

    let target_h = (THUMBNAIL_HEIGHT as f32 * overlay.height_ratio).round() as u32;
    let face = face
        .resize(THUMBNAIL_WIDTH / 2, target_h, FilterType::Lanczos3)
        .to_rgba8();

    let (x, y) = overlay.position(face.width(), face.height());
    debug!(
        width = face.width(),
        height = face.height(),
        x,
        y,
        "Compositing headshot"
    );
    imageops::overlay(&mut canvas, &face, x, y);

    encode_png(&DynamicImage::ImageRgba8(canvas))
}

fn decode(bytes: &[u8], what: &'static str) -> MediaResult<DynamicImage> {
    if crate::sniff::sniff_image_type(bytes).is_none() {
        return Err(MediaError::UnsupportedFormat);
    }
    image::load_from_memory(bytes).map_err(|e| MediaError::decode(what, e))
}

fn fit_frame(img: &DynamicImage) -> DynamicImage {
    if img.dimensions() == (THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT) {
        return img.clone();
    }
    img.resize_to_fill(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, FilterType::Lanczos3)
}

fn encode_png(img: &DynamicImage) -> MediaResult<Vec<u8>> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
        .map_err(MediaError::Encode)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    fn is_red(px: &Rgba<u8>) -> bool {
        px[0] > 200 && px[2] < 50
    }

    fn is_blue(px: &Rgba<u8>) -> bool {
        px[2] > 200 && px[0] < 50
    }

    #[test]
    fn test_normalize_crops_to_frame() {
        let wide = solid_png(1792, 1024, [0, 0, 255, 255]);
        let out = normalize_thumbnail(&wide).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT));
    }

    #[test]
    fn test_composite_bottom_right() {
        let bg = solid_png(640, 360, [0, 0, 255, 255]);
        let face = solid_png(100, 100, [255, 0, 0, 255]);

        let out = composite_headshot(&bg, &face, &HeadshotOverlay::default()).unwrap();
        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT));

        // 0.45 * 720 = 324px square, 40px in from the right, flush with the bottom.
        let left = THUMBNAIL_WIDTH - 40 - 324;
        assert!(is_red(img.get_pixel(left + 160, THUMBNAIL_HEIGHT - 160)));
        assert!(is_blue(img.get_pixel(left - 20, THUMBNAIL_HEIGHT - 160)));
        assert!(is_blue(img.get_pixel(20, 20)));
    }

    #[test]
    fn test_composite_bottom_left_with_offset() {
        let bg = solid_png(1280, 720, [0, 0, 255, 255]);
        let face = solid_png(200, 100, [255, 0, 0, 255]);
        let overlay = HeadshotOverlay::default()
            .with_corner(Corner::BottomLeft)
            .with_offset(10, 10)
            .with_height_ratio(0.5);

        let out = composite_headshot(&bg, &face, &overlay).unwrap();
        let img = image::load_from_memory(&out).unwrap().to_rgba8();

        // 360px tall would need 720px wide; the half-frame width bound wins.
        assert!(is_red(img.get_pixel(20, THUMBNAIL_HEIGHT - 20)));
        assert!(is_blue(img.get_pixel(5, THUMBNAIL_HEIGHT - 20)));
        assert!(is_blue(img.get_pixel(THUMBNAIL_WIDTH - 20, THUMBNAIL_HEIGHT - 20)));
    }

    #[test]
    fn test_transparent_headshot_shows_background() {
        let bg = solid_png(1280, 720, [0, 0, 255, 255]);
        let face = solid_png(100, 100, [255, 0, 0, 0]);

        let out = composite_headshot(&bg, &face, &HeadshotOverlay::default()).unwrap();
        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert!(is_blue(img.get_pixel(THUMBNAIL_WIDTH - 100, THUMBNAIL_HEIGHT - 100)));
    }

    #[test]
    fn test_rejects_tiny_headshot() {
        let bg = solid_png(1280, 720, [0, 0, 255, 255]);
        let face = solid_png(8, 8, [255, 0, 0, 255]);
        assert!(matches!(
            composite_headshot(&bg, &face, &HeadshotOverlay::default()),
            Err(MediaError::TooSmall { width: 8, height: 8 })
        ));
    }

    #[test]
    fn test_rejects_non_image() {
        let face = solid_png(100, 100, [255, 0, 0, 255]);
        assert!(matches!(
            composite_headshot(b"<html></html>", &face, &HeadshotOverlay::default()),
            Err(MediaError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_height_ratio_clamped() {
        let overlay = HeadshotOverlay::default().with_height_ratio(3.0);
        assert_eq!(overlay.height_ratio, 1.0);
    }
}
