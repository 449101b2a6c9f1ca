//! Image processing for generated thumbnails.
//!
//! This crate provides:
//! - Content sniffing for uploaded images
//! - Normalization of generated artwork to the 1280x720 thumbnail frame
//! - Headshot compositing onto a generated background
//!
//! Everything here is CPU-bound and synchronous; callers on an async runtime
//! should run it on a blocking thread.

pub mod composite;
pub mod error;
pub mod sniff;

pub use composite::{
    composite_headshot, normalize_thumbnail, Corner, HeadshotOverlay, THUMBNAIL_HEIGHT,
    THUMBNAIL_WIDTH,
};
pub use error::{MediaError, MediaResult};
pub use sniff::sniff_image_type;
