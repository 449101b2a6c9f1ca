//! Business logic services.

pub mod prompts;
pub mod sweeper;
pub mod thumbnails;
pub mod upstream;

pub use sweeper::LimiterSweeper;
pub use thumbnails::{render_thumbnail, store_headshot, RenderedThumbnail};
pub use upstream::{enforce_api_limit, timed};
