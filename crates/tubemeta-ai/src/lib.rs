//! Clients for the external AI services.
//!
//! This crate provides:
//! - An OpenAI-compatible chat-completion client (text and vision prompts)
//! - An OpenAI-compatible image-generation client
//! - Classification of upstream failures into safe, user-facing categories
//! - A download guard that refuses redirects and internal addresses
//!
//! Both clients are thin: no retries, no fallbacks. A failed call surfaces as
//! an [`AiError`] the API layer maps to a response.

pub mod chat;
pub mod config;
pub mod error;
pub mod guard;
pub mod images;
pub mod types;

pub use chat::{parse_json_reply, ChatClient};
pub use config::AiConfig;
pub use error::{AiError, AiResult};
pub use guard::{is_internal_ip, PublicResolver};
pub use images::{GeneratedImage, ImageClient, ImagePayload};
