//! Cloudflare R2 storage client.
//!
//! This crate provides:
//! - Byte uploads to an S3-compatible bucket
//! - Public CDN URL construction for uploaded objects
//! - The [`ObjectStore`] seam the API server uploads through

pub mod client;
pub mod error;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use store::{object_key, ObjectStore};
