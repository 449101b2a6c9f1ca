//! Shared data models for the tubemeta backend.
//!
//! This crate provides Serde-serializable types for:
//! - Login and session status bodies
//! - Transcript analysis requests and the generated YouTube metadata
//! - Style analysis and thumbnail generation requests
//! - Chapter timestamp parsing and normalization
//!
//! Every request type rejects unknown fields and exposes a `validate` method
//! that returns a normalized, owned view of the request.

pub mod auth;
pub mod metadata;
pub mod style;
pub mod thumbnail;
pub mod timestamp;
pub mod validation;

// Re-export common types
pub use auth::{AuthStatusResponse, LoginRequest, SuccessResponse};
pub use metadata::{
    AnalyzeTranscriptRequest, AnalyzeTranscriptResponse, ThumbnailConcept, TimelineEntry,
    TranscriptJob, VideoDuration, VideoMetadata,
};
pub use style::{SampleImage, StyleAnalysisRequest, StyleAnalysisResponse};
pub use thumbnail::{
    is_allowed_headshot_type, HeadshotUploadResponse, ThumbnailRequest, ThumbnailResponse,
    ThumbnailSpec, ALLOWED_HEADSHOT_TYPES,
};
pub use timestamp::{format_chapter_timestamp, parse_timestamp, TimestampError};
pub use validation::{ValidationError, ValidationResult};
