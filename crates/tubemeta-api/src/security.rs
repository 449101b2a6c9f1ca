//! Security utilities for input validation and sanitization.
//!
//! This module provides:
//! - Image URL validation (SSRF protection) for URLs the server fetches
//! - Return-target sanitization for the login redirect (open-redirect protection)
//! - HTML escaping for values echoed into server-rendered pages

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use url::{Host, Url};

use tubemeta_ai::is_internal_ip;

/// Maximum URL length to prevent DoS attacks.
const MAX_URL_LENGTH: usize = 2048;

/// Blocked URL patterns (sensitive endpoints).
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Internal IP ranges
        r"^https?://127\.",
        r"^https?://localhost",
        r"^https?://0\.",
        r"^https?://10\.",
        r"^https?://172\.(1[6-9]|2[0-9]|3[0-1])\.",
        r"^https?://192\.168\.",
        r"^https?://169\.254\.",
        r"^https?://\[::1\]",
        r"^https?://\[fd",
        r"^https?://\[fe80",
        // Cloud metadata endpoints
        r"^https?://metadata\.",
        r"^https?://metadata\.google\.internal",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Result of URL validation.
#[derive(Debug)]
pub enum UrlValidationResult {
    /// URL is valid and allowed.
    Valid(Url),
    /// URL is malformed or uses an unsupported protocol.
    Invalid(String),
    /// URL host is not the one images must come from.
    HostNotAllowed(String),
    /// URL targets an internal address.
    Blocked(String),
    /// URL exceeds maximum length.
    TooLong,
}

impl UrlValidationResult {
    /// Convert to Result for easy error handling.
    pub fn into_result(self) -> Result<Url, String> {
        match self {
            Self::Valid(url) => Ok(url),
            Self::Invalid(msg) => Err(msg),
            Self::HostNotAllowed(host) => Err(format!("Images from '{}' are not allowed", host)),
            Self::Blocked(reason) => Err(reason),
            Self::TooLong => Err(format!(
                "URL exceeds maximum length of {} characters",
                MAX_URL_LENGTH
            )),
        }
    }
}

/// Validate a URL the server is about to fetch an image from.
///
/// Only `https` is accepted, internal and metadata hosts are refused, and when
/// `allowed_host` is given the URL must be served from exactly that host.
pub fn validate_image_url(url: &str, allowed_host: Option<&str>) -> UrlValidationResult {
    if url.len() > MAX_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let url = url.trim();
    if url.is_empty() {
        return UrlValidationResult::Invalid("URL cannot be empty".to_string());
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL format: {}", e)),
    };

    if parsed.scheme() != "https" {
        return UrlValidationResult::Invalid(format!(
            "Invalid protocol '{}'. Only HTTPS image URLs are allowed.",
            parsed.scheme()
        ));
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return UrlValidationResult::Invalid("URLs with credentials are not allowed".to_string());
    }

    let lowered = url.to_ascii_lowercase();
    let blocked = BLOCKED_PATTERNS.iter().any(|p| p.is_match(&lowered))
        || match parsed.host() {
            Some(Host::Ipv4(ip)) => is_internal_ip(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => is_internal_ip(IpAddr::V6(ip)),
            Some(Host::Domain(d)) => d.ends_with(".internal") || d.ends_with(".local"),
            None => false,
        };
    if blocked {
        warn!(url = %url, "Blocked URL pattern detected");
        return UrlValidationResult::Blocked(
            "URL appears to target an internal or restricted endpoint".to_string(),
        );
    }

    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return UrlValidationResult::Invalid("URL must have a valid host".to_string()),
    };

    if let Some(allowed) = allowed_host {
        if !host.eq_ignore_ascii_case(allowed) {
            return UrlValidationResult::HostNotAllowed(host);
        }
    }

    UrlValidationResult::Valid(parsed)
}

/// Reduce a login `from` parameter to a safe same-origin path.
///
/// Only paths starting with a single `/` survive. Protocol-relative URLs
/// (`//host`), backslash tricks (`/\host`), absolute URLs and anything with
/// control characters fall back to `/`.
pub fn sanitize_return_to(from: Option<&str>) -> String {
    let Some(from) = from.map(str::trim) else {
        return "/".to_string();
    };

    let safe = from.starts_with('/')
        && !from.starts_with("//")
        && !from.starts_with("/\\")
        && !from.chars().any(|c| c.is_control() || c == '\\')
        && from.len() <= MAX_URL_LENGTH;

    if safe {
        from.to_string()
    } else {
        "/".to_string()
    }
}

/// Escape text for inclusion in HTML element content or a quoted attribute.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_image_urls() {
        assert!(matches!(
            validate_image_url("https://i.ytimg.com/vi/abc/maxresdefault.jpg", None),
            UrlValidationResult::Valid(_)
        ));
        assert!(matches!(
            validate_image_url("https://cdn.example.com/headshots/a.png", Some("cdn.example.com")),
            UrlValidationResult::Valid(_)
        ));
    }

    #[test]
    fn test_blocked_internal_hosts() {
        for url in [
            "https://127.0.0.1/a.png",
            "https://localhost/a.png",
            "https://192.168.1.1/a.png",
            "https://169.254.169.254/latest/meta-data/",
            "https://[::1]/a.png",
            "https://[::ffff:10.0.0.1]/a.png",
            "https://metadata.google.internal/a.png",
            "https://100.64.0.1/a.png",
        ] {
            assert!(
                matches!(validate_image_url(url, None), UrlValidationResult::Blocked(_)),
                "{} was not blocked",
                url
            );
        }
    }

    #[test]
    fn test_invalid_protocols() {
        assert!(matches!(
            validate_image_url("http://example.com/a.png", None),
            UrlValidationResult::Invalid(_)
        ));
        assert!(matches!(
            validate_image_url("file:///etc/passwd", None),
            UrlValidationResult::Invalid(_)
        ));
        assert!(matches!(
            validate_image_url("javascript:alert(1)", None),
            UrlValidationResult::Invalid(_)
        ));
    }

    #[test]
    fn test_credentials_rejected() {
        assert!(matches!(
            validate_image_url("https://user:pw@example.com/a.png", None),
            UrlValidationResult::Invalid(_)
        ));
    }

    #[test]
    fn test_host_restriction() {
        assert!(matches!(
            validate_image_url("https://evil.com/a.png", Some("cdn.example.com")),
            UrlValidationResult::HostNotAllowed(_)
        ));
        assert!(matches!(
            validate_image_url("https://cdn.example.com.evil.com/a.png", Some("cdn.example.com")),
            UrlValidationResult::HostNotAllowed(_)
        ));
    }

    #[test]
    fn test_too_long() {
        let url = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(
            validate_image_url(&url, None),
            UrlValidationResult::TooLong
        ));
    }

    #[test]
    fn test_sanitize_return_to() {
        assert_eq!(sanitize_return_to(Some("/")), "/");
        assert_eq!(sanitize_return_to(Some("/app?tab=1")), "/app?tab=1");
        assert_eq!(sanitize_return_to(Some("//evil.com")), "/");
        assert_eq!(sanitize_return_to(Some("/\\evil.com")), "/");
        assert_eq!(sanitize_return_to(Some("https://evil.com")), "/");
        assert_eq!(sanitize_return_to(Some("/a\r\nSet-Cookie: x")), "/");
        assert_eq!(sanitize_return_to(Some("")), "/");
        assert_eq!(sanitize_return_to(None), "/");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"/"><script>alert('x')</script>"#),
            "/&quot;&gt;&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
    }
}
