//! Password-derived session tokens.
//!
//! A token is `base64url(nonce) "." base64url(HMAC(secret, nonce))` where the
//! secret is itself `HMAC(password, label)`. Nothing is stored server-side:
//! a token stays valid for as long as the password is unchanged.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "tubemeta_session";

/// Cookie lifetime in days. The token itself never expires.
pub const SESSION_MAX_AGE_DAYS: i64 = 7;

/// Fixed message the per-deployment secret is derived from.
const SECRET_LABEL: &[u8] = b"tubemeta-session-v1";

const NONCE_LEN: usize = 32;

/// Errors raised while building a [`SessionCodec`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("APP_PASSWORD is not set")]
    MissingPassword,

    #[error("Invalid HMAC key: {0}")]
    InvalidKey(String),
}

/// Request extension inserted by the auth gate for verified sessions.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

/// Mints and verifies session tokens for one shared password.
#[derive(Clone)]
pub struct SessionCodec {
    secret: Vec<u8>,
    signer: HmacSha256,
}

impl SessionCodec {
    /// Derive the signing secret from the shared password.
    pub fn new(password: &str) -> Result<Self, AuthError> {
        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }

        let secret = derive_secret(password)?;
        let signer = HmacSha256::new_from_slice(&secret)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;

        Ok(Self { secret, signer })
    }

    /// Mint a fresh token with a random 256-bit nonce.
    pub fn mint(&self) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let mut mac = self.signer.clone();
        mac.update(&nonce);
        let signature = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(nonce),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Check a token against the current secret. Malformed input is simply
    /// invalid.
    pub fn verify(&self, token: &str) -> bool {
        let mut parts = token.split('.');
        let (Some(nonce), Some(signature), None) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if nonce.is_empty() || signature.is_empty() {
            return false;
        }

        let (Ok(nonce), Ok(signature)) = (
            URL_SAFE_NO_PAD.decode(nonce),
            URL_SAFE_NO_PAD.decode(signature),
        ) else {
            return false;
        };

        let mut mac = self.signer.clone();
        mac.update(&nonce);
        mac.verify_slice(&signature).is_ok()
    }

    /// Constant-time check of a login attempt against the configured password.
    pub fn password_matches(&self, candidate: &str) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(candidate.as_bytes()) else {
            return false;
        };
        mac.update(SECRET_LABEL);
        mac.verify_slice(&self.secret).is_ok()
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

fn derive_secret(password: &str) -> Result<Vec<u8>, AuthError> {
    let mut mac = HmacSha256::new_from_slice(password.as_bytes())
        .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
    mac.update(SECRET_LABEL);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(password: &str) -> SessionCodec {
        SessionCodec::new(password).unwrap()
    }

    #[test]
    fn test_mint_then_verify() {
        let codec = codec("hunter2");
        let token = codec.mint();
        assert!(codec.verify(&token));
        assert_ne!(token, codec.mint());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let codec = codec("hunter2");
        let token = codec.mint();
        let (nonce, signature) = token.split_once('.').unwrap();

        for i in 0..signature.len() {
            let mut chars: Vec<char> = signature.chars().collect();
            chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
            let forged = format!("{}.{}", nonce, chars.into_iter().collect::<String>());
            assert!(!codec.verify(&forged), "accepted forgery at {}", i);
        }
    }

    #[test]
    fn test_password_rotation_invalidates_tokens() {
        let token = codec("old-password").mint();
        assert!(!codec("new-password").verify(&token));
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        let codec = codec("hunter2");
        let token = codec.mint();
        let (nonce, signature) = token.split_once('.').unwrap();

        assert!(!codec.verify(""));
        assert!(!codec.verify("."));
        assert!(!codec.verify(nonce));
        assert!(!codec.verify(&format!("{}.", nonce)));
        assert!(!codec.verify(&format!(".{}", signature)));
        assert!(!codec.verify(&format!("{}.{}.x", nonce, signature)));
        assert!(!codec.verify(&format!("{}.{}", nonce, "not base64!")));
    }

    #[test]
    fn test_empty_password_refused() {
        assert!(matches!(
            SessionCodec::new(""),
            Err(AuthError::MissingPassword)
        ));
    }

    #[test]
    fn test_password_matches() {
        let codec = codec("hunter2");
        assert!(codec.password_matches("hunter2"));
        assert!(!codec.password_matches("hunter3"));
        assert!(!codec.password_matches(""));
    }

    #[test]
    fn test_debug_hides_secret() {
        assert_eq!(format!("{:?}", codec("hunter2")), "SessionCodec { .. }");
    }
}
