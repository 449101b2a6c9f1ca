//! Login and session status bodies.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Password login request.
#[derive(Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session status response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
}

/// Generic `{"success": true}` body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
