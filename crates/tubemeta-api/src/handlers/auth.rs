//! Login, logout and session status.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, warn};

use tubemeta_models::{AuthStatusResponse, LoginRequest, SuccessResponse};

use crate::auth::{SESSION_COOKIE, SESSION_MAX_AGE_DAYS};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::metrics;
use crate::middleware::{has_valid_session, ClientKey};
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;

/// `GET /api/auth`
pub async fn session_status(State(state): State<AppState>, headers: HeaderMap) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        authenticated: has_valid_session(&state, &headers),
    })
}

/// `POST /api/auth`
///
/// Every attempt counts against the login window, successful or not. A
/// wrong password is answered only after the backoff delay for this client.
pub async fn login(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<SuccessResponse>)> {
    let Some(sessions) = state.sessions.clone() else {
        metrics::record_login_attempt("unconfigured");
        return Err(ApiError::not_configured("APP_PASSWORD is not set"));
    };

    if let RateLimitDecision::Limited { retry_after } = state.login_limiter.check_and_increment(&client) {
        warn!(client = %client, "Login rate limit exceeded");
        metrics::record_login_attempt("limited");
        metrics::record_rate_limit_hit("login");
        return Err(ApiError::RateLimited { retry_after });
    }

    if !sessions.password_matches(&req.password) {
        let delay = state.login_limiter.delay_for(&client);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        info!(client = %client, delay_ms = delay.as_millis() as u64, "Rejected login");
        metrics::record_login_attempt("invalid");
        return Err(ApiError::unauthorized("Invalid password"));
    }

    state.login_limiter.reset(&client);
    metrics::record_login_attempt("success");
    info!(client = %client, "Login succeeded");

    let cookie = session_cookie(sessions.mint(), state.config.is_production());
    Ok((jar.add(cookie), Json(SuccessResponse::ok())))
}

/// `DELETE /api/auth`
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    let mut cookie = session_cookie(String::new(), state.config.is_production());
    cookie.make_removal();
    (jar.add(cookie), Json(SuccessResponse::ok()))
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(cookie::time::Duration::days(SESSION_MAX_AGE_DAYS))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc.def".to_string(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc.def");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::days(7)));
    }

    #[test]
    fn test_removal_cookie_expires() {
        let mut cookie = session_cookie(String::new(), false);
        cookie.make_removal();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
        assert_eq!(cookie.secure(), Some(false));
    }
}
