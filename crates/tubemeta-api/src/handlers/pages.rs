//! HTML pages.
//!
//! Pages are static shells; behaviour lives in `/static/*.js` so the CSP can
//! forbid inline scripts.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::middleware::has_valid_session;
use crate::security::{html_escape, sanitize_return_to};
use crate::state::AppState;

const LOGIN_TEMPLATE: &str = include_str!("../../assets/login.html");
const INDEX_PAGE: &str = include_str!("../../assets/index.html");
const FAVICON: &str = include_str!("../../assets/favicon.svg");

const RETURN_TO_PLACEHOLDER: &str = "{{return_to}}";

/// Query string of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
}

/// `GET /login`
///
/// Signed-in visitors go straight to their destination.
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> Response {
    let target = sanitize_return_to(query.from.as_deref());

    if has_valid_session(&state, &headers) {
        return Redirect::to(&target).into_response();
    }

    Html(render_login(&target)).into_response()
}

/// `GET /`
pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// `GET /favicon.ico`
pub async fn favicon() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        FAVICON,
    )
}

/// Fill the login template. `target` must already be sanitized.
fn render_login(target: &str) -> String {
    LOGIN_TEMPLATE.replace(RETURN_TO_PLACEHOLDER, &html_escape(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_login_embeds_escaped_target() {
        let page = render_login("/?q=\"x\"&y=<z>");
        assert!(page.contains("data-return-to=\"/?q=&quot;x&quot;&amp;y=&lt;z&gt;\""));
        assert!(!page.contains(RETURN_TO_PLACEHOLDER));
    }

    #[test]
    fn test_pages_have_no_inline_scripts() {
        for page in [LOGIN_TEMPLATE, INDEX_PAGE] {
            assert!(!page.contains("<script>"));
            assert!(page.contains("<script src=\"/static/"));
        }
    }
}
