use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
    response::Redirect,
};

use crate::session::SessionStore;
use crate::state::AppState;

/// Login page URL that returns to `redirect_to` afterwards.
pub fn login_redirect(redirect_to: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("redirectTo", redirect_to)
        .finish();
    format!("/login?{}", query)
}

/// Bearer token from the session, or a redirect to the login page.
pub fn require_token(
    sessions: &SessionStore,
    headers: &HeaderMap,
    redirect_to: &str,
) -> Result<String, Redirect> {
    sessions.read(headers).ok_or_else(|| {
        tracing::debug!("No session for {}, redirecting to login", redirect_to);
        Redirect::to(&login_redirect(redirect_to))
    })
}

/// Bearer token from the session, if any.
pub fn get_token(sessions: &SessionStore, headers: &HeaderMap) -> Option<String> {
    sessions.read(headers)
}

/// Extractor for protected pages. Rejects with a redirect to
/// `/login?redirectTo=<path>` when there is no valid session.
#[derive(Debug, Clone)]
pub struct RequireToken(pub String);

#[async_trait]
impl FromRequestParts<AppState> for RequireToken {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_token(&state.sessions, &parts.headers, parts.uri.path()).map(RequireToken)
    }
}

/// Extractor for pages that only behave differently when signed in.
#[derive(Debug, Clone)]
pub struct MaybeToken(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeToken(get_token(&state.sessions, &parts.headers)))
    }
}
