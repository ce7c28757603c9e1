// handlers/protected/session.rs - index page and logout

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect},
};

use crate::middleware::RequireToken;
use crate::state::AppState;
use crate::views;

/// GET / - landing page for signed-in operators.
pub async fn index(RequireToken(_token): RequireToken) -> Html<String> {
    Html(views::index_page())
}

/// POST /logout - drop the session cookie and go back to the start page,
/// which in turn sends the browser to the login form.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let cleared = state.sessions.destroy(&headers);
    ([(header::SET_COOKIE, cleared)], Redirect::to("/"))
}
