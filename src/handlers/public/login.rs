// handlers/public/login.rs - GET/POST /login

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use crate::auth::{self, login::DEFAULT_REDIRECT, LoginError, LoginForm};
use crate::error::AppError;
use crate::middleware::MaybeToken;
use crate::state::AppState;
use crate::views::{self, LoginPage};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// GET /login - the login form, or straight on to the devices when a session
/// already exists.
pub async fn login_get(MaybeToken(token): MaybeToken, Query(query): Query<LoginQuery>) -> Response {
    if token.is_some() {
        return Redirect::to(DEFAULT_REDIRECT).into_response();
    }

    Html(views::login_page(&LoginPage {
        redirect_to: query.redirect_to,
        ..Default::default()
    }))
    .into_response()
}

/// POST /login - validate locally, exchange credentials upstream, check the
/// token's role, then store it in the session cookie.
pub async fn login_post(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let result = match form.validate_credentials() {
        Ok(credentials) => auth::login(&state.upstream, &state.verifier, &credentials).await,
        Err(err) => Err(err),
    };

    let token = match result {
        Ok(token) => token,
        Err(err) => return login_failed(&form, err),
    };

    match state.sessions.create(&token) {
        Ok(cookie) => (
            [(header::SET_COOKIE, cookie)],
            Redirect::to(&form.redirect_target()),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Could not create session: {}", e);
            AppError::internal_server_error("Could not create a session").into_response()
        }
    }
}

fn login_failed(form: &LoginForm, err: LoginError) -> Response {
    let status = err.status_code();
    let mut page = LoginPage {
        redirect_to: form.redirect_to.clone(),
        username: form.username.clone(),
        ..Default::default()
    };

    match err {
        LoginError::Validation(fields) => page.field_errors = fields,
        other => page.form_error = Some(other.to_string()),
    }

    (status, Html(views::login_page(&page))).into_response()
}
