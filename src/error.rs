// Application error types
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
};

use crate::upstream::UpstreamError;
use crate::views;

/// Errors a page handler can surface to the operator.
///
/// Login problems are rendered inline on the login form and never reach this
/// type; missing sessions are redirects, not errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // 400 Bad Request
    #[error("{0}")]
    BadRequest(String),

    /// An `_action` value no form on this site submits.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    // 403 Forbidden
    #[error("{0}")]
    Forbidden(String),

    // 404 Not Found
    #[error("{0}")]
    NotFound(String),

    // 502 Bad Gateway (upstream API failed or answered garbage)
    #[error("{0}")]
    BadGateway(String),

    // 500 Internal Server Error
    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::UnknownAction(_) => "UNKNOWN_ACTION",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadGateway(_) => "BAD_GATEWAY",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn unknown_action(action: impl Into<String>) -> Self {
        AppError::UnknownAction(action.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        AppError::BadGateway(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        AppError::InternalServerError(message.into())
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND => {
                AppError::not_found("The requested record does not exist")
            }
            UpstreamError::Status { status, .. }
                if status == reqwest::StatusCode::FORBIDDEN
                    || status == reqwest::StatusCode::UNAUTHORIZED =>
            {
                AppError::Forbidden("The API refused this request for your account".to_string())
            }
            other => {
                // Log the real cause, show a generic message
                tracing::error!("Upstream API error: {}", other);
                AppError::bad_gateway("The openSenseMap API request failed")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if let AppError::UnknownAction(action) = &self {
            tracing::error!("Rejected form with unknown action {:?}", action);
        }
        let status = self.status_code();
        let page = views::error_page(status, self.error_code(), &self.to_string());
        (status, Html(page)).into_response()
    }
}
