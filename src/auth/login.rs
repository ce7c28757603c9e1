use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

use super::claims::{ClaimError, TokenVerifier};
use crate::upstream::UpstreamClient;

/// Where a successful login lands when no usable `redirectTo` was given.
pub const DEFAULT_REDIRECT: &str = "/devices";

/// Raw login form as posted by the browser. Every field is optional so a
/// hand-crafted request can be answered with a form error instead of a 422.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(rename = "loginType")]
    pub login_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Credentials that passed local validation.
#[derive(Debug, Clone, Validate)]
pub struct Credentials {
    #[validate(length(min = 3, message = "Usernames must be at least 3 characters long"))]
    pub username: String,
    #[validate(length(min = 6, message = "Passwords must be at least 6 characters long"))]
    pub password: String,
}

/// Field name -> message, as shown next to the offending input.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Form not submitted correctly.")]
    MalformedForm,

    #[error("Login type invalid")]
    InvalidLoginType,

    #[error("Invalid login fields")]
    Validation(FieldErrors),

    /// Unknown user and wrong password are deliberately indistinguishable.
    #[error("Username/Password combination is incorrect")]
    InvalidCredentials,

    #[error("Sign in succeeded but authorization is insufficient.")]
    InsufficientRole,
}

impl LoginError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            LoginError::InsufficientRole => axum::http::StatusCode::FORBIDDEN,
            _ => axum::http::StatusCode::BAD_REQUEST,
        }
    }
}

impl LoginForm {
    /// Local checks that run before any upstream call.
    pub fn validate_credentials(&self) -> Result<Credentials, LoginError> {
        let (Some(login_type), Some(username), Some(password)) =
            (&self.login_type, &self.username, &self.password)
        else {
            return Err(LoginError::MalformedForm);
        };

        let credentials = Credentials {
            username: username.clone(),
            password: password.clone(),
        };

        if let Err(errors) = credentials.validate() {
            let fields = errors
                .field_errors()
                .into_iter()
                .filter_map(|(field, errs)| {
                    let message = errs.first()?.message.as_ref()?.to_string();
                    Some((field.to_string(), message))
                })
                .collect();
            return Err(LoginError::Validation(fields));
        }

        if login_type != "login" {
            return Err(LoginError::InvalidLoginType);
        }

        Ok(credentials)
    }

    pub fn redirect_target(&self) -> String {
        safe_redirect(self.redirect_to.as_deref())
    }
}

/// Only local absolute paths are followed after login.
pub fn safe_redirect(target: Option<&str>) -> String {
    match target.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control)
                && !path.starts_with("/login") =>
        {
            path.to_string()
        }
        _ => DEFAULT_REDIRECT.to_string(),
    }
}

/// Exchange credentials for a bearer token and run the role check on it.
pub async fn login(
    client: &UpstreamClient,
    verifier: &TokenVerifier,
    credentials: &Credentials,
) -> Result<String, LoginError> {
    let token = match client.sign_in(&credentials.username, &credentials.password).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!("Sign-in rejected for {}: {}", credentials.username, e);
            return Err(LoginError::InvalidCredentials);
        }
    };

    match verifier.check(&token) {
        Ok(claims) => {
            tracing::info!(
                "Operator {} signed in (subject {:?})",
                credentials.username,
                claims.sub
            );
            Ok(token)
        }
        Err(e @ (ClaimError::InsufficientRole(_) | ClaimError::Expired)) => {
            tracing::warn!("Sign-in for {} refused: {}", credentials.username, e);
            Err(LoginError::InsufficientRole)
        }
        Err(e) => {
            tracing::warn!("Sign-in for {} returned an unusable token: {}", credentials.username, e);
            Err(LoginError::InsufficientRole)
        }
    }
}
