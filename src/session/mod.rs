//! Cookie-backed session holding the operator's bearer token.
//!
//! The cookie value is an HS256 envelope signed with `SESSION_SECRET`, so a
//! modified or foreign cookie simply reads as "no session".

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::token_expired;
use crate::config::SessionConfig;

#[derive(Debug, Serialize, Deserialize)]
struct SessionEnvelope {
    token: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to sign session cookie: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("session lifetime is out of range")]
    Lifetime,

    #[error("session cookie is not a valid header value")]
    InvalidHeader(#[from] axum::http::header::InvalidHeaderValue),
}

#[derive(Clone)]
pub struct SessionStore {
    cookie_name: String,
    max_age: Duration,
    secure: bool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            max_age: Duration::days(config.max_age_days),
            secure: config.secure,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Set-Cookie value persisting `token` for the configured lifetime.
    pub fn create(&self, token: &str) -> Result<HeaderValue, SessionError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.max_age)
            .ok_or(SessionError::Lifetime)?;
        let envelope = SessionEnvelope {
            token: token.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        let value = encode(&Header::new(Algorithm::HS256), &envelope, &self.encoding_key)?;

        let cookie = format!(
            "{}={}; Max-Age={}; Expires={}{}",
            self.cookie_name,
            value,
            self.max_age.num_seconds(),
            expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.attributes()
        );
        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// The bearer token carried by the request's session cookie, if any.
    ///
    /// A session whose bearer token has expired upstream reads as absent.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        let value = parse_cookie(headers, &self.cookie_name)?;
        if value.is_empty() {
            return None;
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        match decode::<SessionEnvelope>(&value, &self.decoding_key, &validation) {
            Ok(data) if token_expired(&data.claims.token) => {
                tracing::debug!("Ignoring session whose bearer token has expired");
                None
            }
            Ok(data) if !data.claims.token.is_empty() => Some(data.claims.token),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Ignoring invalid session cookie: {}", e);
                None
            }
        }
    }

    /// Set-Cookie value that removes the session from the browser.
    pub fn destroy(&self, headers: &HeaderMap) -> HeaderValue {
        if self.read(headers).is_some() {
            tracing::info!("Session destroyed");
        }
        let cookie = format!(
            "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT{}",
            self.cookie_name,
            self.attributes()
        );
        // Built only from the configured cookie name and fixed attributes
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("osem-admin-jwt=; Max-Age=0; Path=/"))
    }

    fn attributes(&self) -> &'static str {
        if self.secure {
            "; Path=/; HttpOnly; SameSite=Lax; Secure"
        } else {
            "; Path=/; HttpOnly; SameSite=Lax"
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("cookie_name", &self.cookie_name)
            .field("max_age", &self.max_age)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Value of cookie `name` from every `Cookie` header on the request.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}
