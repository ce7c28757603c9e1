//! Client for the openSenseMap REST API.
//!
//! Everything the admin tool shows or changes lives upstream; this module
//! attaches the operator's bearer token, forwards the request and parses the
//! answer into the record shapes in [`models`].

pub mod models;
pub mod payload;
pub mod resource;

use reqwest::{header, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use url::Url;

use crate::config::UpstreamConfig;

pub use models::{Device, DeviceRef, Location, OwnerRef, OwnerSummary, User};
pub use payload::{DeviceAction, DeviceUpdate, FormFields, PayloadError, UserAction, UserUpdate};
pub use resource::{Devices, Resource, ResourceProxy, Users};

const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request to the openSenseMap API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("openSenseMap API answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("sign-in response carried no token")]
    MissingToken,

    #[error("cannot build API URL from {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(&config.api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| UpstreamError::InvalidUrl(config.api_url.clone()))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("osem-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Users endpoints, authorized with `token`.
    pub fn users<'a>(&'a self, token: &'a str) -> ResourceProxy<'a, Users> {
        ResourceProxy::new(self, token)
    }

    /// Device ("box") endpoints, authorized with `token`.
    pub fn devices<'a>(&'a self, token: &'a str) -> ResourceProxy<'a, Devices> {
        ResourceProxy::new(self, token)
    }

    /// POST /users/sign-in - exchange credentials for a bearer token.
    ///
    /// The upstream login field is called `email` but also accepts user names.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<String, UpstreamError> {
        let body = json!({ "email": username, "password": password });
        let response: SignInResponse = self
            .send(Method::POST, &["users", "sign-in"], None, Some(&body))
            .await?;

        response
            .token
            .filter(|token| !token.is_empty())
            .ok_or(UpstreamError::MissingToken)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send one request and parse the JSON answer into `T`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("{} {}", method, url.path());

        let mut request = self
            .http
            .request(method, url)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status,
                message: error_message(&text),
            });
        }

        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| UpstreamError::UnexpectedShape(format!("invalid JSON: {}", e)))?
        };

        serde_json::from_value(value).map_err(|e| UpstreamError::UnexpectedShape(e.to_string()))
    }
}

/// Best-effort human message from an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
