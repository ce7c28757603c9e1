use serde::{Deserialize, Serialize};
use std::env;

/// Process-wide configuration, read once at startup and handed to `AppState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub upstream: UpstreamConfig,
    pub map: MapConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the openSenseMap API, without trailing slash.
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    pub maptiler_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub max_age_days: i64,
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Key the upstream API signs its bearer tokens with. When absent the
    /// role check only inspects claims.
    #[serde(skip_serializing)]
    pub upstream_jwt_secret: Option<String>,
    pub required_role: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} should be defined")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

pub const SESSION_COOKIE_NAME: &str = "osem-admin-jwt";

/// Role the upstream token must carry to use this tool.
pub const ADMIN_ROLE: &str = "admin";
const DEFAULT_SESSION_MAX_AGE_DAYS: i64 = 30;
/// Browsers cap cookie lifetimes at 400 days.
const MAX_SESSION_MAX_AGE_DAYS: i64 = 400;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let api_url = require("OSEM_API_URL")?;
        let maptiler_key = require("MAPTILER_KEY")?;
        let session_secret = require("SESSION_SECRET")?;

        if url::Url::parse(&api_url).is_err() {
            return Err(ConfigError::Invalid {
                name: "OSEM_API_URL",
                value: api_url,
            });
        }

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let base = match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        };

        let mut config = Self {
            upstream: UpstreamConfig {
                api_url: api_url.trim_end_matches('/').to_string(),
            },
            map: MapConfig { maptiler_key },
            session: SessionConfig {
                secret: session_secret,
                ..base.session
            },
            security: SecurityConfig {
                upstream_jwt_secret: get("OSEM_JWT_SECRET"),
                ..base.security
            },
            ..base
        };

        if let Some(v) = get("SESSION_MAX_AGE_DAYS") {
            config.session.max_age_days = match v.parse::<i64>() {
                Ok(days) if (1..=MAX_SESSION_MAX_AGE_DAYS).contains(&days) => days,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "SESSION_MAX_AGE_DAYS",
                        value: v,
                    })
                }
            };
        }

        Ok(config)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            upstream: UpstreamConfig {
                api_url: String::new(),
            },
            map: MapConfig {
                maptiler_key: String::new(),
            },
            session: SessionConfig {
                cookie_name: SESSION_COOKIE_NAME.to_string(),
                secret: String::new(),
                max_age_days: DEFAULT_SESSION_MAX_AGE_DAYS,
                // Safari refuses secure cookies on plain http://localhost
                secure: false,
            },
            security: SecurityConfig {
                upstream_jwt_secret: None,
                required_role: ADMIN_ROLE.to_string(),
            },
        }
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.session.secure = true;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
