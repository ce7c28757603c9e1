use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::session::SessionStore;
use crate::upstream::{UpstreamClient, UpstreamError};

/// Shared, immutable application state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub verifier: TokenVerifier,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, UpstreamError> {
        let sessions = SessionStore::new(&config.session);
        let verifier = TokenVerifier::new(&config.security);
        let upstream = UpstreamClient::new(&config.upstream)?;

        if !verifier.verifies_signature() {
            tracing::warn!(
                "OSEM_JWT_SECRET is not set: the admin role check only reads token claims \
                 and cannot detect forged tokens; the openSenseMap API still enforces roles"
            );
        }

        Ok(Self {
            config: Arc::new(config),
            sessions,
            verifier,
            upstream,
        })
    }
}
