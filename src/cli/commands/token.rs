use chrono::{TimeZone, Utc};
use clap::Args;
use serde_json::json;

use crate::auth::TokenVerifier;
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::{SecurityConfig, ADMIN_ROLE};

#[derive(Debug, Clone, Args)]
pub struct TokenArgs {
    #[arg(help = "Bearer token issued by the openSenseMap API")]
    pub token: String,
}

/// Runs the same check the login form applies, using `OSEM_JWT_SECRET` for
/// signature verification when it is set. A rejected token is an error so
/// the process exits non-zero.
pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = SecurityConfig {
        upstream_jwt_secret: std::env::var("OSEM_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty()),
        required_role: ADMIN_ROLE.to_string(),
    };
    let verifier = TokenVerifier::new(&security);

    match verifier.check(&args.token) {
        Ok(claims) => {
            let expires = Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .map(|d| d.to_rfc3339())
                .unwrap_or_default();
            output_success(
                &output_format,
                &format!("Token accepted for the admin tool (expires {})", expires),
                Some(json!({
                    "role": claims.role,
                    "sub": claims.sub,
                    "exp": claims.exp,
                    "signature_verified": verifier.verifies_signature(),
                })),
            )
        }
        Err(e) => {
            if let OutputFormat::Json = output_format {
                output_error(&output_format, &format!("Token rejected: {}", e), Some("TOKEN_REJECTED"))?;
            }
            anyhow::bail!("Token rejected: {}", e)
        }
    }
}
