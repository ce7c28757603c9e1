use anyhow::Context;
use clap::{Args, Parser};

use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0", help = "Address to bind")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000, help = "Port to listen on")]
    pub port: u16,
}

impl ServeArgs {
    /// Defaults plus `HOST`/`PORT`, for when no subcommand was given.
    pub fn from_env() -> anyhow::Result<Self> {
        #[derive(Parser)]
        struct Defaults {
            #[command(flatten)]
            args: ServeArgs,
        }

        Ok(Defaults::try_parse_from(["osem-admin"])?.args)
    }
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        "Starting osem-admin in {:?} mode against {}",
        config.environment,
        config.upstream.api_url
    );

    if !config.is_production() {
        tracing::info!("Session cookies are sent without the Secure flag");
    }

    let state = AppState::new(config)?;
    let app = crate::app(state);

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("osem-admin listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
