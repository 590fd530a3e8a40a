use std::{net::SocketAddr, sync::Arc};

use speech_core::PollySynthesizer;
use telephony_core::TwilioClient;
use tokio::net::TcpListener;
use tracing::info;

use server::config::ServerConfig;
use server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting call relay server...");

    let config = ServerConfig::from_env()?;
    info!(
        "Server configuration loaded: port={}, public_host={}, aws_region={}, provider_timeout={}s",
        config.port, config.public_host, config.aws_region, config.provider_timeout_secs
    );

    let speech = Arc::new(PollySynthesizer::new(config.polly_config()).await);
    let calls = Arc::new(TwilioClient::new(config.twilio_config())?);

    let state = AppState {
        speech,
        calls,
        config: config.clone(),
    };
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
