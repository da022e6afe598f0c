mod calculator;
mod cli;
mod config;
mod model;
mod providers;
mod scoring;
mod server;
mod signature;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use calculator::Calculator;
use cli::Command;
use providers::favro::FavroClient;
use signature::WebhookVerifier;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine, settings may come from the real environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("rice_calculator=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match cli::parse_args(&args)? {
        Command::Serve => serve().await,
        Command::Fields(ids) => cli::handle_fields(&ids).await,
        Command::Help => {
            cli::print_help();
            Ok(())
        }
    }
}

async fn serve() -> Result<()> {
    let config = Arc::new(config::load_config().context("Invalid configuration")?);
    let port = config.port()?;

    let publisher = FavroClient::publisher(&config.api, &config.fields.score_field_id);
    let state = server::AppState {
        verifier: Arc::new(WebhookVerifier::new(
            &config.webhook_secret,
            &config.webhook_url,
        )),
        calculator: Calculator::new(config.clone(), Arc::new(publisher)),
    };
    let app = server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(webhook_url = %config.webhook_url, port, "Listening for Favro webhooks");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
