mod config;
mod health;
mod render;
mod session;
mod socket;
mod ui;

use anyhow::{Context, Result};
use chat_session_lib::SessionConfig;
use clap::Parser;
use config::ClientConfig;
use shared::ClientId;
use tracing::{info, warn};

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser, Debug)]
#[command(name = "fitbot-chat")]
#[command(about = "Terminal client for the FitBot chat server")]
struct Args {
    /// Chat server URL (remembered for later runs)
    #[arg(long, env = "FITBOT_SERVER_URL")]
    server_url: Option<String>,

    /// Use this client id instead of the stored one
    #[arg(long)]
    client_id: Option<String>,

    /// Forget the stored client id and exit
    #[arg(long)]
    forget: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = ClientConfig::config_path()?;
    let mut config = ClientConfig::load_from(&config_path).context("Failed to load config file")?;

    if args.forget {
        match config.forget_client_id() {
            Some(id) => {
                config.save_to(&config_path)?;
                ui::print_forgot(id.as_str());
            }
            None => ui::print_nothing_to_forget(),
        }
        return Ok(());
    }

    let (client_id, server_url) = resolve_identity(&args, &mut config, &config_path)?;

    if !client_id.is_accepted_by_server() {
        warn!("Client id {:?} does not match the server's id pattern", client_id.as_str());
    }

    let session_config =
        SessionConfig::new(&server_url, client_id.clone()).context("Invalid server URL")?;
    let health_url = shared::health_url(&server_url)
        .context("Invalid server URL")?
        .to_string();
    info!("Chat endpoint: {}", session_config.endpoint);

    ui::print_startup_banner();
    ui::print_session_info(&server_url, client_id.as_str());

    session::run_chat(session_config, health_url).await
}

/// Resolve the client id and server URL: command line, then config file,
/// then defaults. Newly generated ids and new server URLs are saved.
fn resolve_identity(
    args: &Args,
    config: &mut ClientConfig,
    config_path: &std::path::Path,
) -> Result<(ClientId, String)> {
    let mut dirty = false;

    let server_url = match args.server_url.as_deref() {
        Some(url) => {
            dirty |= config.remember_server_url(url);
            url.to_string()
        }
        None => config
            .server_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
    };

    let client_id = match args.client_id.clone() {
        Some(id) => ClientId::from_stored(id),
        None => {
            let (id, created) = config.ensure_client_id();
            if created {
                info!("Generated new client id {}", id);
            }
            dirty |= created;
            id
        }
    };

    if dirty {
        config
            .save_to(config_path)
            .context("Failed to save config file")?;
    }

    Ok((client_id, server_url))
}
