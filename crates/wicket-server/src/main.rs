use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wicket_core::AppState;

mod admins;
mod cli;
mod config;

const DEFAULT_LOG_FILTER: &str = "wicket=info,tower_http=debug";

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn hash_password_command(password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    println!("{}", wicket_core::auth::hash_password(&password)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Some(cli::Command::HashPassword { password }) = args.command {
        return hash_password_command(password);
    }

    // Installed first so Config::load can report overrides it ignores.
    init_tracing(config::log_json_enabled(&args.config, |key| {
        std::env::var(key).ok()
    }));
    let config = config::Config::load(&args.config)?;
    tracing::info!(
        config = %args.config,
        environment = ?config.server.environment,
        "starting wicket-server"
    );

    // CLI --web-dir overrides config file
    let web_dir: Option<PathBuf> = args
        .web_dir
        .or(config.server.web_dir.clone())
        .map(PathBuf::from)
        .filter(|p| {
            if p.is_dir() {
                true
            } else {
                tracing::warn!("Web UI directory {:?} does not exist, using built-in pages", p);
                false
            }
        });

    let credentials = admins::load_credentials(&config).await?;
    let state = AppState::new(config.app_config(), credentials)
        .context("invalid auth configuration")?;

    let app = wicket_api::build_router(state, web_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    tracing::info!(
        address = %config.server.bind_address,
        web_ui = %web_dir.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "built-in".into()),
        "listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
