//! Entry point for the soundcase lobby server.

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use soundcase::cli::ServerCli;
use soundcase::config::Config;
use soundcase::server::{run_server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ServerCli::parse();

    let log_filter = if cli.debug {
        "debug".to_string()
    } else {
        "soundcase=info,warn".to_string()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(cli.debug)
        .with_thread_ids(cli.debug)
        .with_file(cli.debug)
        .with_line_number(cli.debug)
        .init();

    let config_path: PathBuf = cli.config.clone();
    let mut config = Config::load_or_create(&config_path)
        .with_context(|| format!("loading or creating config '{}'", config_path.display()))?;

    if let Some(chance) = cli.bonus_chance {
        config.bonus_case_chance = chance;
    }
    if let Some(amount) = cli.starter_cases {
        config.starter_cases = amount;
    }
    if cli.persist {
        config
            .save(&config_path)
            .with_context(|| format!("saving config '{}'", config_path.display()))?;
    }

    tracing::info!(
        config = %config_path.display(),
        bonus_case_chance = config.bonus_case_chance,
        starter_cases = config.starter_cases,
        "configuration loaded"
    );

    let state = AppState::new(config)?;

    let port = find_available_port(3000)?;
    if port != 3000 {
        tracing::warn!(port, "port 3000 was not available, using an alternative");
    }
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    run_server(addr, state).await
}

/// Scan upwards from `start_port` for a port we can bind.
fn find_available_port(start_port: u16) -> anyhow::Result<u16> {
    for port in start_port..start_port + 100 {
        if TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return Ok(port);
        }
    }
    anyhow::bail!(
        "no available port found in range {}..{}",
        start_port,
        start_port + 100
    )
}
