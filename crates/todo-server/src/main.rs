//! Todo Server CLI
//!
//! Starts the HTTP server and the past-due sweeper.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use todo_server::{config::ServerConfig, start_server};

/// To-do item tracker with past-due expiry
#[derive(Parser, Debug)]
#[command(name = "todo-server", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "TODO_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file (e.g. 0.0.0.0:8080)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// SQLite database path, overrides the config file
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.apply_overrides(cli.bind, cli.database);

    start_server(config).await.context("server terminated")?;
    Ok(())
}
