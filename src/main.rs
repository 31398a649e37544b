// src/main.rs
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use vault_kv_node::cli::{run_cli, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON result only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run_cli(cli).await {
        error!("{:#}", err);
        std::process::exit(1);
    }

    Ok(())
}
