//cargo run --package rainfall --bin rainfall_mcp_server -- [config.toml]
use rainfall::{config::DeploymentConfig, mcp::{serve_stdio, RainfallMcpServer}};
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Logs go to stderr, stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => DeploymentConfig::from_file(&path)?,
        None => DeploymentConfig::default(),
    };

    tracing::info!(
        current = %config.artifacts.current_dir.display(),
        bands = config.band_definitions.len(),
        "Starting radar rainfall MCP server"
    );

    let server = RainfallMcpServer::from_config(&config)?;

    tokio::select! {
        result = serve_stdio(server) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down gracefully");
        }
    }

    tracing::info!("MCP server shut down");
    Ok(())
}
