use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use rainfall::{
    ArtifactLifecycleManager, DeploymentConfig, Pipeline, ProcessingPool, RestartPolicy, Supervisor,
    mcp::{serve_stdio, RainfallMcpServer},
    process_image, write_atomically,
};
use rainfall_cli::{collect_images, load_config, write_config_template, BatchSummary};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML or JSON deployment config (defaults apply when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract rain areas from one image and install the artifact
    Process {
        /// Path to the radar image
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Extract rain areas into a directory without touching the artifact slot
    Extract {
        /// Path to the radar image
        #[arg(short, long)]
        image: PathBuf,
        /// Directory the GeoJSON file is written to
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Also write a KML copy next to the GeoJSON file
        #[arg(long)]
        kml: bool,
    },
    /// Process many images (directories are expanded) through the worker pool
    Batch {
        /// Image files or directories of images
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Override the configured number of workers
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Copy an archived artifact out of the blob store
    ArchiveGet {
        /// Archive key, i.e. the artifact file name
        #[arg(short, long)]
        key: String,
        /// Where to write the artifact
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Deployment config helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Serve the MCP tools over stdio, restarting on failure
    Serve,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config as TOML
    Init {
        #[arg(short, long, default_value = "rainfall.toml")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config JSON schema
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // stderr keeps stdout free for command output and the MCP protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Process { image } => process(&load_config(config_path)?, image)?,
        Commands::Extract { image, output_dir, kml } => extract(&load_config(config_path)?, image, output_dir, *kml)?,
        Commands::Batch { paths, workers } => batch(load_config(config_path)?, paths, *workers).await?,
        Commands::ArchiveGet { key, output } => archive_get(&load_config(config_path)?, key, output)?,
        Commands::Config { action } => run_config_action(action)?,
        Commands::Serve => serve(&load_config(config_path)?).await?,
    }

    Ok(())
}

fn run_config_action(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { output, force } => {
            write_config_template(output, *force)?;
            info!("Default config written to {}", output.display());
        }
        ConfigAction::Schema => {
            let schema = DeploymentConfig::schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}

fn process(config: &DeploymentConfig, image: &Path) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let lifecycle = ArtifactLifecycleManager::from_config(&config.artifacts);
    info!("{}", pipeline.info());

    let report = process_image(&pipeline, &lifecycle, &config.artifacts.staging_dir, image)?;
    info!(
        "Installed {} ({} features)",
        report.artifact.display(),
        report.feature_count
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn extract(config: &DeploymentConfig, image: &Path, output_dir: &Path, kml: bool) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let (extraction, pending) = pipeline.run(image, output_dir)?;
    if extraction.is_empty() {
        warn!("No rain areas found in {}", image.display());
    }
    info!("Wrote {} features to {}", pending.feature_count, pending.path.display());

    if kml {
        let kml_path = pending.path.with_extension("kml");
        extraction.collection().save_kml(&kml_path)?;
        info!("Wrote KML to {}", kml_path.display());
    }
    Ok(())
}

async fn batch(mut config: DeploymentConfig, paths: &[PathBuf], workers: Option<usize>) -> Result<()> {
    if let Some(workers) = workers {
        config.workers = workers;
    }
    let images = collect_images(paths)?;
    let pool = ProcessingPool::from_config(&config)?;
    info!("Processing {} images with {} workers", images.len(), pool.workers());

    let results = pool.process_all(images.clone()).await;
    let summary = BatchSummary::from_results(&images, results);
    for failed in &summary.failed {
        error!("{}: {}", failed.image.display(), failed.error);
    }
    info!(
        "Batch finished: {} succeeded, {} failed",
        summary.succeeded(),
        summary.failed.len()
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.failed.is_empty() {
        return Err(color_eyre::eyre::eyre!("{} of {} images failed", summary.failed.len(), images.len()));
    }
    Ok(())
}

fn archive_get(config: &DeploymentConfig, key: &str, output: &Path) -> Result<()> {
    let lifecycle = ArtifactLifecycleManager::from_config(&config.artifacts);
    let bytes = lifecycle.archived(key)?;
    write_atomically(output, &bytes)?;
    info!("Restored {} to {}", key, output.display());
    Ok(())
}

async fn serve(config: &DeploymentConfig) -> Result<()> {
    let server = RainfallMcpServer::from_config(config)?;
    let supervisor = Supervisor::new("mcp-server", RestartPolicy::default());
    supervisor.run(|| serve_stdio(server.clone())).await?;
    Ok(())
}
