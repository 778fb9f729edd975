use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use imgvault::application::{ImageCacheControl, ImageUrlGenerator};
use imgvault::domain::entities::{Transformation, TransformationSpec};
use imgvault::infrastructure::config::{ImageCacheConfig, LogLevel};

#[derive(Debug, Parser)]
#[command(
    name = "imgvault",
    version,
    about = "On-demand image derivative cache",
    long_about = None
)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    log_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a public URL for an image derivative.
    Generate {
        /// Path or URL of the source image.
        identifier: String,

        /// Transformation as `name:key=value,key=value`. Repeatable,
        /// applied in order.
        #[arg(short, long = "transform", value_name = "SPEC")]
        transforms: Vec<String>,

        /// Transformations as a JSON array of `{name, options}` objects.
        #[arg(long, value_name = "JSON", conflicts_with = "transforms")]
        json: Option<String>,
    },
    /// Delete every cached derivative.
    Clear,
    /// Show cache statistics.
    Status,
}

fn init_logging(config: &ImageCacheConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ImageCacheConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => ImageCacheConfig::default_path()?,
    };

    let mut config = ImageCacheConfig::load(&path)
        .map_err(|e| eyre!("could not load configuration from {}: {e}", path.display()))?;

    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(log_path) = &cli.log_path {
        config.log_path = Some(log_path.clone());
    }

    Ok(config)
}

fn parse_transformations(transforms: &[String], json: Option<&str>) -> Result<TransformationSpec> {
    if let Some(json) = json {
        let parsed: Vec<Transformation> = serde_json::from_str(json)?;
        return Ok(TransformationSpec::new(parsed));
    }

    let mut parsed = Vec::with_capacity(transforms.len());
    for entry in transforms {
        parsed.push(TransformationSpec::parse_entry(entry).map_err(|e| eyre!(e))?);
    }
    Ok(TransformationSpec::new(parsed))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config)?;

    info!(version = imgvault::VERSION, "Starting imgvault");

    let generator = ImageUrlGenerator::from_config(&config)?;

    match &cli.command {
        Command::Generate {
            identifier,
            transforms,
            json,
        } => {
            let spec = parse_transformations(transforms, json.as_deref())?;
            let url = generator.generate_url(identifier, &spec).await?;
            println!("{url}");
        }
        Command::Clear => {
            let control = ImageCacheControl::new(generator.store());
            control.clear().await?;
            println!("cache cleared");
        }
        Command::Status => {
            let control = ImageCacheControl::new(generator.store());
            let stats = control.stats().await?;
            println!("cache directory: {}", generator.store().cache_dir().display());
            println!("artifacts: {}", stats.artifacts);
            println!("total size: {} bytes", stats.total_size);
        }
    }

    Ok(())
}
