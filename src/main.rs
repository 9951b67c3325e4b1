use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use imgstash::application::{ImageOptimizer, OptimizerConfig};
use imgstash::domain::entities::OptimizeOptions;
use imgstash::infrastructure::{AppConfig, CliArgs, Command};

fn init_logging(config: &AppConfig) -> Result<()> {
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
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    }

    Ok(())
}

/// Applies per-command overrides on top of the configured tuning.
fn resolve_options(
    config: &AppConfig,
    quality: Option<f32>,
    max_width: Option<u32>,
) -> OptimizeOptions {
    let mut options = config.default_options();
    if let Some(quality) = quality {
        options = options.with_quality(quality);
    }
    if let Some(max_width) = max_width {
        options = options.with_max_width(max_width);
    }
    options
}

async fn run(args: CliArgs) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref()).await?;
    config.merge_with_args(&args);
    init_logging(&config)?;

    info!(version = imgstash::VERSION, "Starting imgstash");

    let optimizer = Arc::new(
        ImageOptimizer::new(OptimizerConfig {
            cache_dir: config.effective_cache_dir(),
            max_entries: config.max_entries,
            download_timeout: Duration::from_secs(config.timeout_secs),
        })
        .await?,
    );

    match args.command {
        Command::Resolve {
            url,
            quality,
            max_width,
            force_refresh,
            no_fallback,
        } => {
            let mut options = resolve_options(&config, quality, max_width)
                .with_force_refresh(force_refresh);
            if no_fallback {
                options = options.without_fallback();
            }
            let resolved = optimizer.get_optimized_image(&url, &options).await?;
            println!("{resolved}");
        }
        Command::Warm {
            urls,
            quality,
            max_width,
        } => {
            let options = resolve_options(&config, quality, max_width);
            let local = optimizer.warm(&urls, &options).await;
            println!("{local} of {} images cached locally", urls.len());
        }
        Command::Stats => {
            let stats = optimizer.store().stats().await;
            println!("{stats}");
        }
        Command::Sweep => {
            let removed = optimizer.store().sweep_orphans().await?;
            println!("removed {removed} orphaned files");
        }
        Command::Clear => {
            optimizer.store().clear().await?;
            println!("cache cleared");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();

    run(args).await
}
