use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use image_loader::domain::{Dimensions, ImageReference, TargetId};
use image_loader::infrastructure::{
    CliArgs, ConfigStore, ImageLoader, ImageLoaderConfig, LoaderConfig,
};
use image_loader::presentation::TargetStateTable;

fn log_layer<W>(
    log_path: Option<&Path>,
    fallback: W,
) -> Result<Box<dyn Layer<Registry> + Send + Sync>>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let Some(log_path) = log_path else {
        return Ok(fmt::layer().with_writer(fallback).with_target(false).boxed());
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    Ok(fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .boxed())
}

fn init_logging(config: &LoaderConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let log_path = config.effective_log_path();
    let layer = log_layer(log_path.as_deref(), std::io::stderr)?;

    tracing_subscriber::registry().with(layer).with(filter).init();

    match log_path {
        Some(path) => info!(path = %path.display(), "Logging initialized"),
        None => debug!("No log file location, logging to stderr"),
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<LoaderConfig> {
    let store = match &args.config {
        Some(path) => ConfigStore::with_dir(
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
        ),
        None => ConfigStore::new()?,
    };
    let mut config = store.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn write_png(dir: &Path, index: usize, image: &image::DynamicImage) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("image-{index}.png"));
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    println!("  wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = image_loader::VERSION, "Starting {}", image_loader::NAME);

    let display = Arc::new(TargetStateTable::new());
    let loader = ImageLoader::new(ImageLoaderConfig::from(&config), display.clone())?;

    if args.clear_cache {
        loader.clear_disk_cache().await?;
        info!("Disk cache cleared");
    }

    let dimensions = Dimensions::new(args.width, args.height);
    let targets: Vec<(TargetId, &str)> = args
        .references
        .iter()
        .map(|reference| (TargetId::new(), reference.as_str()))
        .collect();

    for (target, reference) in &targets {
        loader.load(*target, Some(ImageReference::new(*reference)), dimensions);
    }
    loader.wait_idle().await;

    let mut failures = 0usize;
    for (index, (target, reference)) in targets.iter().enumerate() {
        match display.state(*target).current_image {
            Some(image) => {
                println!("{reference}: {}x{}", image.width(), image.height());
                if let Some(dir) = &args.output {
                    write_png(dir, index, &image)?;
                }
            }
            None => {
                failures += 1;
                warn!(reference, "No image loaded");
                println!("{reference}: not loaded");
            }
        }
    }

    if let Some(stats) = loader.cache_stats().await {
        info!(%stats, "Finished");
    }
    loader.shutdown().await;

    if failures > 0 {
        color_eyre::eyre::bail!("{failures} of {} references failed to load", targets.len());
    }
    Ok(())
}
