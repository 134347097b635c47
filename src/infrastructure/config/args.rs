use super::app_config::{CachePolicy, LogLevel};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "image-loader",
    version,
    about = "Load images through memory, disk and network tiers",
    long_about = None
)]
pub struct CliArgs {
    /// Image references: URLs, file paths, `file://` URIs or asset paths.
    #[arg(required = true, value_name = "REFERENCE")]
    pub references: Vec<String>,

    /// Requested width. Resizing applies only with both width and height.
    #[arg(long)]
    pub width: Option<u32>,

    /// Requested height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Directory to write each loaded image to as PNG.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Wipe the on-disk tier before loading.
    #[arg(long)]
    pub clear_cache: bool,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Directory of the on-disk tier.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Root directory for embedded asset references.
    #[arg(long, value_name = "DIR")]
    pub asset_root: Option<PathBuf>,

    /// Enabled cache tiers.
    #[arg(long, value_enum)]
    pub policy: Option<CachePolicy>,

    /// Debounce before loading, in milliseconds.
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Network timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}
