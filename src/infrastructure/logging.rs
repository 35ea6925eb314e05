//! Logging system configuration and initialization
//!
//! - console output on stderr (stdout is reserved for results)
//! - optional daily-rotated file output through a non-blocking writer
//! - optional JSON formatting
//! - UTC timestamps with millisecond precision
//! - `RUST_LOG` overrides the configured filter entirely

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::Utc;
use lazy_static::lazy_static;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::{self, time::FormatTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "truestar-reviews.log";

/// Dependencies that are only interesting at trace level.
const NOISY_TARGETS: [&str; 6] = ["reqwest", "hyper", "hyper_util", "h2", "html5ever", "selectors"];

lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

struct UtcMillis;

impl FormatTime for UtcMillis {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

/// `<data_local_dir>/truestar-reviews/logs`, or `./logs` when unavailable.
pub fn get_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("truestar-reviews"))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
        .join("logs")
}

/// Filter from `RUST_LOG`, or the configured level with noisy dependencies
/// held at `warn` unless tracing is requested.
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(config))
}

fn configured_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::new(&config.level);

    if !config.level.to_lowercase().contains("trace") {
        for target in NOISY_TARGETS {
            if let Ok(directive) = format!("{target}=warn").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    for (module, level) in &config.module_filters {
        match format!("{module}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => warn!("Ignoring invalid log filter {}={}: {}", module, level, e),
        }
    }

    filter
}

/// Install the global subscriber. A second call returns an error.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    init_logging_in(config, &get_log_directory())
}

pub fn init_logging_in(config: &LoggingConfig, log_dir: &Path) -> Result<()> {
    if !config.console_output && !config.file_output {
        return Err(anyhow!("No logging output configured"));
    }

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.file_output {
        std::fs::create_dir_all(log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
        if config.auto_cleanup_logs {
            cleanup_old_logs(log_dir, config.max_files as usize)?;
        }

        let (file_writer, guard) = non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(UtcMillis)
            .with_ansi(false);
        layers.push(if config.json_format {
            file_layer
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            file_layer.with_target(false).boxed()
        });
    }

    if config.console_output {
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(UtcMillis);
        layers.push(if config.json_format {
            console_layer.json().boxed()
        } else {
            console_layer.with_target(false).boxed()
        });
    }

    Registry::default()
        .with(layers)
        .with(build_env_filter(config))
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log directory: {:?}", log_dir);
    }
    Ok(())
}

/// Keep the `max_files` most recently modified `.log*` files in `log_dir`.
pub fn cleanup_old_logs(log_dir: &Path, max_files: usize) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX) || name.ends_with(".log"));
        if path.is_file() && is_log {
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                log_files.push((path, modified));
            }
        }
    }

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(max_files) {
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("Removed old log file: {:?}", path);
                removed += 1;
            }
            Err(e) => warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }
    Ok(removed)
}

/// Log build and platform details for diagnostics.
pub fn log_system_info() {
    info!("=== TrueStar Reviews ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
}
