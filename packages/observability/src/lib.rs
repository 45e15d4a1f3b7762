//! # Observability
//!
//! Logging layer shared by every crate in the bento-bridge workspace.
//!
//! Library crates only use `tracing` macros. The binary calls
//! [`init_with_config`] once at startup and decides where log lines go:
//!
//! - a JSONL file (one object per event, append-only), by default
//!   `~/.bento-bridge/logs/bridge.jsonl`
//! - optionally a compact human-readable stream on stderr
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "bento-bridge".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!(event_key = "pmpro_checkout", "event queued");
//! ```

mod file;
mod json_layer;

pub use file::{default_log_path, JsonlFileWriter};
pub use json_layer::JsonLayer;

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every log line.
    pub service_name: String,

    /// Default filter (e.g. "debug", "info", "event_outbox=trace").
    /// `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// JSONL output file. Defaults to [`default_log_path`].
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with a custom configuration.
///
/// If the JSONL file cannot be opened the subscriber is installed with the
/// stderr layer only. Calling this twice is a no-op for the second call.
pub fn init_with_config(config: LogConfig) {
    let log_path = config.log_path.clone().or_else(default_log_path);

    let file_writer = match log_path.as_ref().map(JsonlFileWriter::open) {
        Some(Ok(writer)) => Some(writer),
        Some(Err(e)) => {
            eprintln!("observability: cannot open log file {:?}: {}", log_path, e);
            None
        }
        None => None,
    };
    let file_enabled = file_writer.is_some();

    let json_layer = file_writer.map(|writer| {
        JsonLayer::new(config.service_name.clone(), writer).with_filter(env_filter(&config))
    });

    // Without a file, stderr is the only sink left.
    let stderr_layer = if config.also_stderr || !file_enabled {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(io::stderr)
                .with_filter(env_filter(&config)),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            service = %config.service_name,
            log_path = ?log_path,
            file_enabled,
            "observability initialized"
        );
    }
}

fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn init_twice_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            service_name: "test".into(),
            log_path: Some(dir.path().join("logs").join("test.jsonl")),
            ..Default::default()
        };
        init_with_config(config.clone());
        init_with_config(config);
    }
}
