//! Structured logging for the Nebula chunk cache tooling.
//!
//! Library crates log through `tracing` macros only; binaries call
//! [`init_logging`] once at startup to install a subscriber.

use nebula_config::Config;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "nebula-chunk-cache.log";

/// Initialize the tracing subscriber.
///
/// Console output carries uptime timestamps, targets and levels. `RUST_LOG`
/// takes precedence over `config.debug.log_level`. When `debug_build` is set
/// and `log_dir` is writable, a JSON file layer is added as well.
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_path) = log_dir.and_then(log_file_path)
        && let Ok(log_file) = std::fs::File::create(&log_path)
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Filter directive derived from the config, falling back to [`DEFAULT_FILTER`].
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Ensure `log_dir` exists and return the log file path inside it.
fn log_file_path(log_dir: &Path) -> Option<PathBuf> {
    std::fs::create_dir_all(log_dir).ok()?;
    Some(log_dir.join(LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_without_config() {
        assert_eq!(filter_directive(None), "info");
    }

    #[test]
    fn test_filter_uses_config_level() {
        let mut config = Config::default();
        config.debug.log_level = "debug,nebula_chunk_cache=trace".to_string();
        assert_eq!(
            filter_directive(Some(&config)),
            "debug,nebula_chunk_cache=trace"
        );
    }

    #[test]
    fn test_blank_config_level_falls_back() {
        let mut config = Config::default();
        config.debug.log_level = "   ".to_string();
        assert_eq!(filter_directive(Some(&config)), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        for filter_str in ["info", "warn,nebula_chunk_cache=debug", "error"] {
            let result = EnvFilter::try_from(filter_str);
            assert!(result.is_ok(), "Failed to parse filter: {}", filter_str);
        }
    }

    #[test]
    fn test_log_file_path_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("logs").join("cache");

        let path = log_file_path(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(path.file_name().unwrap(), LOG_FILE_NAME);
    }
}
