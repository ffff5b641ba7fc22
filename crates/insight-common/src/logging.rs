//! ---
//! insight_section: "01-core-functionality"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Shared configuration and tracing bootstrap."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "INSIGHT_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Console rendering for diagnostics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Install the global subscriber for `service_name`.
///
/// Console diagnostics go to stderr; stdout is reserved for command output.
/// With `to_file` set, JSON lines are also appended to a
/// daily file `<prefix>.log.<date>` under `directory`.
///
/// The filter comes from `INSIGHT_LOG`, then `RUST_LOG`, then `info`.
/// Returns `false` when another subscriber was already installed.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<bool> {
    let file_layer = if config.to_file {
        std::fs::create_dir_all(&config.directory).with_context(|| {
            format!("unable to create log directory {}", config.directory.display())
        })?;
        let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
        let appender = daily(&config.directory, format!("{prefix}.log"));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        Some(
            fmt::layer()
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_ansi(false)
                .json()
                .with_writer(writer),
        )
    } else {
        None
    };

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        debug!(
            service = %service_name,
            format = ?config.format,
            log_dir = %config.directory.display(),
            to_file = config.to_file,
            "tracing initialised"
        );
    }
    Ok(installed)
}

fn env_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive '{directive}' ({err}); using {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_uses_kebab_case() {
        let json = serde_json::to_string(&LogFormat::StructuredJson).unwrap();
        assert_eq!(json, "\"structured-json\"");
        let parsed: LogFormat = serde_json::from_str("\"pretty\"").unwrap();
        assert_eq!(parsed, LogFormat::Pretty);
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            format: LogFormat::Pretty,
            file_prefix: Some("insight-test".into()),
            to_file: true,
        };
        init_tracing("insight-test", &config).unwrap();
        assert!(config.directory.is_dir());
    }

    #[test]
    fn file_output_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("unused"),
            format: LogFormat::StructuredJson,
            file_prefix: None,
            to_file: false,
        };
        init_tracing("insight-test", &config).unwrap();
        assert!(!config.directory.exists());
    }
}
