//! ---
//! insight_section: "01-core-functionality"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Shared configuration and tracing bootstrap."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

/// Length in bytes of the credential hashing key.
pub const HASH_KEY_LEN: usize = 32;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_log_to_file() -> bool {
    true
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_report_title() -> String {
    "Weekly Customer Feedback Insight Report".to_owned()
}

fn default_max_excerpts() -> usize {
    3
}

fn default_excerpt_chars() -> usize {
    200
}

fn default_max_table_rows() -> usize {
    10
}

fn default_top_n() -> usize {
    3
}

fn default_report_output_dir() -> PathBuf {
    PathBuf::from("target/reports")
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("target/audit/audit.log")
}

/// Primary configuration object for the Insight Engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "INSIGHT_CONFIG";

    /// Load configuration from disk, respecting the `INSIGHT_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Parse and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.authorization.validate()?;
        self.reporting.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write JSON lines to a daily file under `directory`.
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            to_file: default_log_to_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

/// Static bootstrap source for the credential store and permission catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthorizationConfig {
    /// Hex-encoded 32-byte key for credential hashing. A random key is
    /// generated per process when absent.
    #[serde(default)]
    pub hash_key: Option<String>,
    /// Known principals keyed by identifier, in declaration order.
    #[serde(default)]
    pub principals: IndexMap<String, PrincipalConfig>,
    /// Optional replacement of the standard role/permission table.
    #[serde(default)]
    pub grants: Option<IndexMap<String, Vec<String>>>,
}

impl AuthorizationConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = &self.hash_key {
            let decoded = hex::decode(key.trim())
                .map_err(|err| anyhow!("authorization.hash_key is not valid hex: {err}"))?;
            if decoded.len() != HASH_KEY_LEN {
                return Err(anyhow!(
                    "authorization.hash_key must encode {HASH_KEY_LEN} bytes, found {}",
                    decoded.len()
                ));
            }
        }
        for (principal, entry) in &self.principals {
            if principal.trim().is_empty() {
                return Err(anyhow!("principal identifiers cannot be empty"));
            }
            entry.validate(principal, self.hash_key.is_some())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalConfig {
    pub role: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Plaintext secret, hashed once at bootstrap and then discarded.
    #[serde(default)]
    pub secret: Option<String>,
    /// Pre-computed hex MAC of the secret under `hash_key`.
    #[serde(default)]
    pub secret_hash: Option<String>,
}

impl PrincipalConfig {
    pub fn validate(&self, principal: &str, has_hash_key: bool) -> Result<()> {
        match (&self.secret, &self.secret_hash) {
            (Some(_), Some(_)) => Err(anyhow!(
                "principal '{principal}' declares both secret and secret_hash"
            )),
            (None, None) => Err(anyhow!(
                "principal '{principal}' must declare either secret or secret_hash"
            )),
            (None, Some(_)) if !has_hash_key => Err(anyhow!(
                "principal '{principal}' uses secret_hash but authorization.hash_key is not set"
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_report_title")]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Representative excerpts kept per topic section.
    #[serde(default = "default_max_excerpts")]
    pub max_excerpts: usize,
    /// Excerpt length in characters before an ellipsis is appended.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    /// Table rows rendered per section before explicit truncation.
    #[serde(default = "default_max_table_rows")]
    pub max_table_rows: usize,
    /// Pain points and praised features listed in the overall summary.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Replace characters the document fonts cannot encode instead of failing.
    #[serde(default)]
    pub sanitize_text: bool,
    #[serde(default = "default_report_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            subtitle: None,
            max_excerpts: default_max_excerpts(),
            excerpt_chars: default_excerpt_chars(),
            max_table_rows: default_max_table_rows(),
            top_n: default_top_n(),
            sanitize_text: false,
            output_dir: default_report_output_dir(),
        }
    }
}

impl ReportingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(anyhow!("reporting.title cannot be empty"));
        }
        if self.max_excerpts == 0 {
            return Err(anyhow!("reporting.max_excerpts must be at least 1"));
        }
        if self.excerpt_chars < 16 {
            return Err(anyhow!("reporting.excerpt_chars must be at least 16"));
        }
        if self.max_table_rows == 0 {
            return Err(anyhow!("reporting.max_table_rows must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: default_audit_path(),
        }
    }
}
