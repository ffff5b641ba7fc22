//! ---
//! insight_section: "01-core-functionality"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Shared configuration and tracing bootstrap."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Shared primitives for the Insight Engine workspace.
//! This crate exposes configuration loading and tracing bootstrap
//! consumed by the security, reporting and CLI crates.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, AuditConfig, AuthorizationConfig, LoadedAppConfig, LoggingConfig, MetricsConfig,
    PrincipalConfig, ReportingConfig,
};
pub use logging::{init_tracing, LogFormat};
