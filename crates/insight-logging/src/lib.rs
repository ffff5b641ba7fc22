//! ---
//! insight_section: "03-logging"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Structured logging context and lifecycle events."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing as __tracing;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Principal on whose behalf the work is performed.
    pub principal: Option<&'a str>,
    /// Role the principal resolved to.
    pub role: Option<&'a str>,
    /// Report identifier or title.
    pub report: Option<&'a str>,
    /// Report section currently being processed.
    pub section: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a principal identifier.
    pub fn with_principal(mut self, principal: &'a str) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Attach a resolved role name.
    pub fn with_role(mut self, role: &'a str) -> Self {
        self.role = Some(role);
        self
    }

    /// Attach a report identifier.
    pub fn with_report(mut self, report: &'a str) -> Self {
        self.report = Some(report);
        self
    }

    /// Attach a section title.
    pub fn with_section(mut self, section: &'a str) -> Self {
        self.section = Some(section);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The caller was refused by the access model.
    Denied,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Denied => "denied",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with an outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing::event!` needs a constant level, hence the explicit arms.
    match outcome {
        SystemEventOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            principal = ctx.principal.unwrap_or(""),
            role = ctx.role.unwrap_or(""),
            report = ctx.report.unwrap_or(""),
            section = ctx.section.unwrap_or(""),
            message = %message
        ),
        SystemEventOutcome::Denied => tracing::event!(
            Level::WARN,
            event,
            outcome = outcome.as_str(),
            principal = ctx.principal.unwrap_or(""),
            role = ctx.role.unwrap_or(""),
            report = ctx.report.unwrap_or(""),
            section = ctx.section.unwrap_or(""),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            principal = ctx.principal.unwrap_or(""),
            role = ctx.role.unwrap_or(""),
            report = ctx.report.unwrap_or(""),
            section = ctx.section.unwrap_or(""),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_principal("analyst_amy")
            .with_role("analyst");
        insight_info!(context = ctx.clone(), "report requested");
        insight_debug!("debug message");
        insight_warn!(context = ctx.clone(), "cell truncated in {}", "billing");
        insight_error!(context = ctx, "render failed: {}", 42);
    }

    #[test]
    fn context_builder_sets_fields() {
        let ctx = LogContext::new()
            .with_report("weekly")
            .with_section("billing");
        assert_eq!(ctx.report, Some("weekly"));
        assert_eq!(ctx.section, Some("billing"));
        assert!(ctx.principal.is_none());
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_principal("viewer_bob");
        log_system_event(
            Some(&ctx),
            "report.generate",
            "permission generate_reports missing",
            SystemEventOutcome::Denied,
        );
        log_system_event(
            None,
            "report.generate",
            "render fault",
            SystemEventOutcome::Fault,
        );
        log_system_event(None, "report.generate", "ok", SystemEventOutcome::Success);
    }
}
