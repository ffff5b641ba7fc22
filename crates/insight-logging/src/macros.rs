//! ---
//! insight_section: "03-logging"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Structured logging context and lifecycle events."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
/// Shared expansion for the levelled macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! __insight_event {
    ($level:ident, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext<'_> = $ctx;
        $crate::__tracing::event!(
            $crate::__tracing::Level::$level,
            principal = ctx.principal.unwrap_or(""),
            role = ctx.role.unwrap_or(""),
            report = ctx.report.unwrap_or(""),
            section = ctx.section.unwrap_or(""),
            message = %format_args!($($arg)+)
        )
    }};
}

/// Info event carrying the principal, role, report and section of `context`.
#[macro_export]
macro_rules! insight_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__insight_event!(INFO, &$ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__insight_event!(INFO, &$crate::LogContext::new(), $($arg)+)
    };
}

/// Debug counterpart of [`insight_info!`].
#[macro_export]
macro_rules! insight_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__insight_event!(DEBUG, &$ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__insight_event!(DEBUG, &$crate::LogContext::new(), $($arg)+)
    };
}

/// Warn counterpart of [`insight_info!`].
#[macro_export]
macro_rules! insight_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__insight_event!(WARN, &$ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__insight_event!(WARN, &$crate::LogContext::new(), $($arg)+)
    };
}

/// Error counterpart of [`insight_info!`].
#[macro_export]
macro_rules! insight_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__insight_event!(ERROR, &$ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__insight_event!(ERROR, &$crate::LogContext::new(), $($arg)+)
    };
}
