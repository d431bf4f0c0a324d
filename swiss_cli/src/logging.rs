//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the CLI's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Operations slower than this are logged as warnings
const SLOW_OPERATION_MS: u64 = 500;

/// Initialize structured logging
///
/// Log levels are taken from `RUST_LOG`, defaulting to `info,sqlx=warn`.
/// Output goes to stderr so command output on stdout stays machine readable.
///
/// # Example
///
/// ```no_run
/// logging::init();
/// tracing::info!("CLI starting");
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Structured logging initialized");
}

/// Log the outcome and duration of one engine operation
///
/// # Arguments
///
/// * `operation` - Subcommand or engine call
/// * `tournament_id` - Tournament the operation touched, if any
/// * `duration_ms` - Duration in milliseconds
pub fn log_operation(operation: &str, tournament_id: Option<i64>, duration_ms: u64) {
    if duration_ms > SLOW_OPERATION_MS {
        tracing::warn!(
            operation = operation,
            tournament_id = tournament_id,
            duration_ms = duration_ms,
            "Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            tournament_id = tournament_id,
            duration_ms = duration_ms,
            "Operation completed"
        );
    }
}
