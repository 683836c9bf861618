//! # Structured Logging Module
//!
//! Environment-aware structured logging for registration, waitlist and
//! promotion flows. Production emits JSON lines; other environments emit
//! human-readable output. `RUST_LOG` overrides the environment default.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
        };

        let console_layer = if environment == "production" {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter())
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(filter())
                .boxed()
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("VOLUNTEER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for capacity operations (register/unregister)
pub fn log_capacity_operation(
    operation: &str,
    event_id: &str,
    volunteer_id: Option<&str>,
    outcome: &str,
    seats_taken: Option<u32>,
    capacity: Option<u32>,
) {
    tracing::info!(
        operation = %operation,
        event_id = %event_id,
        volunteer_id = volunteer_id,
        outcome = %outcome,
        seats_taken = seats_taken,
        capacity = capacity,
        timestamp = %Utc::now().to_rfc3339(),
        "CAPACITY_OPERATION"
    );
}

/// Log structured data for waitlist operations
pub fn log_waitlist_operation(
    operation: &str,
    event_id: &str,
    volunteer_id: &str,
    position: Option<usize>,
    active_entries: usize,
) {
    tracing::info!(
        operation = %operation,
        event_id = %event_id,
        volunteer_id = %volunteer_id,
        position = position,
        active_entries = active_entries,
        timestamp = %Utc::now().to_rfc3339(),
        "WAITLIST_OPERATION"
    );
}

/// Log structured data for promotion offers, acceptances and expiries
pub fn log_promotion_operation(
    operation: &str,
    event_id: &str,
    volunteer_id: &str,
    status: &str,
    expires_at: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        event_id = %event_id,
        volunteer_id = %volunteer_id,
        status = %status,
        expires_at = expires_at,
        timestamp = %Utc::now().to_rfc3339(),
        "PROMOTION_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        assert!(LOGGER_INITIALIZED.get().is_some());
    }
}
