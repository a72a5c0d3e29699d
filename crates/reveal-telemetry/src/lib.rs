//! # Reveal Telemetry
//!
//! Log output for the reveal allocator processes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reveal_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//!
//!     // Spans and events from `tracing` now reach the configured output
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RV_SERVICE_NAME` | `reveal-allocator` | Service name in the startup line |
//! | `RV_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `RV_CONSOLE_OUTPUT` | `true` | Print logs at all |
//! | `RV_JSON_LOGS` | `false` (`true` in containers) | JSON instead of pretty output |

#![warn(missing_docs)]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{build_filter, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The log level directive could not be parsed.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber could not be installed.
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Initialize logging for the process.
///
/// Returns a guard that should be held for the lifetime of the application.
///
/// # Errors
///
/// See [`TelemetryError`].
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing_guard = tracing_setup::init_tracing(config)?;
    Ok(TelemetryGuard {
        _tracing: tracing_guard,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
}

/// Convenience macro for creating a span with component context.
///
/// # Example
///
/// ```rust,ignore
/// use reveal_telemetry::component_span;
///
/// let _span = component_span!("fulfill", component = "oracle-bridge", request_id = 7).entered();
/// ```
#[macro_export]
macro_rules! component_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "reveal-allocator");
    }

    #[test]
    fn test_error_display() {
        let err = TelemetryError::InvalidFilter("x=loud".to_string());
        assert_eq!(err.to_string(), "Invalid log filter: x=loud");
    }
}
