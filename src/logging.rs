/// Logging setup and publish-failure classification.
///
/// All runtime output goes through `tracing`. The binary installs one
/// subscriber at startup (plain or JSON lines, filtered by `RUST_LOG` or
/// the configured directive); library code only emits events.

use std::fmt;

use tracing_subscriber::{EnvFilter, fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::PublishError;

/// Filter used when neither `RUST_LOG` nor the configured directive parses.
pub const DEFAULT_FILTER: &str = "wqmon_service=info";

/// Installs the global subscriber. `RUST_LOG` wins over `filter` when set.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(filter: &str, json: bool) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry.with(fmt_layer::layer().json()).try_init()
    } else {
        registry.with(fmt_layer::layer()).try_init()
    };
    result.map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Backend temporarily unavailable or slow; retried next cycle anyway
    Expected,
    /// Indicates a configuration problem or a bug
    Unexpected,
    /// Cannot tell from the error alone
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a downstream publish failure.
pub fn classify_publish_failure(err: &PublishError) -> FailureType {
    match err {
        PublishError::Timeout => FailureType::Expected,
        PublishError::HttpStatus(status) if *status >= 500 || *status == 429 => FailureType::Expected,
        // Rejected payloads or credentials won't fix themselves.
        PublishError::HttpStatus(_) => FailureType::Unexpected,
        PublishError::Encode(_) => FailureType::Unexpected,
        PublishError::Request(_) => FailureType::Unknown,
    }
}

/// Log a publish failure at a level matching its classification.
pub fn log_publish_failure(region: &str, kind: &str, err: &PublishError) {
    let failure = classify_publish_failure(err);
    match failure {
        FailureType::Unexpected => {
            tracing::error!(region, kind, failure = %failure, error = %err, "Publish failed")
        }
        FailureType::Expected | FailureType::Unknown => {
            tracing::warn!(region, kind, failure = %failure, error = %err, "Publish failed")
        }
    }
}
