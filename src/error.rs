/// Error types for the water quality monitoring service.
///
/// Only `UnknownRegion` and `InvalidRequest` ever reach a caller of the
/// query surface. Reference and publish failures are recovered where they
/// happen: a failed refresh keeps the previous cache, a failed publish is
/// counted and logged, and the worker moves on.

// ---------------------------------------------------------------------------
// Query surface
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The requested region is not in the region catalog.
    #[error("Region not found: {0}")]
    UnknownRegion(String),

    /// The request was malformed (bad severity filter, bad JSON body, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A transmission cycle failed for a reason other than a publish error.
    #[error("Transmission cycle failed: {0}")]
    Cycle(String),
}

// ---------------------------------------------------------------------------
// Reference acquisition
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// Non-2xx HTTP response from the reference API.
    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    /// The request never completed (network, DNS, timeout, ...).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// No station returned usable data.
    #[error("No data: {0}")]
    NoData(String),
}

// ---------------------------------------------------------------------------
// Downstream publishing
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The downstream consumer answered with a non-2xx status.
    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    /// The request exceeded its timeout.
    #[error("timeout")]
    Timeout,

    /// Any other transport failure.
    #[error("Request failed: {0}")]
    Request(String),

    /// The payload could not be serialized.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PublishError {
    /// Short code used in transmission log outcomes (`error-<code>`).
    pub fn code(&self) -> String {
        match self {
            PublishError::HttpStatus(status) => status.to_string(),
            PublishError::Timeout => "timeout".to_string(),
            PublishError::Request(_) => "request".to_string(),
            PublishError::Encode(_) => "encode".to_string(),
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PublishError::Timeout
        } else if let Some(status) = err.status() {
            PublishError::HttpStatus(status.as_u16())
        } else {
            PublishError::Request(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
