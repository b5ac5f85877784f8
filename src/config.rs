/// Service configuration.
///
/// Two layers:
/// - `regions.toml`: the region catalog (coordinates, pollution factor,
///   data-source policy, station info), so regions can be added or tuned
///   without recompiling
/// - environment variables (optionally from `.env`): ports, intervals,
///   downstream and reference endpoints
///
/// `TransmissionSettings` is the subset that can be changed while running.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::regions::{RegionCatalog, RegionProfile};

/// Version tag reported by the status and config queries.
pub const API_VERSION: &str = "2.0";

/// The send interval can never be set below this.
pub const MIN_SEND_INTERVAL: Duration = Duration::from_secs(10);

pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PORT: u16 = 5000;

// ---------------------------------------------------------------------------
// Region catalog file
// ---------------------------------------------------------------------------

/// Root configuration structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RegionFile {
    region: Vec<RegionProfile>,
}

/// Loads and validates a region catalog from a TOML file.
///
/// Expects one `[[region]]` table per region; see `regions.toml`.
pub fn load_region_catalog(path: impl AsRef<Path>) -> Result<RegionCatalog, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;

    parse_region_catalog(&contents).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse { path: display, source },
        other => other,
    })
}

/// Parses a region catalog from TOML text.
pub fn parse_region_catalog(contents: &str) -> Result<RegionCatalog, ConfigError> {
    let file: RegionFile = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: "<inline>".to_string(),
        source,
    })?;

    RegionCatalog::new(file.region).map_err(ConfigError::Invalid)
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Startup configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP query endpoint port
    pub port: u16,
    /// Region catalog file; built-in catalog when unset
    pub regions_file: Option<String>,
    /// Delay between transmission cycles
    pub send_interval: Duration,
    /// Minimum age of reference data before it is re-fetched
    pub reference_refresh_interval: Duration,
    /// Downstream backend; readings are only logged when unset
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    /// Wrap downstream payloads in a Pub/Sub envelope
    pub pubsub: bool,
    /// Reference API base URL; fixed samples are used when unset
    pub reference_url: Option<String>,
    pub reference_resource: String,
    pub reference_api_key: String,
    /// tracing filter directive
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            regions_file: None,
            send_interval: DEFAULT_SEND_INTERVAL,
            reference_refresh_interval: crate::monitor::DEFAULT_REFRESH_INTERVAL,
            backend_url: None,
            api_key: None,
            pubsub: false,
            reference_url: None,
            reference_resource: "water-quality-nwmp".to_string(),
            reference_api_key: String::new(),
            log_filter: "wqmon_service=info".to_string(),
            log_json: false,
        }
    }
}

impl ServiceConfig {
    /// Reads `WQMON_*` variables, falling back to defaults for anything
    /// unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str| {
            non_empty(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };
        let flag = |key: &str| {
            non_empty(key).map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        };

        Self {
            port: non_empty("WQMON_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            regions_file: non_empty("WQMON_REGIONS_FILE"),
            send_interval: secs("WQMON_SEND_INTERVAL_SECS")
                .map(|d| d.max(MIN_SEND_INTERVAL))
                .unwrap_or(defaults.send_interval),
            reference_refresh_interval: secs("WQMON_REFERENCE_REFRESH_SECS")
                .unwrap_or(defaults.reference_refresh_interval),
            backend_url: non_empty("WQMON_BACKEND_URL"),
            api_key: non_empty("WQMON_API_KEY"),
            pubsub: flag("WQMON_PUBSUB").unwrap_or(defaults.pubsub),
            reference_url: non_empty("WQMON_REFERENCE_URL"),
            reference_resource: non_empty("WQMON_REFERENCE_RESOURCE")
                .unwrap_or(defaults.reference_resource),
            reference_api_key: non_empty("WQMON_REFERENCE_API_KEY")
                .unwrap_or(defaults.reference_api_key),
            log_filter: non_empty("WQMON_LOG").unwrap_or(defaults.log_filter),
            log_json: flag("WQMON_LOG_JSON").unwrap_or(defaults.log_json),
        }
    }

    pub fn transmission_settings(&self) -> TransmissionSettings {
        TransmissionSettings {
            backend_url: self.backend_url.clone(),
            send_interval: self.send_interval,
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime settings
// ---------------------------------------------------------------------------

/// Transmission settings that can be changed while the service runs.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionSettings {
    pub backend_url: Option<String>,
    pub send_interval: Duration,
}

impl Default for TransmissionSettings {
    fn default() -> Self {
        Self {
            backend_url: None,
            send_interval: DEFAULT_SEND_INTERVAL,
        }
    }
}

/// Partial update to `TransmissionSettings`, as posted to `/api/config`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SettingsUpdate {
    pub main_backend_url: Option<String>,
    pub send_interval: Option<u64>,
}

impl TransmissionSettings {
    /// Applies `update` and returns the names of the fields it changed.
    /// The send interval is floored at `MIN_SEND_INTERVAL`.
    pub fn apply(&mut self, update: &SettingsUpdate) -> Vec<&'static str> {
        let mut updated = Vec::new();

        if let Some(url) = &update.main_backend_url {
            self.backend_url = Some(url.trim_end_matches('/').to_string());
            updated.push("main_backend_url");
        }

        if let Some(secs) = update.send_interval {
            self.send_interval = Duration::from_secs(secs).max(MIN_SEND_INTERVAL);
            updated.push("send_interval");
        }

        updated
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
