/// wqmon_service: Northeast India water quality monitoring service.
///
/// # Module structure
///
/// ```text
/// wqmon_service
/// ├── model       — shared data types (Reading, QualityStatus, Parameter, …)
/// ├── parameters  — parameter ranges, ideals and units
/// ├── regions     — region catalog (coordinates, pollution factor, policy)
/// ├── config      — regions.toml loader, environment config, live settings
/// ├── error       — error enums for queries, reference data, publishing, config
/// ├── logging     — tracing setup and publish-failure classification
/// ├── ingest
/// │   ├── ogd      — Open Government Data API client
/// │   └── fixtures — built-in CPCB-pattern reference samples
/// ├── monitor     — shared stores: reference cache and latest readings
/// ├── synthesis   — reading synthesis (reference blending + simulation)
/// ├── alert
/// │   └── quality — scoring, levels and recommendations
/// ├── service     — MonitorContext and query operations
/// ├── publish     — downstream reading/alert delivery
/// ├── daemon      — background transmission worker
/// └── endpoint    — HTTP API
/// ```

/// Public modules
pub mod alert;
pub mod config;
pub mod daemon;
pub mod endpoint;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod parameters;
pub mod publish;
pub mod regions;
pub mod service;
pub mod synthesis;
