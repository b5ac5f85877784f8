/// HTTP query endpoint.
///
/// Small blocking JSON API over tiny_http; requests are handed to a thread
/// pool so a slow fresh-reading request doesn't hold up `/health`.
///
/// Endpoints:
/// - GET  /health
/// - GET  /api/status
/// - GET  /api/sensors/latest?region=&metadata=true
/// - GET  /api/sensors/reading/{region}        (fresh reading)
/// - GET  /api/sensors/alerts?severity=poor|fair
/// - GET  /api/sensors/historical/{region}
/// - POST /api/data-sources/refresh
/// - POST /api/sensors/simulate               {"region": "all", "force_alert": false}
/// - POST /api/transmission/start | /api/transmission/stop
/// - GET  /api/transmission/stats
/// - GET | POST /api/config                   {"main_backend_url": ..., "send_interval": ...}
///
/// Every response is JSON with a `success` flag. Unknown regions and
/// unknown routes answer 404, malformed input 400.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use threadpool::ThreadPool;
use tiny_http::Method;

use crate::config::SettingsUpdate;
use crate::daemon::TransmissionWorker;
use crate::error::MonitorError;
use crate::model::QualityLevel;
use crate::service::{HISTORY_DAYS, MonitorContext, SimulationTarget};

const AVAILABLE_ENDPOINTS: &[&str] = &[
    "/health",
    "/api/status",
    "/api/sensors/latest",
    "/api/sensors/reading/{region}",
    "/api/sensors/alerts",
    "/api/sensors/historical/{region}",
    "/api/data-sources/refresh",
    "/api/sensors/simulate",
    "/api/transmission/start",
    "/api/transmission/stop",
    "/api/transmission/stats",
    "/api/config",
];

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Everything a request handler can reach.
pub struct Api {
    pub context: Arc<MonitorContext>,
    pub worker: Arc<TransmissionWorker>,
}

/// Status code plus JSON body, before it is turned into a tiny_http response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body: with_success(body, true) }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": message.into() }),
        }
    }

    fn from_error(err: &MonitorError) -> Self {
        let status = match err {
            MonitorError::UnknownRegion(_) => 404,
            MonitorError::InvalidRequest(_) => 400,
            MonitorError::Cycle(_) => 500,
        };
        Self::error(status, err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SimulateRequest {
    #[serde(default = "default_simulation_region")]
    region: String,
    #[serde(default)]
    force_alert: bool,
}

fn default_simulation_region() -> String {
    "all".to_string()
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routes one request. `url` may carry a query string.
pub fn route(api: &Api, method: &Method, url: &str, body: &str) -> ApiResponse {
    let (path, query) = split_url(url);
    let path = path.trim_end_matches('/');

    match (method, path) {
        (Method::Get, "/health") => handle_health(),
        (Method::Get, "/api/status") => {
            ApiResponse::ok(serde_json::to_value(api.context.status()).unwrap_or_default())
        }
        (Method::Get, "/api/sensors/latest") => handle_latest(api, &query),
        (Method::Get, "/api/sensors/alerts") => handle_alerts(api, &query),
        (Method::Post, "/api/data-sources/refresh") => handle_refresh(api),
        (Method::Post, "/api/sensors/simulate") => handle_simulate(api, body),
        (Method::Post, "/api/transmission/start") => {
            let started = api.worker.start();
            ApiResponse::ok(json!({
                "message": if started { "Data transmission started" } else { "Data transmission already running" },
                "running": api.worker.is_running(),
            }))
        }
        (Method::Post, "/api/transmission/stop") => {
            let stopped = api.worker.stop();
            ApiResponse::ok(json!({
                "message": if stopped { "Data transmission stopped" } else { "Data transmission not running" },
                "running": api.worker.is_running(),
            }))
        }
        (Method::Get, "/api/transmission/stats") => {
            ApiResponse::ok(json!({ "stats": api.worker.stats() }))
        }
        (Method::Get, "/api/config") => {
            ApiResponse::ok(serde_json::to_value(api.worker.config()).unwrap_or_default())
        }
        (Method::Post, "/api/config") => handle_update_config(api, body),
        (Method::Get, p) if p.starts_with("/api/sensors/reading/") => {
            let region = decode(p.trim_start_matches("/api/sensors/reading/"));
            match api.context.fresh_reading(&region) {
                Ok(reading) => ApiResponse::ok(json!({
                    "data": &*reading,
                    "generated_at": Utc::now(),
                })),
                Err(e) => ApiResponse::from_error(&e),
            }
        }
        (Method::Get, p) if p.starts_with("/api/sensors/historical/") => {
            let region = decode(p.trim_start_matches("/api/sensors/historical/"));
            match api.context.historical(&region) {
                Ok(data) => ApiResponse::ok(json!({
                    "region": region,
                    "count": data.len(),
                    "period": format!("{}_days", HISTORY_DAYS),
                    "data": data,
                })),
                Err(e) => ApiResponse::from_error(&e),
            }
        }
        _ => ApiResponse {
            status: 404,
            body: json!({
                "success": false,
                "error": "Not found",
                "available_endpoints": AVAILABLE_ENDPOINTS,
            }),
        },
    }
}

fn handle_health() -> ApiResponse {
    ApiResponse {
        status: 200,
        body: json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    }
}

fn handle_latest(api: &Api, query: &HashMap<String, String>) -> ApiResponse {
    let include_metadata = query
        .get("metadata")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    let region = query.get("region").map(String::as_str).filter(|r| !r.is_empty());

    match api.context.latest(region, include_metadata) {
        Ok(mut readings) => match region {
            Some(region) => ApiResponse::ok(json!({ "data": readings.remove(region) })),
            None => ApiResponse::ok(json!({ "count": readings.len(), "data": readings })),
        },
        Err(e) => ApiResponse::from_error(&e),
    }
}

fn handle_alerts(api: &Api, query: &HashMap<String, String>) -> ApiResponse {
    let severity = match query.get("severity").map(String::as_str) {
        None | Some("") | Some("all") => None,
        Some(level) => match level.parse::<QualityLevel>() {
            Ok(level) => Some(level),
            Err(e) => return ApiResponse::from_error(&MonitorError::InvalidRequest(e)),
        },
    };

    ApiResponse::ok(serde_json::to_value(api.context.alerts(severity)).unwrap_or_default())
}

fn handle_refresh(api: &Api) -> ApiResponse {
    let refreshed = api.context.refresh_sources();
    let message = if refreshed {
        "Data sources refreshed successfully"
    } else {
        "Failed to refresh data sources"
    };
    let body = json!({ "message": message, "timestamp": Utc::now() });
    ApiResponse { status: 200, body: with_success(body, refreshed) }
}

fn handle_simulate(api: &Api, body: &str) -> ApiResponse {
    let request: SimulateRequest = match parse_body(body) {
        Ok(request) => request,
        Err(e) => return ApiResponse::from_error(&e),
    };

    let target = SimulationTarget::parse(&request.region);
    match api.context.simulate(&target, request.force_alert) {
        Ok(readings) => match target {
            SimulationTarget::All => ApiResponse::ok(json!({
                "message": "All sensors updated",
                "regions_updated": readings.iter().map(|r| r.region()).collect::<Vec<_>>(),
            })),
            SimulationTarget::Region(region) => ApiResponse::ok(json!({
                "message": format!("Sensor for {} updated", region),
                "data": readings.first().map(|r| &**r),
            })),
        },
        Err(e) => ApiResponse::from_error(&e),
    }
}

fn handle_update_config(api: &Api, body: &str) -> ApiResponse {
    let update: SettingsUpdate = match parse_body(body) {
        Ok(update) => update,
        Err(e) => return ApiResponse::from_error(&e),
    };

    let updated_fields = api.worker.update_config(&update);
    ApiResponse::ok(json!({
        "message": "Configuration updated",
        "updated_fields": updated_fields,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parses a JSON body; an empty body is treated as `{}`.
fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, MonitorError> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(|e| MonitorError::InvalidRequest(e.to_string()))
}

fn with_success(body: Value, success: bool) -> Value {
    match body {
        Value::Object(mut map) => {
            map.insert("success".to_string(), Value::Bool(success));
            Value::Object(map)
        }
        other => json!({ "success": success, "data": other }),
    }
}

/// Splits a request URL into its path and decoded query parameters.
pub fn split_url(url: &str) -> (&str, HashMap<String, String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect();
    (path, params)
}

fn decode(value: &str) -> String {
    let value = value.replace('+', " ");
    urlencoding::decode(&value)
        .map(|v| v.into_owned())
        .unwrap_or(value)
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Serves the API on `port` until the process exits.
pub fn start_endpoint_server(api: Arc<Api>, port: u16, workers: usize) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;
    let pool = ThreadPool::new(workers.max(1));

    tracing::info!(port, workers, "HTTP endpoint listening");

    for request in server.incoming_requests() {
        let api = Arc::clone(&api);
        pool.execute(move || handle_request(&api, request));
    }

    Ok(())
}

fn handle_request(api: &Api, mut request: tiny_http::Request) {
    let mut body = String::new();
    let response = match request.as_reader().read_to_string(&mut body) {
        Ok(_) => route(api, request.method(), request.url(), &body),
        Err(e) => ApiResponse::error(400, format!("Unreadable request body: {}", e)),
    };

    tracing::debug!(method = %request.method(), url = request.url(), status = response.status, "Request handled");

    if let Err(e) = request.respond(create_response(&response)) {
        tracing::warn!(error = %e, "Failed to send response");
    }
}

/// Create HTTP response with JSON body
fn create_response(response: &ApiResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let bytes = serde_json::to_vec_pretty(&response.body).unwrap_or_default();

    let mut http = tiny_http::Response::from_data(bytes)
        .with_status_code(tiny_http::StatusCode::from(response.status));
    if let Ok(header) = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        http = http.with_header(header);
    }
    http
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
