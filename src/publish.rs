/// Downstream delivery of readings and alerts.
///
/// A `Publisher` accepts a reading payload and an alert payload and reports
/// whether they were delivered. Two implementations:
/// - `LogPublisher`: logs what would be sent; nothing leaves the process
/// - `HttpPublisher`: POSTs JSON to the backend, optionally wrapped in a
///   Pub/Sub push envelope
///
/// The backend URL is read from the shared `TransmissionSettings` on every
/// call, so a URL posted to `/api/config` takes effect on the next publish.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::AlertPayload;
use crate::config::{API_VERSION, TransmissionSettings};
use crate::error::PublishError;
use crate::model::{DataSourcePolicy, Parameter, ParameterReading, QualityLevel, Reading};
use crate::monitor::read;

pub const SENSOR_UPLOAD_PATH: &str = "/api/sensor/upload";
pub const ALERT_PATH: &str = "/api/alerts/create";

const READING_TIMEOUT: Duration = Duration::from_secs(10);
const ALERT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Reading message sent to the sensor upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub sensor_id: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub data_source: DataSourcePolicy,
    /// Bare values, keyed by parameter.
    pub water_quality: BTreeMap<Parameter, f64>,
    pub water_quality_with_units: BTreeMap<Parameter, ParameterReading>,
    pub status: QualityLevel,
    pub alert: bool,
    pub quality_score: f64,
    pub recommendations: Vec<String>,
}

impl ReadingPayload {
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            sensor_id: reading.sensor_id.clone(),
            region: reading.region().to_string(),
            latitude: reading.location.latitude,
            longitude: reading.location.longitude,
            timestamp: reading.timestamp,
            data_source: reading.data_source,
            water_quality: reading
                .parameters
                .iter()
                .map(|(p, r)| (*p, r.value))
                .collect(),
            water_quality_with_units: reading.parameters.clone(),
            status: reading.status.level,
            alert: reading.status.alert,
            quality_score: reading.status.score,
            recommendations: reading.status.recommendations.clone(),
        }
    }
}

/// How a publish call succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishReceipt {
    /// The backend accepted the payload.
    Delivered,
    /// No backend configured; the payload was only logged.
    Simulated,
}

// ---------------------------------------------------------------------------
// Publisher trait
// ---------------------------------------------------------------------------

pub trait Publisher: Send + Sync {
    fn publish_reading(&self, payload: &ReadingPayload) -> Result<PublishReceipt, PublishError>;

    fn publish_alert(&self, payload: &AlertPayload) -> Result<PublishReceipt, PublishError>;
}

/// Logs payloads instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish_reading(&self, payload: &ReadingPayload) -> Result<PublishReceipt, PublishError> {
        tracing::info!(
            sensor_id = %payload.sensor_id,
            status = %payload.status,
            score = payload.quality_score,
            "Would send reading to backend"
        );
        Ok(PublishReceipt::Simulated)
    }

    fn publish_alert(&self, payload: &AlertPayload) -> Result<PublishReceipt, PublishError> {
        tracing::warn!(
            region = %payload.region,
            urgency = ?payload.urgency,
            score = payload.quality_score,
            "ALERT: {}",
            payload.message
        );
        Ok(PublishReceipt::Simulated)
    }
}

// ---------------------------------------------------------------------------
// HTTP publisher
// ---------------------------------------------------------------------------

/// POSTs payloads to the configured backend.
///
/// Falls back to `LogPublisher` behaviour while no backend URL is set.
pub struct HttpPublisher {
    client: reqwest::blocking::Client,
    settings: Arc<RwLock<TransmissionSettings>>,
    api_key: Option<String>,
    pubsub: bool,
}

impl HttpPublisher {
    pub fn new(
        settings: Arc<RwLock<TransmissionSettings>>,
        api_key: Option<String>,
        pubsub: bool,
    ) -> Result<Self, PublishError> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self { client, settings, api_key, pubsub })
    }

    fn backend_url(&self) -> Option<String> {
        read(&self.settings).backend_url.clone()
    }

    fn post<T: Serialize>(
        &self,
        url: &str,
        payload: &T,
        attributes: BTreeMap<&'static str, String>,
        data_source: DataSourcePolicy,
        timeout: Duration,
    ) -> Result<PublishReceipt, PublishError> {
        let body = if self.pubsub {
            pubsub_envelope(payload, attributes)?
        } else {
            serde_json::to_value(payload)?
        };

        let mut request = self
            .client
            .post(url)
            .timeout(timeout)
            .header("X-Data-Source", data_source.as_str())
            .header("X-API-Version", API_VERSION)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(PublishError::HttpStatus(response.status().as_u16()));
        }
        Ok(PublishReceipt::Delivered)
    }
}

impl Publisher for HttpPublisher {
    fn publish_reading(&self, payload: &ReadingPayload) -> Result<PublishReceipt, PublishError> {
        let Some(base) = self.backend_url() else {
            return LogPublisher.publish_reading(payload);
        };

        let attributes = BTreeMap::from([
            ("message_type", "sensor_data".to_string()),
            ("region", payload.region.clone()),
            ("sensor_id", payload.sensor_id.clone()),
        ]);
        let receipt = self.post(
            &format!("{}{}", base, SENSOR_UPLOAD_PATH),
            payload,
            attributes,
            payload.data_source,
            READING_TIMEOUT,
        )?;
        tracing::debug!(sensor_id = %payload.sensor_id, status = %payload.status, "Reading delivered");
        Ok(receipt)
    }

    fn publish_alert(&self, payload: &AlertPayload) -> Result<PublishReceipt, PublishError> {
        let Some(base) = self.backend_url() else {
            return LogPublisher.publish_alert(payload);
        };

        let attributes = BTreeMap::from([
            ("message_type", payload.kind.clone()),
            ("region", payload.region.clone()),
            ("sensor_id", payload.sensor_id.clone()),
        ]);
        self.post(
            &format!("{}{}", base, ALERT_PATH),
            payload,
            attributes,
            payload.data_source,
            ALERT_TIMEOUT,
        )
    }
}

/// Wraps `payload` in a Pub/Sub push envelope:
/// `{"messages": [{"data": <base64 JSON>, "attributes": {...}}]}`.
pub fn pubsub_envelope<T: Serialize>(
    payload: &T,
    attributes: BTreeMap<&'static str, String>,
) -> Result<serde_json::Value, PublishError> {
    let data = BASE64.encode(serde_json::to_vec(payload)?);
    Ok(serde_json::json!({
        "messages": [
            { "data": data, "attributes": attributes }
        ]
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
