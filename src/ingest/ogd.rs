/// Open Government Data (OGD) platform client.
///
/// Retrieves the latest water quality record for each monitoring station
/// from a data.gov.in style resource:
///   {base_url}/resource/{resource_id}?api-key=...&format=json
///       &filters[station_code]={station}&limit=1
///
/// One request per station, run in parallel on a thread pool. Stations whose
/// request fails are left out of the result; the fetch as a whole fails only
/// when no station returns usable data.

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Duration;

use serde::Deserialize;
use threadpool::ThreadPool;

use crate::error::ReferenceError;
use crate::ingest::ReferenceSource;
use crate::model::{Parameter, ReferenceSample};
use crate::regions::RegionCatalog;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_PARALLEL_REQUESTS: usize = 4;

// ---------------------------------------------------------------------------
// Response structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OgdResponse {
    #[serde(default)]
    records: Vec<HashMap<String, serde_json::Value>>,
}

/// Field names accepted for each parameter, in order of preference.
const FIELD_ALIASES: [(Parameter, &[&str]); 7] = [
    (Parameter::Ph, &["ph"]),
    (Parameter::Turbidity, &["turbidity"]),
    (Parameter::Temperature, &["temperature"]),
    (Parameter::DissolvedOxygen, &["dissolved_oxygen", "do"]),
    (Parameter::Conductivity, &["conductivity"]),
    (Parameter::Tds, &["tds", "total_dissolved_solids"]),
    (Parameter::Chlorine, &["chlorine", "residual_chlorine"]),
];

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Network-backed reference source.
pub struct OgdSource {
    client: reqwest::blocking::Client,
    base_url: String,
    resource_id: String,
    api_key: String,
    /// (region, station code) pairs to request.
    stations: Vec<(String, String)>,
}

impl OgdSource {
    /// Builds a source for every catalog region that has a station code.
    pub fn new(
        base_url: &str,
        resource_id: &str,
        api_key: &str,
        catalog: &RegionCatalog,
    ) -> Result<Self, ReferenceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let stations = catalog
            .regions()
            .iter()
            .filter_map(|r| {
                r.station
                    .as_ref()
                    .map(|s| (r.name.clone(), s.station_id.clone()))
            })
            .collect();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            resource_id: resource_id.to_string(),
            api_key: api_key.to_string(),
            stations,
        })
    }

    /// Request URL for one station.
    pub fn station_url(&self, station_code: &str) -> String {
        build_station_url(&self.base_url, &self.resource_id, &self.api_key, station_code)
    }
}

impl ReferenceSource for OgdSource {
    fn fetch(&self) -> Result<HashMap<String, ReferenceSample>, ReferenceError> {
        let pool = ThreadPool::new(MAX_PARALLEL_REQUESTS.min(self.stations.len().max(1)));
        let (tx, rx) = mpsc::channel();

        for (region, station) in &self.stations {
            let tx = tx.clone();
            let region = region.clone();
            let station = station.clone();
            let url = self.station_url(&station);
            let client = self.client.clone();
            pool.execute(move || {
                let result = fetch_url(&client, &url);
                // Receiver outlives the pool; a send error means fetch() already returned.
                let _ = tx.send((region, station, result));
            });
        }
        drop(tx);

        let mut samples = HashMap::new();
        let mut failures = 0;
        for (region, station, result) in rx {
            match result {
                Ok(sample) => {
                    samples.insert(region, sample);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(region = %region, station = %station, error = %e, "Reference fetch failed");
                }
            }
        }

        if samples.is_empty() {
            return Err(ReferenceError::NoData(format!(
                "no station returned data ({} failed)",
                failures
            )));
        }

        Ok(samples)
    }

    fn name(&self) -> &str {
        "ogd"
    }
}

fn fetch_url(client: &reqwest::blocking::Client, url: &str) -> Result<ReferenceSample, ReferenceError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;

    if !response.status().is_success() {
        return Err(ReferenceError::HttpStatus(response.status().as_u16()));
    }

    parse_station_response(&response.text()?)
}

// ---------------------------------------------------------------------------
// URL construction and parsing
// ---------------------------------------------------------------------------

/// Builds the OGD request URL for a station, URL-encoding user values.
pub fn build_station_url(base_url: &str, resource_id: &str, api_key: &str, station_code: &str) -> String {
    format!(
        "{}/resource/{}?api-key={}&format=json&filters%5Bstation_code%5D={}&limit=1",
        base_url.trim_end_matches('/'),
        urlencoding::encode(resource_id),
        urlencoding::encode(api_key),
        urlencoding::encode(station_code),
    )
}

/// Parses the first record of an OGD response into a reference sample.
///
/// Numeric fields may be JSON numbers or numeric strings. Blank, `"NA"` and
/// unknown fields are skipped.
pub fn parse_station_response(json: &str) -> Result<ReferenceSample, ReferenceError> {
    let response: OgdResponse =
        serde_json::from_str(json).map_err(|e| ReferenceError::Parse(e.to_string()))?;

    let record = response
        .records
        .into_iter()
        .next()
        .ok_or_else(|| ReferenceError::NoData("no records in response".to_string()))?;

    let mut sample = ReferenceSample::new();
    for (parameter, aliases) in FIELD_ALIASES {
        let value = aliases
            .iter()
            .filter_map(|field| record.get(*field))
            .find_map(numeric_value);
        if let Some(v) = value {
            sample.insert(parameter, v);
        }
    }

    if sample.is_empty() {
        return Err(ReferenceError::NoData("record has no usable parameters".to_string()));
    }

    Ok(sample)
}

fn numeric_value(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
