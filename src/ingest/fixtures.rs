/// Fixed reference samples.
///
/// Representative values taken from CPCB National Water Quality Monitoring
/// Programme trends for the three Northeast India stations with published
/// data. Used when no reference API is configured, and by tests.
///
///   Guwahati  (AS001, Brahmaputra) - moderately turbid main stem
///   Shillong  (ML001, Umiam)       - clear, cool, well oxygenated
///   Dibrugarh (AS002, Brahmaputra) - turbid, lower dissolved oxygen

use std::collections::HashMap;

use crate::error::ReferenceError;
use crate::ingest::ReferenceSource;
use crate::model::{Parameter, ReferenceSample};

/// Source that always returns the same fixed samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureSource;

impl ReferenceSource for FixtureSource {
    fn fetch(&self) -> Result<HashMap<String, ReferenceSample>, ReferenceError> {
        Ok(fixture_samples())
    }

    fn name(&self) -> &str {
        "fixtures"
    }
}

/// The fixed per-region samples.
pub fn fixture_samples() -> HashMap<String, ReferenceSample> {
    use Parameter::*;

    let patterns: [(&str, [(Parameter, f64); 6]); 3] = [
        (
            "Guwahati",
            [(Ph, 7.1), (Turbidity, 12.5), (DissolvedOxygen, 6.8), (Temperature, 24.5), (Conductivity, 185.0), (Tds, 92.0)],
        ),
        (
            "Shillong",
            [(Ph, 6.9), (Turbidity, 3.2), (DissolvedOxygen, 8.1), (Temperature, 18.2), (Conductivity, 78.0), (Tds, 39.0)],
        ),
        (
            "Dibrugarh",
            [(Ph, 7.3), (Turbidity, 15.8), (DissolvedOxygen, 5.9), (Temperature, 26.1), (Conductivity, 165.0), (Tds, 82.0)],
        ),
    ];

    patterns
        .into_iter()
        .map(|(region, values)| (region.to_string(), values.into_iter().collect()))
        .collect()
}

/// Sample OGD API response for a single station (Guwahati, AS001).
/// Values arrive as strings, the way the OGD platform publishes them;
/// `water_temp` is not a field the parser understands.
#[cfg(test)]
pub(crate) fn fixture_ogd_guwahati_json() -> &'static str {
    r#"{
      "status": "ok",
      "total": 1,
      "records": [
        {
          "station_code": "AS001",
          "station_name": "Brahmaputra at Guwahati",
          "state": "Assam",
          "sampling_date": "2025-09-01",
          "ph": "7.1",
          "turbidity": "12.5",
          "dissolved_oxygen": "6.8",
          "temperature": 24.5,
          "conductivity": "185",
          "tds": "NA",
          "water_temp": "24.4"
        }
      ]
    }"#
}

/// OGD response with no records for the requested station.
#[cfg(test)]
pub(crate) fn fixture_ogd_empty_json() -> &'static str {
    r#"{ "status": "ok", "total": 0, "records": [] }"#
}
