//! Quality alerts.
//!
//! `quality` scores readings. This module turns alerting readings into the
//! two shapes consumers see: `AlertSummary` for the alerts query and
//! `AlertPayload` for the downstream alert channel.

pub mod quality;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    DataSourcePolicy, QualityLevel, Reading, SensorLocation, StatusColor, Urgency,
};

// ---------------------------------------------------------------------------
// Query view
// ---------------------------------------------------------------------------

/// One region's current alert, as returned by the alerts query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub region: String,
    pub sensor_id: String,
    pub alert_level: QualityLevel,
    pub severity_color: StatusColor,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub location: SensorLocation,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub data_source: DataSourcePolicy,
    pub urgency: Urgency,
}

impl AlertSummary {
    /// Returns `None` if the reading is not alerting.
    pub fn from_reading(reading: &Reading) -> Option<Self> {
        if !reading.status.alert {
            return None;
        }
        Some(Self {
            region: reading.region().to_string(),
            sensor_id: reading.sensor_id.clone(),
            alert_level: reading.status.level,
            severity_color: reading.status.color,
            score: reading.status.score,
            timestamp: reading.timestamp,
            location: reading.location.clone(),
            critical_issues: reading.status.critical_issues.clone(),
            recommendations: reading.status.recommendations.clone(),
            data_source: reading.data_source,
            urgency: Urgency::for_score(reading.status.score),
        })
    }
}

/// Orders alerts high urgency first, then lowest score first.
pub fn sort_alerts(alerts: &mut [AlertSummary]) {
    alerts.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then_with(|| a.score.total_cmp(&b.score))
    });
}

// ---------------------------------------------------------------------------
// Downstream payload
// ---------------------------------------------------------------------------

/// Alert message published downstream for every alerting reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub region: String,
    pub severity: QualityLevel,
    pub urgency: Urgency,
    pub message: String,
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub quality_score: f64,
    pub data_source: DataSourcePolicy,
}

impl AlertPayload {
    /// Returns `None` if the reading is not alerting.
    pub fn from_reading(reading: &Reading) -> Option<Self> {
        if !reading.status.alert {
            return None;
        }
        Some(Self {
            kind: "water_quality_alert".to_string(),
            region: reading.region().to_string(),
            severity: reading.status.level,
            urgency: Urgency::for_score(reading.status.score),
            message: format!(
                "Water quality alert in {} - {} quality detected",
                reading.region(),
                reading.status.level
            ),
            sensor_id: reading.sensor_id.clone(),
            timestamp: reading.timestamp,
            critical_issues: reading.status.critical_issues.clone(),
            recommendations: reading.status.recommendations.clone(),
            quality_score: reading.status.score,
            data_source: reading.data_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::quality::status_for;
    use std::collections::BTreeMap;

    fn reading(region: &str, score: f64) -> Reading {
        Reading {
            sensor_id: format!("WQ_{}_01", region.to_uppercase()),
            location: SensorLocation {
                region: region.to_string(),
                latitude: 26.0,
                longitude: 92.0,
                station_info: None,
            },
            timestamp: Utc::now(),
            data_source: DataSourcePolicy::Simulated,
            parameters: BTreeMap::new(),
            status: status_for(score, &[]),
            metadata: None,
        }
    }

    #[test]
    fn test_non_alerting_reading_has_no_alert() {
        assert!(AlertSummary::from_reading(&reading("Kohima", 0.8)).is_none());
        assert!(AlertPayload::from_reading(&reading("Kohima", 0.6)).is_none());
    }

    #[test]
    fn test_alert_payload_fields() {
        let payload = AlertPayload::from_reading(&reading("Guwahati", 0.3)).unwrap();
        assert_eq!(payload.kind, "water_quality_alert");
        assert_eq!(payload.severity, QualityLevel::Poor);
        assert_eq!(payload.urgency, Urgency::High);
        assert_eq!(payload.message, "Water quality alert in Guwahati - poor quality detected");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "water_quality_alert");
        assert_eq!(json["urgency"], "high");
    }

    #[test]
    fn test_fair_reading_is_medium_urgency() {
        let summary = AlertSummary::from_reading(&reading("Agartala", 0.5)).unwrap();
        assert_eq!(summary.urgency, Urgency::Medium);
        assert_eq!(summary.alert_level, QualityLevel::Fair);
    }

    #[test]
    fn test_sort_high_urgency_first_then_lowest_score() {
        let mut alerts: Vec<_> = [("A", 0.5), ("B", 0.2), ("C", 0.4), ("D", 0.3)]
            .iter()
            .filter_map(|(r, s)| AlertSummary::from_reading(&reading(r, *s)))
            .collect();
        sort_alerts(&mut alerts);
        let order: Vec<_> = alerts.iter().map(|a| a.region.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "C", "A"]);
    }
}
