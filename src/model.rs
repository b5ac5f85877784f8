/// Core data types for the water quality monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// Apart from a few naming helpers it contains no logic and no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// A measured water quality parameter.
///
/// Serialized with the keys the downstream consumers already use
/// (`ph`, `dissolved_oxygen`, `tds`, ...). Declaration order is the order
/// parameters appear in every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// Acidity (pH).
    Ph,
    Turbidity,
    Temperature,
    DissolvedOxygen,
    Conductivity,
    /// Total dissolved solids.
    Tds,
    /// Residual chlorine (disinfectant).
    Chlorine,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::Ph,
        Parameter::Turbidity,
        Parameter::Temperature,
        Parameter::DissolvedOxygen,
        Parameter::Conductivity,
        Parameter::Tds,
        Parameter::Chlorine,
    ];

    /// Wire key for this parameter.
    pub fn key(&self) -> &'static str {
        match self {
            Parameter::Ph => "ph",
            Parameter::Turbidity => "turbidity",
            Parameter::Temperature => "temperature",
            Parameter::DissolvedOxygen => "dissolved_oxygen",
            Parameter::Conductivity => "conductivity",
            Parameter::Tds => "tds",
            Parameter::Chlorine => "chlorine",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .iter()
            .copied()
            .find(|p| p.key() == s)
            .ok_or_else(|| format!("unknown parameter '{}'", s))
    }
}

/// Raw reference values for one region, keyed by parameter.
/// Parameters the source did not report are simply absent.
pub type ReferenceSample = BTreeMap<Parameter, f64>;

// ---------------------------------------------------------------------------
// Region policy and provenance
// ---------------------------------------------------------------------------

/// Where a region's readings are allowed to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourcePolicy {
    /// Reference-derived wherever reference data exists.
    Reference,
    /// Reference-derived where available, simulated for the rest.
    Blended,
    /// Always simulated.
    Simulated,
}

impl DataSourcePolicy {
    pub fn allows_reference(&self) -> bool {
        !matches!(self, DataSourcePolicy::Simulated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourcePolicy::Reference => "reference",
            DataSourcePolicy::Blended => "blended",
            DataSourcePolicy::Simulated => "simulated",
        }
    }
}

impl fmt::Display for DataSourcePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    ReferenceDerived,
    Simulated,
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// One synthesized parameter value. `value` always lies within the
/// parameter's `[min, max]` range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterReading {
    pub value: f64,
    pub unit: String,
    pub source: Provenance,
}

/// Monitoring station a region's sensor is associated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub station_id: String,
    pub river: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorLocation {
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_info: Option<StationInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionMethod {
    Sensor,
    MonitoringNetwork,
}

/// Synthesis metadata, stripped from query results unless asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingMetadata {
    pub collection_method: CollectionMethod,
    pub quality_score: f64,
    pub last_calibration: DateTime<Utc>,
    pub sensor_health: String,
}

/// A complete reading for one region at one instant.
///
/// `parameters` always holds one entry per known parameter. Readings are
/// never edited in place; regeneration produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: String,
    pub location: SensorLocation,
    pub timestamp: DateTime<Utc>,
    pub data_source: DataSourcePolicy,
    pub parameters: BTreeMap<Parameter, ParameterReading>,
    pub status: QualityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReadingMetadata>,
}

impl Reading {
    pub fn region(&self) -> &str {
        &self.location.region
    }

    /// Copy of this reading with synthesis metadata removed.
    pub fn without_metadata(&self) -> Reading {
        Reading {
            metadata: None,
            ..self.clone()
        }
    }

    /// Copy of this reading carrying a different status. The metadata
    /// quality score follows the new status.
    pub fn with_status(&self, status: QualityStatus) -> Reading {
        let metadata = self.metadata.clone().map(|m| ReadingMetadata {
            quality_score: status.score,
            ..m
        });
        Reading {
            status,
            metadata,
            ..self.clone()
        }
    }

    pub fn is_complete(&self) -> bool {
        Parameter::ALL.iter().all(|p| self.parameters.contains_key(p))
    }
}

// ---------------------------------------------------------------------------
// Quality status
// ---------------------------------------------------------------------------

/// Quality level, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Poor => "poor",
            QualityLevel::Fair => "fair",
            QualityLevel::Good => "good",
            QualityLevel::Excellent => "excellent",
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, QualityLevel::Poor | QualityLevel::Fair)
    }

    pub fn color(&self) -> StatusColor {
        match self {
            QualityLevel::Excellent => StatusColor::Green,
            QualityLevel::Good => StatusColor::Blue,
            QualityLevel::Fair => StatusColor::Yellow,
            QualityLevel::Poor => StatusColor::Red,
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poor" => Ok(QualityLevel::Poor),
            "fair" => Ok(QualityLevel::Fair),
            "good" => Ok(QualityLevel::Good),
            "excellent" => Ok(QualityLevel::Excellent),
            other => Err(format!("unknown quality level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Blue,
    Yellow,
    Red,
}

/// Assessed quality of a reading. `alert` is true exactly when the level
/// is `poor` or `fair`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityStatus {
    pub level: QualityLevel,
    pub score: f64,
    pub alert: bool,
    pub color: StatusColor,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Alert urgency, ordered so that `High` sorts above `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Medium,
    High,
}

impl Urgency {
    /// `high` below a score of 0.4, `medium` otherwise.
    pub fn for_score(score: f64) -> Self {
        if score < 0.4 { Urgency::High } else { Urgency::Medium }
    }
}

// ---------------------------------------------------------------------------
// Sensor state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Online,
    Offline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_keys_round_trip_through_from_str() {
        for p in Parameter::ALL {
            assert_eq!(p.key().parse::<Parameter>(), Ok(p));
        }
        assert!("lead".parse::<Parameter>().is_err());
    }

    #[test]
    fn test_parameter_serializes_with_wire_key() {
        let json = serde_json::to_string(&Parameter::DissolvedOxygen).unwrap();
        assert_eq!(json, "\"dissolved_oxygen\"");
    }

    #[test]
    fn test_quality_levels_are_ordered() {
        assert!(QualityLevel::Poor < QualityLevel::Fair);
        assert!(QualityLevel::Fair < QualityLevel::Good);
        assert!(QualityLevel::Good < QualityLevel::Excellent);
    }

    #[test]
    fn test_alert_levels() {
        assert!(QualityLevel::Poor.is_alert());
        assert!(QualityLevel::Fair.is_alert());
        assert!(!QualityLevel::Good.is_alert());
        assert!(!QualityLevel::Excellent.is_alert());
    }

    #[test]
    fn test_urgency_threshold() {
        assert_eq!(Urgency::for_score(0.3), Urgency::High);
        assert_eq!(Urgency::for_score(0.4), Urgency::Medium);
        assert!(Urgency::High > Urgency::Medium);
    }

    #[test]
    fn test_policy_serialization() {
        let json = serde_json::to_string(&DataSourcePolicy::Blended).unwrap();
        assert_eq!(json, "\"blended\"");
        assert!(DataSourcePolicy::Reference.allows_reference());
        assert!(DataSourcePolicy::Blended.allows_reference());
        assert!(!DataSourcePolicy::Simulated.allows_reference());
    }

    #[test]
    fn test_provenance_serialization() {
        let json = serde_json::to_string(&Provenance::ReferenceDerived).unwrap();
        assert_eq!(json, "\"reference-derived\"");
    }
}
