/// Reading synthesis.
///
/// Builds a complete reading for a region by seeding each parameter from
/// cached reference data where the region's policy allows it, and shaping a
/// simulated value from the region's pollution factor everywhere else. The
/// finished parameter set is scored before the reading is returned.
///
/// Randomness comes from a `VariationSource` so tests can substitute a
/// fixed source and assert exact values.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::BTreeMap;

use crate::alert::quality;
use crate::error::MonitorError;
use crate::model::{
    CollectionMethod, DataSourcePolicy, Parameter, ParameterReading, Provenance, Reading,
    ReadingMetadata, ReferenceSample, SensorLocation,
};
use crate::monitor::ReferenceStore;
use crate::parameters::{PARAMETER_SPECS, ParameterSpec};
use crate::regions::{RegionCatalog, RegionProfile};

/// Days between calibrations are drawn from this inclusive range.
const CALIBRATION_AGE_DAYS: (i64, i64) = (1, 30);

// ---------------------------------------------------------------------------
// Variation source
// ---------------------------------------------------------------------------

/// Source of the random variation applied to synthesized values.
pub trait VariationSource {
    /// A value uniformly drawn from `[low, high)`. Returns `low` when the
    /// range is empty.
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// An integer uniformly drawn from `[low, high]`.
    fn whole(&mut self, low: i64, high: i64) -> i64;
}

/// `VariationSource` backed by any `rand` generator.
pub struct RngVariation<R>(pub R);

impl<R: Rng> VariationSource for RngVariation<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low < high { self.0.random_range(low..high) } else { low }
    }

    fn whole(&mut self, low: i64, high: i64) -> i64 {
        if low < high { self.0.random_range(low..=high) } else { low }
    }
}

/// Deterministic source: every draw lands at the same relative position
/// in its range (0.0 = low end, 1.0 = high end).
#[derive(Debug, Clone, Copy)]
pub struct FixedVariation {
    pub position: f64,
}

impl FixedVariation {
    /// Always the midpoint, i.e. zero jitter for symmetric ranges.
    pub fn midpoint() -> Self {
        Self { position: 0.5 }
    }
}

impl VariationSource for FixedVariation {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.position
    }

    fn whole(&mut self, low: i64, high: i64) -> i64 {
        low + ((high - low) as f64 * self.position).round() as i64
    }
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Produces readings for the regions of a catalog.
#[derive(Debug, Clone)]
pub struct ReadingSynthesizer {
    catalog: RegionCatalog,
}

impl ReadingSynthesizer {
    pub fn new(catalog: RegionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    /// Synthesizes a reading for `region` captured at `timestamp`.
    ///
    /// Fails only with `UnknownRegion`.
    pub fn synthesize(
        &self,
        region: &str,
        references: &ReferenceStore,
        timestamp: DateTime<Utc>,
        variation: &mut dyn VariationSource,
    ) -> Result<Reading, MonitorError> {
        let profile = self
            .catalog
            .find(region)
            .ok_or_else(|| MonitorError::UnknownRegion(region.to_string()))?;

        let sample = if profile.data_source.allows_reference() {
            references.get(region)
        } else {
            None
        };

        Ok(synthesize_for_profile(profile, sample.as_ref(), timestamp, variation))
    }
}

/// Synthesizes a reading for a known region profile.
pub fn synthesize_for_profile(
    profile: &RegionProfile,
    sample: Option<&ReferenceSample>,
    timestamp: DateTime<Utc>,
    variation: &mut dyn VariationSource,
) -> Reading {
    let sample = sample.filter(|_| profile.data_source.allows_reference());

    let parameters: BTreeMap<Parameter, ParameterReading> = PARAMETER_SPECS
        .iter()
        .map(|spec| {
            let reading = match sample.and_then(|s| s.get(&spec.parameter)) {
                Some(&reference) => reference_derived(spec, reference, variation),
                None => simulated(spec, profile.pollution_factor, variation),
            };
            (spec.parameter, reading)
        })
        .collect();

    let status = quality::assess(&parameters);

    let (low, high) = CALIBRATION_AGE_DAYS;
    let calibration_age = variation.whole(low, high);
    let metadata = ReadingMetadata {
        collection_method: match profile.data_source {
            DataSourcePolicy::Simulated => CollectionMethod::Sensor,
            _ => CollectionMethod::MonitoringNetwork,
        },
        quality_score: status.score,
        last_calibration: timestamp - Duration::days(calibration_age),
        sensor_health: "good".to_string(),
    };

    Reading {
        sensor_id: profile.sensor_id(),
        location: SensorLocation {
            region: profile.name.clone(),
            latitude: profile.latitude,
            longitude: profile.longitude,
            station_info: profile.station.clone(),
        },
        timestamp,
        data_source: profile.data_source,
        parameters,
        status,
        metadata: Some(metadata),
    }
}

/// Reference value with up to ±10% jitter.
fn reference_derived(
    spec: &ParameterSpec,
    reference: f64,
    variation: &mut dyn VariationSource,
) -> ParameterReading {
    let jitter = variation.uniform(-0.1, 0.1) * reference;
    ParameterReading {
        value: spec.normalize(reference + jitter),
        unit: spec.unit.to_string(),
        source: Provenance::ReferenceDerived,
    }
}

/// Value shaped from the ideal by the region's pollution factor.
fn simulated(
    spec: &ParameterSpec,
    pollution_factor: f64,
    variation: &mut dyn VariationSource,
) -> ParameterReading {
    let ideal = spec.ideal;
    let value = match spec.parameter {
        Parameter::Ph => ideal - pollution_factor * 0.5 + variation.uniform(-0.3, 0.3),
        Parameter::Turbidity => ideal * (1.0 + 3.0 * pollution_factor) + variation.uniform(-2.0, 5.0),
        Parameter::DissolvedOxygen => {
            ideal * (1.0 - 0.3 * pollution_factor) + variation.uniform(-1.0, 1.0)
        }
        _ => ideal * (1.0 + 0.5 * pollution_factor) + variation.uniform(-0.1 * ideal, 0.1 * ideal),
    };
    ParameterReading {
        value: spec.normalize(value),
        unit: spec.unit.to_string(),
        source: Provenance::Simulated,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
