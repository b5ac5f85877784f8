/// Parameter registry: valid range, ideal value and unit for every
/// measured water quality parameter.
///
/// This is the single source of truth for parameter bounds. Synthesis clamps
/// every value into `[min, max]` from here, and the quality assessor reads
/// its thresholds against the same parameters.

use crate::model::Parameter;

/// Range and unit metadata for a single parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub parameter: Parameter,
    pub min: f64,
    pub max: f64,
    pub ideal: f64,
    pub unit: &'static str,
}

impl ParameterSpec {
    /// Clamps `value` into this parameter's range and rounds to two decimals.
    ///
    /// All bounds carry at most two decimals, so rounding never pushes a
    /// clamped value back out of range.
    pub fn normalize(&self, value: f64) -> f64 {
        round2(value.clamp(self.min, self.max))
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// All parameters, in reading order.
///
/// Ranges follow BIS 10500 drinking water guidance as used by the
/// Northeast India monitoring network.
pub static PARAMETER_SPECS: &[ParameterSpec] = &[
    ParameterSpec { parameter: Parameter::Ph, min: 6.5, max: 8.5, ideal: 7.0, unit: "pH" },
    ParameterSpec { parameter: Parameter::Turbidity, min: 0.0, max: 100.0, ideal: 5.0, unit: "NTU" },
    ParameterSpec { parameter: Parameter::Temperature, min: 15.0, max: 35.0, ideal: 25.0, unit: "°C" },
    ParameterSpec { parameter: Parameter::DissolvedOxygen, min: 5.0, max: 14.0, ideal: 8.0, unit: "mg/L" },
    ParameterSpec { parameter: Parameter::Conductivity, min: 50.0, max: 500.0, ideal: 150.0, unit: "µS/cm" },
    ParameterSpec { parameter: Parameter::Tds, min: 50.0, max: 300.0, ideal: 100.0, unit: "mg/L" },
    ParameterSpec { parameter: Parameter::Chlorine, min: 0.0, max: 4.0, ideal: 0.5, unit: "mg/L" },
];

/// Looks up the spec for a parameter. The registry is declared in
/// `Parameter` order, so the discriminant is the index.
pub fn spec_for(parameter: Parameter) -> &'static ParameterSpec {
    &PARAMETER_SPECS[parameter as usize]
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
