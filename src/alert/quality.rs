//! Water quality scoring.
//!
//! `assess` turns a reading's parameter values into a `QualityStatus`. It is
//! a pure function: the same values always produce the same status.
//!
//! Five parameters are scored (pH, turbidity, temperature, dissolved oxygen,
//! conductivity). TDS and chlorine are reported but do not contribute.

use std::collections::BTreeMap;

use crate::model::{Parameter, ParameterReading, QualityLevel, QualityStatus};

/// Parameters that contribute points to the score.
pub const SCORED_PARAMETERS: [Parameter; 5] = [
    Parameter::Ph,
    Parameter::Turbidity,
    Parameter::Temperature,
    Parameter::DissolvedOxygen,
    Parameter::Conductivity,
];

/// Issue note attached to readings forced into an alert state.
pub const SIMULATED_CRITICAL_CONDITION: &str = "Simulated critical condition";

/// Score forced onto readings by `simulate(force_alert)`.
pub const FORCED_ALERT_SCORE: f64 = 0.3;

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// A critical finding recorded while scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum QualityIssue {
    PhOutOfRange(f64),
    HighTurbidity(f64),
    LowDissolvedOxygen(f64),
    /// Injected by forced-alert simulation; carries no remediation hint.
    Simulated,
}

impl QualityIssue {
    pub fn description(&self) -> String {
        match self {
            QualityIssue::PhOutOfRange(v) => format!("pH out of safe range: {}", v),
            QualityIssue::HighTurbidity(v) => format!("High turbidity: {} NTU", v),
            QualityIssue::LowDissolvedOxygen(v) => format!("Low dissolved oxygen: {} mg/L", v),
            QualityIssue::Simulated => SIMULATED_CRITICAL_CONDITION.to_string(),
        }
    }

    fn remediation(&self) -> Option<&'static str> {
        match self {
            QualityIssue::PhOutOfRange(_) => {
                Some("Check for industrial discharge or natural mineral content")
            }
            QualityIssue::HighTurbidity(_) => {
                Some("Install filtration system or check for soil erosion")
            }
            QualityIssue::LowDissolvedOxygen(_) => {
                Some("Check for organic pollution or algal growth")
            }
            QualityIssue::Simulated => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Scores a complete parameter set.
///
/// Missing scored parameters earn no points and record no issue; synthesized
/// readings are always complete, so this only matters for hand-built input.
pub fn assess(parameters: &BTreeMap<Parameter, ParameterReading>) -> QualityStatus {
    let value = |p: Parameter| parameters.get(&p).map(|r| r.value);

    let mut points = 0.0;
    let mut issues = Vec::new();

    if let Some(ph) = value(Parameter::Ph) {
        if (6.5..=8.5).contains(&ph) {
            points += 1.0;
        } else {
            issues.push(QualityIssue::PhOutOfRange(ph));
        }
    }

    if let Some(turbidity) = value(Parameter::Turbidity) {
        if turbidity <= 5.0 {
            points += 1.0;
        } else if turbidity <= 25.0 {
            points += 0.5;
        } else {
            issues.push(QualityIssue::HighTurbidity(turbidity));
        }
    }

    if let Some(temperature) = value(Parameter::Temperature) {
        if (20.0..=30.0).contains(&temperature) {
            points += 1.0;
        }
    }

    if let Some(oxygen) = value(Parameter::DissolvedOxygen) {
        if oxygen >= 6.0 {
            points += 1.0;
        } else if oxygen >= 4.0 {
            points += 0.5;
        } else {
            issues.push(QualityIssue::LowDissolvedOxygen(oxygen));
        }
    }

    if let Some(conductivity) = value(Parameter::Conductivity) {
        if conductivity <= 300.0 {
            points += 1.0;
        }
    }

    let score = points / SCORED_PARAMETERS.len() as f64;
    status_for(score, &issues)
}

/// Maps a score to its level. Each bracket includes its lower bound.
pub fn level_for_score(score: f64) -> QualityLevel {
    if score >= 0.8 {
        QualityLevel::Excellent
    } else if score >= 0.6 {
        QualityLevel::Good
    } else if score >= 0.4 {
        QualityLevel::Fair
    } else {
        QualityLevel::Poor
    }
}

/// Builds the full status for a score and its recorded issues.
pub fn status_for(score: f64, issues: &[QualityIssue]) -> QualityStatus {
    let level = level_for_score(score);
    QualityStatus {
        level,
        score,
        alert: level.is_alert(),
        color: level.color(),
        critical_issues: issues.iter().map(QualityIssue::description).collect(),
        recommendations: recommendations(score, issues),
    }
}

/// Status used when an alert is forced for integration testing.
pub fn forced_alert_status() -> QualityStatus {
    status_for(FORCED_ALERT_SCORE, &[QualityIssue::Simulated])
}

fn recommendations(score: f64, issues: &[QualityIssue]) -> Vec<String> {
    let mut out = Vec::new();

    if score < 0.4 {
        out.push("Immediate action required - Do not use for drinking".to_string());
        out.push("Contact local health authorities".to_string());
    } else if score < 0.6 {
        out.push("Boil water before consumption".to_string());
        out.push("Consider alternative water sources".to_string());
    }

    out.extend(issues.iter().filter_map(QualityIssue::remediation).map(String::from));
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provenance;

    /// Builds a parameter set; unscored parameters get neutral values.
    fn params(ph: f64, turbidity: f64, temperature: f64, oxygen: f64, conductivity: f64) -> BTreeMap<Parameter, ParameterReading> {
        let values = [
            (Parameter::Ph, ph),
            (Parameter::Turbidity, turbidity),
            (Parameter::Temperature, temperature),
            (Parameter::DissolvedOxygen, oxygen),
            (Parameter::Conductivity, conductivity),
            (Parameter::Tds, 100.0),
            (Parameter::Chlorine, 0.5),
        ];
        values
            .into_iter()
            .map(|(p, value)| {
                (p, ParameterReading { value, unit: String::new(), source: Provenance::Simulated })
            })
            .collect()
    }

    #[test]
    fn test_perfect_reading_is_excellent() {
        let status = assess(&params(7.0, 2.0, 25.0, 8.0, 150.0));
        assert_eq!(status.score, 1.0);
        assert_eq!(status.level, QualityLevel::Excellent);
        assert!(!status.alert);
        assert!(status.critical_issues.is_empty());
        assert!(status.recommendations.is_empty());
    }

    #[test]
    fn test_score_of_exactly_point_eight_is_excellent() {
        // Temperature out of its scoring band: 4 of 5 points.
        let status = assess(&params(7.0, 2.0, 18.0, 8.0, 150.0));
        assert_eq!(status.score, 0.8);
        assert_eq!(status.level, QualityLevel::Excellent);
    }

    #[test]
    fn test_score_just_below_point_eight_is_good() {
        // Half turbidity credit, temperature out of band: 3.5 / 5.
        let status = assess(&params(7.0, 10.0, 18.0, 8.0, 150.0));
        assert_eq!(status.score, 0.7);
        assert_eq!(status.level, QualityLevel::Good);
        assert_eq!(level_for_score(0.79999), QualityLevel::Good);
    }

    #[test]
    fn test_threshold_boundaries_both_sides() {
        assert_eq!(level_for_score(0.8), QualityLevel::Excellent);
        assert_eq!(level_for_score(0.79999), QualityLevel::Good);
        assert_eq!(level_for_score(0.6), QualityLevel::Good);
        assert_eq!(level_for_score(0.59999), QualityLevel::Fair);
        assert_eq!(level_for_score(0.4), QualityLevel::Fair);
        assert_eq!(level_for_score(0.39999), QualityLevel::Poor);
    }

    #[test]
    fn test_exact_point_six_and_point_four_from_parameters() {
        // 3 of 5 points.
        let good = assess(&params(7.0, 2.0, 18.0, 8.0, 400.0));
        assert_eq!(good.score, 0.6);
        assert_eq!(good.level, QualityLevel::Good);
        assert!(!good.alert);

        // 2 of 5 points.
        let fair = assess(&params(7.0, 2.0, 18.0, 3.0, 400.0));
        assert_eq!(fair.score, 0.4);
        assert_eq!(fair.level, QualityLevel::Fair);
        assert!(fair.alert);
    }

    #[test]
    fn test_inclusive_parameter_bands() {
        // Every scored value sits exactly on an inclusive boundary.
        let status = assess(&params(6.5, 5.0, 20.0, 6.0, 300.0));
        assert_eq!(status.score, 1.0);

        let upper = assess(&params(8.5, 5.0, 30.0, 6.0, 300.0));
        assert_eq!(upper.score, 1.0);
    }

    #[test]
    fn test_partial_credit_bands() {
        // turbidity 25 and oxygen 4 each earn half a point.
        let status = assess(&params(7.0, 25.0, 25.0, 4.0, 150.0));
        assert_eq!(status.score, 0.8);
        assert!(status.critical_issues.is_empty());
    }

    #[test]
    fn test_poor_reading_issues_and_recommendations() {
        let status = assess(&params(9.0, 40.0, 18.0, 3.0, 400.0));
        assert_eq!(status.score, 0.0);
        assert_eq!(status.level, QualityLevel::Poor);
        assert!(status.alert);
        assert_eq!(
            status.critical_issues,
            vec![
                "pH out of safe range: 9".to_string(),
                "High turbidity: 40 NTU".to_string(),
                "Low dissolved oxygen: 3 mg/L".to_string(),
            ]
        );
        assert_eq!(
            status.recommendations,
            vec![
                "Immediate action required - Do not use for drinking",
                "Contact local health authorities",
                "Check for industrial discharge or natural mineral content",
                "Install filtration system or check for soil erosion",
                "Check for organic pollution or algal growth",
            ]
        );
    }

    #[test]
    fn test_fair_reading_recommends_boiling() {
        // pH fails, turbidity half, temperature fails, oxygen full, conductivity full.
        let status = assess(&params(9.0, 10.0, 18.0, 8.0, 150.0));
        assert_eq!(status.score, 0.5);
        assert_eq!(status.level, QualityLevel::Fair);
        assert_eq!(
            status.recommendations,
            vec![
                "Boil water before consumption",
                "Consider alternative water sources",
                "Check for industrial discharge or natural mineral content",
            ]
        );
    }

    #[test]
    fn test_unscored_parameters_do_not_affect_score() {
        let mut a = params(7.0, 10.0, 25.0, 8.0, 150.0);
        let b = a.clone();
        a.get_mut(&Parameter::Tds).unwrap().value = 300.0;
        a.get_mut(&Parameter::Chlorine).unwrap().value = 4.0;
        assert_eq!(assess(&a), assess(&b));
    }

    #[test]
    fn test_assess_is_deterministic() {
        let p = params(7.2, 12.5, 24.5, 6.8, 185.0);
        assert_eq!(assess(&p), assess(&p));
    }

    #[test]
    fn test_colors_follow_level() {
        assert_eq!(status_for(1.0, &[]).color, crate::model::StatusColor::Green);
        assert_eq!(status_for(0.6, &[]).color, crate::model::StatusColor::Blue);
        assert_eq!(status_for(0.4, &[]).color, crate::model::StatusColor::Yellow);
        assert_eq!(status_for(0.2, &[]).color, crate::model::StatusColor::Red);
    }

    #[test]
    fn test_forced_alert_status() {
        let status = forced_alert_status();
        assert_eq!(status.level, QualityLevel::Poor);
        assert_eq!(status.score, 0.3);
        assert!(status.alert);
        assert_eq!(status.critical_issues, vec![SIMULATED_CRITICAL_CONDITION.to_string()]);
        assert_eq!(status.recommendations.len(), 2);
    }
}
