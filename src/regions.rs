/// Region catalog for the water quality monitoring service.
///
/// Defines the monitored regions (one logical sensor each) with their
/// coordinates, pollution intensity and data-source policy. The catalog is
/// either the built-in Northeast India network below or loaded from
/// `regions.toml` via `config::load_region_catalog`. It never changes after
/// startup.

use crate::model::{DataSourcePolicy, StationInfo};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Region metadata
// ---------------------------------------------------------------------------

/// Static metadata for one monitored region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionProfile {
    /// Unique region name, e.g. "Guwahati".
    pub name: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Pollution intensity in [0, 1]; biases simulated values toward
    /// worse readings.
    pub pollution_factor: f64,
    /// Whether reference data may seed this region's readings.
    pub data_source: DataSourcePolicy,
    /// Monitoring station the region's sensor reports alongside.
    #[serde(default)]
    pub station: Option<StationInfo>,
}

impl RegionProfile {
    /// Sensor identifier, derived from the region name.
    pub fn sensor_id(&self) -> String {
        format!("WQ_{}_01", self.name.to_uppercase())
    }
}

/// Ordered, immutable set of monitored regions.
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    regions: Vec<RegionProfile>,
}

impl RegionCatalog {
    /// Builds a catalog, rejecting duplicate names and out-of-range values.
    pub fn new(regions: Vec<RegionProfile>) -> Result<Self, String> {
        if regions.is_empty() {
            return Err("region catalog is empty".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for region in &regions {
            if region.name.trim().is_empty() {
                return Err("region name must not be empty".to_string());
            }
            if !seen.insert(region.name.as_str()) {
                return Err(format!("duplicate region '{}'", region.name));
            }
            if !(0.0..=1.0).contains(&region.pollution_factor) {
                return Err(format!(
                    "pollution factor for '{}' must be within [0, 1], got {}",
                    region.name, region.pollution_factor
                ));
            }
            if !(-90.0..=90.0).contains(&region.latitude)
                || !(-180.0..=180.0).contains(&region.longitude)
            {
                return Err(format!("coordinates for '{}' are out of range", region.name));
            }
        }

        Ok(Self { regions })
    }

    /// The eight Northeast India regions monitored by default.
    ///
    /// Guwahati, Shillong and Dibrugarh have CPCB reference data and are
    /// blended; the rest are fully simulated.
    pub fn northeast_india() -> Self {
        use DataSourcePolicy::{Blended, Simulated};

        let regions = vec![
            region("Guwahati", 26.1445, 91.7362, 0.6, Blended, ("AS001", "Brahmaputra", "Assam")),
            region("Shillong", 25.5788, 91.8933, 0.3, Blended, ("ML001", "Umiam", "Meghalaya")),
            region("Aizawl", 23.7367, 92.7173, 0.2, Simulated, ("MZ001", "Tlawng", "Mizoram")),
            region("Agartala", 23.8315, 91.2868, 0.4, Simulated, ("TR001", "Gomti", "Tripura")),
            region("Imphal", 24.8170, 93.9368, 0.3, Simulated, ("MN001", "Imphal", "Manipur")),
            region("Kohima", 25.6751, 94.1086, 0.2, Simulated, ("NL001", "Doyang", "Nagaland")),
            region("Itanagar", 27.0844, 93.6053, 0.3, Simulated, ("AR001", "Dikrong", "Arunachal Pradesh")),
            region("Dibrugarh", 27.4728, 94.9120, 0.5, Blended, ("AS002", "Brahmaputra", "Assam")),
        ];

        Self { regions }
    }

    /// Looks up a region by name. Returns `None` if not found.
    pub fn find(&self, name: &str) -> Option<&RegionProfile> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Regions in catalog order. The worker processes them in this order.
    pub fn regions(&self) -> &[RegionProfile] {
        &self.regions
    }

    pub fn names(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn region(
    name: &str,
    latitude: f64,
    longitude: f64,
    pollution_factor: f64,
    data_source: DataSourcePolicy,
    (station_id, river, state): (&str, &str, &str),
) -> RegionProfile {
    RegionProfile {
        name: name.to_string(),
        latitude,
        longitude,
        pollution_factor,
        data_source,
        station: Some(StationInfo {
            station_id: station_id.to_string(),
            river: river.to_string(),
            state: state.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_passes_validation() {
        let builtin = RegionCatalog::northeast_india();
        let validated = RegionCatalog::new(builtin.regions().to_vec());
        assert!(validated.is_ok(), "built-in catalog should be valid: {:?}", validated.err());
        assert_eq!(builtin.len(), 8);
    }

    #[test]
    fn test_builtin_catalog_contains_expected_regions() {
        let catalog = RegionCatalog::northeast_india();
        for name in [
            "Guwahati", "Shillong", "Aizawl", "Agartala",
            "Imphal", "Kohima", "Itanagar", "Dibrugarh",
        ] {
            assert!(catalog.contains(name), "catalog missing '{}'", name);
        }
    }

    #[test]
    fn test_blended_regions() {
        let catalog = RegionCatalog::northeast_india();
        let blended: Vec<_> = catalog
            .regions()
            .iter()
            .filter(|r| r.data_source == DataSourcePolicy::Blended)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(blended, vec!["Guwahati", "Shillong", "Dibrugarh"]);
    }

    #[test]
    fn test_sensor_id_is_derived_from_name() {
        let catalog = RegionCatalog::northeast_india();
        let guwahati = catalog.find("Guwahati").expect("Guwahati should be in catalog");
        assert_eq!(guwahati.sensor_id(), "WQ_GUWAHATI_01");
    }

    #[test]
    fn test_find_returns_none_for_unknown_region() {
        assert!(RegionCatalog::northeast_india().find("Atlantis").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let catalog = RegionCatalog::northeast_india();
        let mut regions = catalog.regions().to_vec();
        regions.push(regions[0].clone());
        let err = RegionCatalog::new(regions).unwrap_err();
        assert!(err.contains("duplicate"), "unexpected error: {}", err);
    }

    #[test]
    fn test_pollution_factor_must_be_unit_interval() {
        let mut profile = RegionCatalog::northeast_india().regions()[0].clone();
        profile.pollution_factor = 1.5;
        assert!(RegionCatalog::new(vec![profile]).is_err());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(RegionCatalog::new(Vec::new()).is_err());
    }
}
