/// Monitoring context and query operations.
///
/// `MonitorContext` bundles the region catalog (via the synthesizer), the
/// reference cache and the reading store. One context is built at startup
/// and shared by `Arc` between the HTTP endpoint and the transmission
/// worker; every operation here is safe to call from any thread.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::alert::{AlertSummary, quality, sort_alerts};
use crate::config::API_VERSION;
use crate::error::MonitorError;
use crate::ingest::ReferenceSource;
use crate::model::{DataSourcePolicy, ParameterReading, QualityLevel, Reading, SensorStatus, Urgency};
use crate::monitor::{ReadingStore, ReferenceStore, lock};
use crate::parameters::spec_for;
use crate::regions::RegionCatalog;
use crate::synthesis::{ReadingSynthesizer, RngVariation, VariationSource};

/// Number of daily points returned by `historical`.
pub const HISTORY_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// Aggregate system status.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub sensors_active: usize,
    pub sensors_offline: usize,
    pub total_sensors: usize,
    /// Region count per data-source policy.
    pub regions_by_source: BTreeMap<DataSourcePolicy, usize>,
    /// Regions with reference data currently cached.
    pub reference_regions: Vec<String>,
    pub last_reference_refresh: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
    pub regions: Vec<String>,
    pub data_sources: BTreeMap<String, DataSourcePolicy>,
    pub api_version: &'static str,
}

/// Current alerts, most urgent first.
#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    pub alerts: Vec<AlertSummary>,
    pub count: usize,
    pub high_priority: usize,
    pub generated_at: DateTime<Utc>,
}

/// Which regions a simulation request regenerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationTarget {
    All,
    Region(String),
}

impl SimulationTarget {
    /// `"all"` selects every region; anything else names one region.
    pub fn parse(value: &str) -> Self {
        if value == "all" {
            SimulationTarget::All
        } else {
            SimulationTarget::Region(value.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

pub struct MonitorContext {
    synthesizer: ReadingSynthesizer,
    references: ReferenceStore,
    readings: ReadingStore,
    variation: Mutex<Box<dyn VariationSource + Send>>,
}

impl MonitorContext {
    /// Builds a context with OS-seeded variation and runs `initialize`.
    pub fn new(
        catalog: RegionCatalog,
        source: Box<dyn ReferenceSource>,
        refresh_interval: Duration,
    ) -> Self {
        let variation = RngVariation(StdRng::from_os_rng());
        Self::with_variation(catalog, source, refresh_interval, Box::new(variation))
    }

    /// Builds a context drawing variation from `variation`.
    pub fn with_variation(
        catalog: RegionCatalog,
        source: Box<dyn ReferenceSource>,
        refresh_interval: Duration,
        variation: Box<dyn VariationSource + Send>,
    ) -> Self {
        let context = Self {
            synthesizer: ReadingSynthesizer::new(catalog),
            references: ReferenceStore::new(source, refresh_interval),
            readings: ReadingStore::new(),
            variation: Mutex::new(variation),
        };
        context.initialize();
        context
    }

    /// Loads reference data, generates a first reading for every region
    /// and marks every sensor online.
    fn initialize(&self) {
        self.references.refresh();
        for profile in self.catalog().regions() {
            self.readings.set_status(&profile.name, SensorStatus::Online);
        }
        let generated = self.regenerate_all().len();
        tracing::info!(regions = generated, "Initial readings generated");
    }

    pub fn catalog(&self) -> &RegionCatalog {
        self.synthesizer.catalog()
    }

    pub fn references(&self) -> &ReferenceStore {
        &self.references
    }

    pub fn readings(&self) -> &ReadingStore {
        &self.readings
    }

    fn require_region(&self, region: &str) -> Result<(), MonitorError> {
        if self.catalog().contains(region) {
            Ok(())
        } else {
            Err(MonitorError::UnknownRegion(region.to_string()))
        }
    }

    fn synthesize_at(&self, region: &str, timestamp: DateTime<Utc>) -> Result<Reading, MonitorError> {
        let mut variation = lock(&self.variation);
        self.synthesizer
            .synthesize(region, &self.references, timestamp, &mut **variation)
    }

    /// Synthesizes a new reading for `region` and stores it.
    pub fn regenerate(&self, region: &str) -> Result<Arc<Reading>, MonitorError> {
        let reading = self.synthesize_at(region, Utc::now())?;
        Ok(self.readings.put(region, reading))
    }

    /// Regenerates every region in catalog order.
    pub fn regenerate_all(&self) -> Vec<Arc<Reading>> {
        self.catalog()
            .names()
            .iter()
            .filter_map(|region| self.regenerate(region).ok())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Query operations
    // -----------------------------------------------------------------------

    pub fn status(&self) -> SystemStatus {
        let catalog = self.catalog();

        let mut regions_by_source = BTreeMap::new();
        for profile in catalog.regions() {
            *regions_by_source.entry(profile.data_source).or_insert(0) += 1;
        }

        let sensors_active = catalog
            .regions()
            .iter()
            .filter(|r| self.readings.get_status(&r.name) == SensorStatus::Online)
            .count();

        SystemStatus {
            status: "online",
            sensors_active,
            sensors_offline: catalog.len() - sensors_active,
            total_sensors: catalog.len(),
            regions_by_source,
            reference_regions: self.references.regions(),
            last_reference_refresh: self.references.last_refresh(),
            last_update: Utc::now(),
            regions: catalog.names(),
            data_sources: catalog
                .regions()
                .iter()
                .map(|r| (r.name.clone(), r.data_source))
                .collect(),
            api_version: API_VERSION,
        }
    }

    /// Latest stored readings: one region, or all regions when `region` is
    /// `None`. Metadata is stripped unless `include_metadata` is set.
    pub fn latest(
        &self,
        region: Option<&str>,
        include_metadata: bool,
    ) -> Result<BTreeMap<String, Reading>, MonitorError> {
        let strip = |reading: &Reading| {
            if include_metadata {
                reading.clone()
            } else {
                reading.without_metadata()
            }
        };

        match region {
            Some(region) => {
                self.require_region(region)?;
                let reading = match self.readings.get(region) {
                    Some(reading) => reading,
                    None => self.regenerate(region)?,
                };
                Ok(BTreeMap::from([(region.to_string(), strip(&reading))]))
            }
            None => Ok(self
                .readings
                .get_all()
                .into_iter()
                .map(|(region, reading)| (region, strip(&reading)))
                .collect()),
        }
    }

    /// Refreshes reference data if due, then synthesizes and stores a new
    /// reading for `region`.
    pub fn fresh_reading(&self, region: &str) -> Result<Arc<Reading>, MonitorError> {
        self.require_region(region)?;
        self.references.refresh_if_due();
        self.regenerate(region)
    }

    /// Every region whose current reading is alerting, optionally only
    /// those at `severity`.
    pub fn alerts(&self, severity: Option<QualityLevel>) -> AlertReport {
        let mut alerts: Vec<AlertSummary> = self
            .readings
            .get_all()
            .values()
            .filter(|r| severity.is_none_or(|level| r.status.level == level))
            .filter_map(|r| AlertSummary::from_reading(r))
            .collect();
        sort_alerts(&mut alerts);

        let high_priority = alerts.iter().filter(|a| a.urgency == Urgency::High).count();
        AlertReport {
            count: alerts.len(),
            high_priority,
            alerts,
            generated_at: Utc::now(),
        }
    }

    /// Thirty synthetic daily readings for `region`, oldest first, ending
    /// one day before now. Nothing is stored.
    pub fn historical(&self, region: &str) -> Result<Vec<Reading>, MonitorError> {
        self.require_region(region)?;
        let now = Utc::now();

        (1..=HISTORY_DAYS)
            .rev()
            .map(|days_back| {
                let timestamp = now - ChronoDuration::days(days_back);
                let reading = self.synthesize_at(region, timestamp)?;
                Ok(apply_weekly_pattern(&reading, days_back))
            })
            .collect()
    }

    /// Forces a reference refresh. On success every region is regenerated.
    pub fn refresh_sources(&self) -> bool {
        if !self.references.refresh() {
            return false;
        }
        self.regenerate_all();
        true
    }

    /// Regenerates the target regions. With `force_alert`, each new reading
    /// carries a poor, alerting status with a simulated critical issue.
    pub fn simulate(
        &self,
        target: &SimulationTarget,
        force_alert: bool,
    ) -> Result<Vec<Arc<Reading>>, MonitorError> {
        let regions = match target {
            SimulationTarget::All => self.catalog().names(),
            SimulationTarget::Region(region) => {
                self.require_region(region)?;
                vec![region.clone()]
            }
        };

        regions
            .iter()
            .map(|region| {
                let reading = self.synthesize_at(region, Utc::now())?;
                let reading = if force_alert {
                    reading.with_status(quality::forced_alert_status())
                } else {
                    reading
                };
                Ok(self.readings.put(region, reading))
            })
            .collect()
    }
}

/// Scales every value by `1 + 0.1 * (1 + 0.3 * (days_back % 7) / 7)` to give
/// the history a weekly rhythm, keeping values in range, and re-scores.
fn apply_weekly_pattern(reading: &Reading, days_back: i64) -> Reading {
    let factor = 1.0 + 0.1 * (1.0 + 0.3 * (days_back % 7) as f64 / 7.0);

    let parameters = reading
        .parameters
        .iter()
        .map(|(parameter, r)| {
            let scaled = ParameterReading {
                value: spec_for(*parameter).normalize(r.value * factor),
                ..r.clone()
            };
            (*parameter, scaled)
        })
        .collect();

    let status = quality::assess(&parameters);
    Reading {
        parameters,
        ..reading.clone()
    }
    .with_status(status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
