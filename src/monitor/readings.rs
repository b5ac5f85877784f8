/// Latest reading and sensor status per region.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::model::{Reading, SensorStatus};
use crate::monitor::{read, write};

/// Latest reading per region plus each region's sensor status.
///
/// Readings are stored behind `Arc` and replaced, never mutated, so a
/// reader holding one keeps a complete, consistent value.
#[derive(Debug, Default)]
pub struct ReadingStore {
    readings: RwLock<HashMap<String, Arc<Reading>>>,
    statuses: RwLock<HashMap<String, SensorStatus>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the latest reading for `region`.
    pub fn put(&self, region: &str, reading: Reading) -> Arc<Reading> {
        let reading = Arc::new(reading);
        write(&self.readings).insert(region.to_string(), Arc::clone(&reading));
        reading
    }

    pub fn get(&self, region: &str) -> Option<Arc<Reading>> {
        read(&self.readings).get(region).cloned()
    }

    /// Snapshot of every region's latest reading.
    pub fn get_all(&self) -> BTreeMap<String, Arc<Reading>> {
        read(&self.readings)
            .iter()
            .map(|(region, reading)| (region.clone(), Arc::clone(reading)))
            .collect()
    }

    pub fn set_status(&self, region: &str, status: SensorStatus) {
        write(&self.statuses).insert(region.to_string(), status);
    }

    /// Sensor status for `region`. Regions never marked are offline.
    pub fn get_status(&self, region: &str) -> SensorStatus {
        read(&self.statuses)
            .get(region)
            .copied()
            .unwrap_or(SensorStatus::Offline)
    }

    /// Number of sensors with the given status.
    pub fn count_status(&self, status: SensorStatus) -> usize {
        read(&self.statuses).values().filter(|s| **s == status).count()
    }

    pub fn len(&self) -> usize {
        read(&self.readings).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.readings).is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
