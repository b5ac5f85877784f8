/// Cached reference samples with a staleness policy.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::ingest::ReferenceSource;
use crate::model::ReferenceSample;
use crate::monitor::{read, write};

/// Refresh reference data at most once an hour by default.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Default)]
struct CacheState {
    samples: HashMap<String, ReferenceSample>,
    last_refresh: Option<DateTime<Utc>>,
}

/// Reference samples per region, replaced wholesale on each successful
/// refresh.
pub struct ReferenceStore {
    source: Box<dyn ReferenceSource>,
    refresh_interval: Duration,
    state: RwLock<CacheState>,
}

impl ReferenceStore {
    /// Creates an empty store. Nothing is fetched until `refresh`.
    pub fn new(source: Box<dyn ReferenceSource>, refresh_interval: Duration) -> Self {
        Self {
            source,
            refresh_interval,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Cached sample for `region`, if any.
    pub fn get(&self, region: &str) -> Option<ReferenceSample> {
        read(&self.state).samples.get(region).cloned()
    }

    /// Fetches from the source and swaps the whole cache in.
    ///
    /// On failure the previous samples stay in place and `false` is returned.
    pub fn refresh(&self) -> bool {
        match self.source.fetch() {
            Ok(samples) => {
                let regions = samples.len();
                let mut state = write(&self.state);
                state.samples = samples;
                state.last_refresh = Some(Utc::now());
                drop(state);
                tracing::info!(source = self.source.name(), regions, "Reference data refreshed");
                true
            }
            Err(e) => {
                tracing::warn!(source = self.source.name(), error = %e, "Reference refresh failed; keeping cached samples");
                false
            }
        }
    }

    /// True if never refreshed, or the last successful refresh is older
    /// than the refresh interval.
    pub fn should_refresh(&self) -> bool {
        self.should_refresh_at(Utc::now())
    }

    pub fn should_refresh_at(&self, now: DateTime<Utc>) -> bool {
        match read(&self.state).last_refresh {
            None => true,
            Some(last) => {
                let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                elapsed > self.refresh_interval
            }
        }
    }

    /// Refreshes only if `should_refresh` says so. Returns whether a
    /// refresh happened and succeeded.
    pub fn refresh_if_due(&self) -> bool {
        self.should_refresh() && self.refresh()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        read(&self.state).last_refresh
    }

    /// Regions with a cached sample.
    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<_> = read(&self.state).samples.keys().cloned().collect();
        regions.sort();
        regions
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReferenceError;
    use crate::ingest::fixtures::FixtureSource;
    use crate::model::Parameter;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Source whose success can be toggled; returns a sample whose pH
    /// encodes how many successful fetches have happened.
    struct ToggleSource {
        fail: Arc<AtomicBool>,
        fetches: AtomicUsize,
    }

    impl ReferenceSource for ToggleSource {
        fn fetch(&self) -> Result<HashMap<String, ReferenceSample>, ReferenceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ReferenceError::HttpStatus(503));
            }
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            let sample: ReferenceSample = [(Parameter::Ph, 7.0 + n as f64 / 10.0)].into_iter().collect();
            Ok([("Guwahati".to_string(), sample)].into_iter().collect())
        }

        fn name(&self) -> &str {
            "toggle"
        }
    }

    fn toggle_store() -> (ReferenceStore, Arc<AtomicBool>) {
        let fail = Arc::new(AtomicBool::new(false));
        let source = ToggleSource { fail: fail.clone(), fetches: AtomicUsize::new(0) };
        (ReferenceStore::new(Box::new(source), DEFAULT_REFRESH_INTERVAL), fail)
    }

    #[test]
    fn test_new_store_is_empty_and_due() {
        let store = ReferenceStore::new(Box::new(FixtureSource), DEFAULT_REFRESH_INTERVAL);
        assert!(store.get("Guwahati").is_none());
        assert!(store.should_refresh());
        assert!(store.last_refresh().is_none());
    }

    #[test]
    fn test_refresh_populates_cache() {
        let store = ReferenceStore::new(Box::new(FixtureSource), DEFAULT_REFRESH_INTERVAL);
        assert!(store.refresh());
        assert_eq!(store.get("Guwahati").unwrap()[&Parameter::Ph], 7.1);
        assert!(store.get("Aizawl").is_none(), "absent regions stay absent");
        assert_eq!(store.regions(), vec!["Dibrugarh", "Guwahati", "Shillong"]);
    }

    #[test]
    fn test_staleness_window() {
        let store = ReferenceStore::new(Box::new(FixtureSource), DEFAULT_REFRESH_INTERVAL);
        store.refresh();
        let last = store.last_refresh().unwrap();

        assert!(!store.should_refresh());
        assert!(!store.should_refresh_at(last + chrono::Duration::minutes(59)));
        assert!(!store.should_refresh_at(last + chrono::Duration::hours(1)));
        assert!(store.should_refresh_at(last + chrono::Duration::minutes(61)));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_samples() {
        let (store, fail) = toggle_store();
        assert!(store.refresh());
        let before = store.get("Guwahati").unwrap();
        let last = store.last_refresh();

        fail.store(true, Ordering::SeqCst);
        assert!(!store.refresh());
        assert_eq!(store.get("Guwahati").unwrap(), before);
        assert_eq!(store.last_refresh(), last);
    }

    #[test]
    fn test_refresh_replaces_whole_sample_set() {
        let (store, _) = toggle_store();
        store.refresh();
        store.refresh();
        assert_eq!(store.get("Guwahati").unwrap()[&Parameter::Ph], 7.2);
        assert_eq!(store.regions(), vec!["Guwahati"]);
    }

    #[test]
    fn test_refresh_if_due_skips_fresh_cache() {
        let (store, _) = toggle_store();
        assert!(store.refresh_if_due());
        assert!(!store.refresh_if_due(), "second call within the interval should not refresh");
        assert_eq!(store.get("Guwahati").unwrap()[&Parameter::Ph], 7.1);
    }
}
