/// Background transmission worker.
///
/// Each cycle:
/// 1. Refreshes reference data if the cache is stale
/// 2. Regenerates every region's reading (catalog order) and stores it
/// 3. Publishes the reading downstream and counts the outcome
/// 4. Publishes an alert for every alerting reading
///
/// then sleeps for the configured send interval. A failed or panicking
/// cycle is counted as an error and followed by a short backoff; the loop
/// only ends through `stop()`.
///
/// ## Lifecycle
///
/// `start()` and `stop()` are idempotent and serialized on the handle
/// mutex, so at most one loop thread exists. `stop()` wakes the loop out of
/// its sleep but lets an in-flight cycle finish, then joins the thread.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::alert::AlertPayload;
use crate::config::{API_VERSION, SettingsUpdate, TransmissionSettings};
use crate::error::MonitorError;
use crate::logging::log_publish_failure;
use crate::model::{DataSourcePolicy, QualityLevel};
use crate::monitor::{lock, read, write};
use crate::publish::{PublishReceipt, Publisher, ReadingPayload};
use crate::service::MonitorContext;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Worker configuration. The send interval lives in `TransmissionSettings`
/// because it can change while running.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause after a failed cycle (default: 10 seconds)
    pub error_backoff: Duration,

    /// Transmission log entries retained (default: 100)
    pub log_capacity: usize,

    /// Log entries reported by `stats()` (default: 10)
    pub recent_log_count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            error_backoff: Duration::from_secs(10),
            log_capacity: 100,
            recent_log_count: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Transmission log
// ---------------------------------------------------------------------------

/// Result of publishing one reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmissionOutcome {
    Success,
    /// No backend configured; the reading was only logged.
    SuccessSimulated,
    /// Failed with the given code (HTTP status, `timeout`, ...).
    Error(String),
}

impl TransmissionOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, TransmissionOutcome::Error(_))
    }
}

impl fmt::Display for TransmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmissionOutcome::Success => write!(f, "success"),
            TransmissionOutcome::SuccessSimulated => write!(f, "success-simulated"),
            TransmissionOutcome::Error(code) => write!(f, "error-{}", code),
        }
    }
}

impl Serialize for TransmissionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransmissionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub region: String,
    pub status: QualityLevel,
    pub alert: bool,
    pub outcome: TransmissionOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransmissionStats {
    pub running: bool,
    pub success_count: u64,
    pub error_count: u64,
    pub total_transmissions: u64,
    /// Most recent entries, oldest first.
    pub recent_logs: Vec<TransmissionLogEntry>,
}

/// Counts for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub delivered: usize,
    pub failed: usize,
    pub alerts: usize,
}

/// Transmission settings plus the catalog view, as reported by `/api/config`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigView {
    pub main_backend_url: Option<String>,
    pub send_interval: u64,
    pub regions: Vec<String>,
    pub data_sources: BTreeMap<String, DataSourcePolicy>,
    pub api_version: &'static str,
}

// ---------------------------------------------------------------------------
// Worker state
// ---------------------------------------------------------------------------

/// State shared between the worker handle and its loop thread.
struct Shared {
    context: Arc<MonitorContext>,
    publisher: Box<dyn Publisher>,
    settings: Arc<RwLock<TransmissionSettings>>,
    config: WorkerConfig,
    running: AtomicBool,
    success_count: AtomicU64,
    error_count: AtomicU64,
    log: Mutex<VecDeque<TransmissionLogEntry>>,
    wake_lock: Mutex<()>,
    wake: Condvar,
}

impl Shared {
    fn run_loop(&self) {
        tracing::info!(regions = self.context.catalog().len(), "Transmission loop started");

        while self.running.load(Ordering::SeqCst) {
            match self.guarded_cycle() {
                Ok(summary) => {
                    tracing::debug!(
                        delivered = summary.delivered,
                        failed = summary.failed,
                        alerts = summary.alerts,
                        "Transmission cycle complete"
                    );
                    let finished = Instant::now();
                    self.sleep_until(|| finished + read(&self.settings).send_interval);
                }
                Err(e) => {
                    self.error_count.fetch_add(1, Ordering::SeqCst);
                    tracing::error!(error = %e, "Transmission cycle failed; backing off");
                    let backoff_end = Instant::now() + self.config.error_backoff;
                    self.sleep_until(|| backoff_end);
                }
            }
        }

        tracing::info!("Transmission loop stopped");
    }

    /// Runs one cycle, turning a panic into a cycle error.
    fn guarded_cycle(&self) -> Result<CycleSummary, MonitorError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle())).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            Err(MonitorError::Cycle(message))
        })
    }

    fn run_cycle(&self) -> Result<CycleSummary, MonitorError> {
        self.context.references().refresh_if_due();

        let mut summary = CycleSummary::default();
        for region in self.context.catalog().names() {
            let reading = self.context.regenerate(&region)?;

            let payload = ReadingPayload::from_reading(&reading);
            let outcome = match self.publisher.publish_reading(&payload) {
                Ok(PublishReceipt::Delivered) => TransmissionOutcome::Success,
                Ok(PublishReceipt::Simulated) => TransmissionOutcome::SuccessSimulated,
                Err(e) => {
                    log_publish_failure(&region, "reading", &e);
                    TransmissionOutcome::Error(e.code())
                }
            };

            if outcome.is_success() {
                self.success_count.fetch_add(1, Ordering::SeqCst);
                summary.delivered += 1;
            } else {
                self.error_count.fetch_add(1, Ordering::SeqCst);
                summary.failed += 1;
            }

            self.append_log(TransmissionLogEntry {
                timestamp: Utc::now(),
                region: region.clone(),
                status: reading.status.level,
                alert: reading.status.alert,
                outcome,
            });

            if let Some(alert) = AlertPayload::from_reading(&reading) {
                summary.alerts += 1;
                // Alert failures are logged only; counters track readings.
                if let Err(e) = self.publisher.publish_alert(&alert) {
                    log_publish_failure(&region, "alert", &e);
                }
            }
        }

        Ok(summary)
    }

    fn append_log(&self, entry: TransmissionLogEntry) {
        let mut log = lock(&self.log);
        log.push_back(entry);
        while log.len() > self.config.log_capacity {
            log.pop_front();
        }
    }

    /// Sleeps until `deadline()`, returning early once `running` is cleared.
    /// The deadline is recomputed after every wake, so a send interval
    /// changed mid-sleep applies to the sleep already in progress.
    fn sleep_until(&self, deadline: impl Fn() -> Instant) {
        let mut guard = lock(&self.wake_lock);
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            let deadline = deadline();
            if now >= deadline {
                break;
            }
            guard = match self.wake.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn wake(&self) {
        let _guard = lock(&self.wake_lock);
        self.wake.notify_all();
    }
}

// ---------------------------------------------------------------------------
// Worker handle
// ---------------------------------------------------------------------------

pub struct TransmissionWorker {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TransmissionWorker {
    /// Creates a stopped worker.
    pub fn new(
        context: Arc<MonitorContext>,
        publisher: Box<dyn Publisher>,
        settings: Arc<RwLock<TransmissionSettings>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                context,
                publisher,
                settings,
                config,
                running: AtomicBool::new(false),
                success_count: AtomicU64::new(0),
                error_count: AtomicU64::new(0),
                log: Mutex::new(VecDeque::new()),
                wake_lock: Mutex::new(()),
                wake: Condvar::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Starts the loop thread. Returns false if it was already running or
    /// the thread could not be spawned.
    pub fn start(&self) -> bool {
        let mut handle = lock(&self.handle);
        if handle.is_some() {
            return false;
        }

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("transmission".to_string())
            .spawn(move || shared.run_loop());

        match spawned {
            Ok(thread) => {
                *handle = Some(thread);
                tracing::info!("Data transmission started");
                true
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                tracing::error!(error = %e, "Failed to spawn transmission thread");
                false
            }
        }
    }

    /// Stops the loop after its in-flight cycle and joins the thread.
    /// Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let mut handle = lock(&self.handle);
        let Some(thread) = handle.take() else {
            return false;
        };

        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.wake();
        if thread.join().is_err() {
            tracing::error!("Transmission thread panicked");
        }
        tracing::info!("Data transmission stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Runs one cycle on the calling thread.
    pub fn run_cycle(&self) -> Result<CycleSummary, MonitorError> {
        self.shared.run_cycle()
    }

    pub fn stats(&self) -> TransmissionStats {
        let success_count = self.shared.success_count.load(Ordering::SeqCst);
        let error_count = self.shared.error_count.load(Ordering::SeqCst);

        let log = lock(&self.shared.log);
        let skip = log.len().saturating_sub(self.shared.config.recent_log_count);
        let recent_logs = log.iter().skip(skip).cloned().collect();

        TransmissionStats {
            running: self.is_running(),
            success_count,
            error_count,
            total_transmissions: success_count + error_count,
            recent_logs,
        }
    }

    /// Number of log entries currently retained.
    pub fn retained_log_len(&self) -> usize {
        lock(&self.shared.log).len()
    }

    pub fn settings(&self) -> TransmissionSettings {
        read(&self.shared.settings).clone()
    }

    pub fn config(&self) -> ConfigView {
        let settings = self.settings();
        let catalog = self.shared.context.catalog();
        ConfigView {
            main_backend_url: settings.backend_url,
            send_interval: settings.send_interval.as_secs(),
            regions: catalog.names(),
            data_sources: catalog
                .regions()
                .iter()
                .map(|r| (r.name.clone(), r.data_source))
                .collect(),
            api_version: API_VERSION,
        }
    }

    /// Applies a live settings change; returns the updated field names.
    pub fn update_config(&self, update: &SettingsUpdate) -> Vec<&'static str> {
        let updated = write(&self.shared.settings).apply(update);
        if !updated.is_empty() {
            tracing::info!(fields = ?updated, "Transmission settings updated");
            // Re-evaluate the current sleep against the new interval.
            self.shared.wake();
        }
        updated
    }
}

impl Drop for TransmissionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
