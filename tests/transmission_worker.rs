/// Integration tests for the background transmission worker
///
/// These tests run the real loop thread against an in-memory publisher
/// with millisecond send intervals:
/// 1. start / stop / start leaves exactly one loop running
/// 2. Counters only ever advance by whole cycles
/// 3. Log retention is bounded
/// 4. Publish failures are counted, never fatal
/// 5. A panicking cycle is counted once, backed off, and the loop goes on
///
/// Run with: cargo test --test transmission_worker

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use wqmon_service::alert::AlertPayload;
use wqmon_service::config::TransmissionSettings;
use wqmon_service::daemon::{TransmissionOutcome, TransmissionWorker, WorkerConfig};
use wqmon_service::error::PublishError;
use wqmon_service::ingest::fixtures::FixtureSource;
use wqmon_service::monitor::DEFAULT_REFRESH_INTERVAL;
use wqmon_service::publish::{PublishReceipt, Publisher, ReadingPayload};
use wqmon_service::regions::RegionCatalog;
use wqmon_service::service::MonitorContext;
use wqmon_service::synthesis::FixedVariation;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// In-memory publisher; shares its counters with the test.
#[derive(Clone, Default)]
struct MemoryPublisher {
    readings: Arc<AtomicUsize>,
    fail: bool,
}

impl Publisher for MemoryPublisher {
    fn publish_reading(&self, _: &ReadingPayload) -> Result<PublishReceipt, PublishError> {
        self.readings.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(PublishError::Timeout)
        } else {
            Ok(PublishReceipt::Delivered)
        }
    }

    fn publish_alert(&self, _: &AlertPayload) -> Result<PublishReceipt, PublishError> {
        Ok(PublishReceipt::Delivered)
    }
}

/// Publisher that panics on the `panic_at`-th reading and succeeds otherwise.
struct PanicOncePublisher {
    readings: Arc<AtomicUsize>,
    panic_at: usize,
}

impl Publisher for PanicOncePublisher {
    fn publish_reading(&self, _: &ReadingPayload) -> Result<PublishReceipt, PublishError> {
        let n = self.readings.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.panic_at {
            panic!("publisher blew up on reading {}", n);
        }
        Ok(PublishReceipt::Delivered)
    }

    fn publish_alert(&self, _: &AlertPayload) -> Result<PublishReceipt, PublishError> {
        Ok(PublishReceipt::Delivered)
    }
}

fn worker_with(publisher: MemoryPublisher, interval: Duration) -> TransmissionWorker {
    worker_with_config(Box::new(publisher), interval, WorkerConfig::default())
}

fn worker_with_config(
    publisher: Box<dyn Publisher>,
    interval: Duration,
    config: WorkerConfig,
) -> TransmissionWorker {
    let context = Arc::new(MonitorContext::with_variation(
        RegionCatalog::northeast_india(),
        Box::new(FixtureSource),
        DEFAULT_REFRESH_INTERVAL,
        Box::new(FixedVariation::midpoint()),
    ));
    let settings = Arc::new(RwLock::new(TransmissionSettings {
        backend_url: None,
        send_interval: interval,
    }));
    TransmissionWorker::new(context, publisher, settings, config)
}

fn wait_for(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ---------------------------------------------------------------------------
// 1. Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_start_stop_start_runs_single_loop() {
    let publisher = MemoryPublisher::default();
    let published = Arc::clone(&publisher.readings);
    let worker = worker_with(publisher, Duration::from_millis(10));

    assert!(worker.start());
    assert!(wait_for(|| worker.stats().success_count >= 8, Duration::from_secs(5)));
    assert!(worker.stop());

    assert!(worker.start());
    assert!(!worker.start(), "second start must not spawn another loop");
    assert!(worker.stats().running);

    let before = worker.stats().success_count;
    assert!(wait_for(|| worker.stats().success_count > before, Duration::from_secs(5)));
    assert!(worker.stop());

    let stats = worker.stats();
    assert!(!stats.running);
    assert_eq!(stats.success_count % 8, 0, "counters advance by whole cycles");
    assert_eq!(stats.success_count as usize, published.load(Ordering::SeqCst));
}

#[test]
fn test_stop_waits_for_in_flight_cycle_and_halts_loop() {
    let publisher = MemoryPublisher::default();
    let published = Arc::clone(&publisher.readings);
    let worker = worker_with(publisher, Duration::from_millis(1));

    worker.start();
    assert!(wait_for(|| published.load(Ordering::SeqCst) > 0, Duration::from_secs(5)));
    worker.stop();

    let after_stop = published.load(Ordering::SeqCst);
    assert_eq!(after_stop % 8, 0);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(published.load(Ordering::SeqCst), after_stop, "no cycles after stop");
}

// ---------------------------------------------------------------------------
// 2-3. Log retention
// ---------------------------------------------------------------------------

#[test]
fn test_log_retention_caps_at_one_hundred() {
    let worker = worker_with(MemoryPublisher::default(), Duration::from_secs(30));
    for _ in 0..15 {
        worker.run_cycle().unwrap();
    }

    assert_eq!(worker.retained_log_len(), 100);
    let stats = worker.stats();
    assert_eq!(stats.recent_logs.len(), 10);
    assert_eq!(stats.total_transmissions, 120);

    // The last ten entries are the last cycle's eight regions plus the
    // final two of the cycle before it.
    let regions: Vec<_> = stats.recent_logs.iter().map(|e| e.region.as_str()).collect();
    assert_eq!(&regions[2..], RegionCatalog::northeast_india().names().as_slice());
}

// ---------------------------------------------------------------------------
// 4. Failures
// ---------------------------------------------------------------------------

#[test]
fn test_publish_failures_keep_loop_alive() {
    let worker = worker_with(MemoryPublisher { fail: true, ..Default::default() }, Duration::from_millis(5));

    worker.start();
    assert!(wait_for(|| worker.stats().error_count >= 16, Duration::from_secs(5)));
    assert!(worker.is_running());
    worker.stop();

    let stats = worker.stats();
    assert_eq!(stats.success_count, 0);
    assert!(stats
        .recent_logs
        .iter()
        .all(|e| e.outcome == TransmissionOutcome::Error("timeout".to_string())));
}

// ---------------------------------------------------------------------------
// 5. Unexpected cycle failures
// ---------------------------------------------------------------------------

#[test]
fn test_panicking_cycle_is_counted_and_loop_continues() {
    let readings = Arc::new(AtomicUsize::new(0));
    let publisher = PanicOncePublisher { readings: Arc::clone(&readings), panic_at: 3 };
    let config = WorkerConfig { error_backoff: Duration::from_millis(20), ..WorkerConfig::default() };
    let worker = worker_with_config(Box::new(publisher), Duration::from_millis(5), config);

    worker.start();
    // Two readings land before the panic; later cycles add whole multiples of 8.
    assert!(wait_for(|| worker.stats().success_count >= 2 + 16, Duration::from_secs(5)));
    assert!(worker.is_running(), "loop survives the panic");
    worker.stop();

    let stats = worker.stats();
    assert!(!stats.running);
    assert_eq!(stats.error_count, 1, "the panicked cycle counts as one error");
    assert_eq!(stats.success_count % 8, 2);
    assert_eq!(stats.success_count as usize + 1, readings.load(Ordering::SeqCst));
}
