/// Shared in-memory state: cached reference samples and latest readings.
///
/// ## Concurrency
///
/// Both stores are read by query handlers and written by the transmission
/// worker at the same time. Each store guards its maps with a single
/// `RwLock`:
/// - readers take a shared lock and clone out what they need (snapshots,
///   never live views)
/// - writers replace whole entries under the exclusive lock, so a reader
///   sees either the previous complete value or the new complete value
/// - no lock is held across I/O; the reference fetch happens before the
///   write lock is taken
///
/// A panic while holding a lock cannot leave a half-written entry (entries
/// are swapped, not edited), so poisoned locks are recovered rather than
/// propagated.

mod readings;
mod reference;

pub use readings::ReadingStore;
pub use reference::{DEFAULT_REFRESH_INTERVAL, ReferenceStore};

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
