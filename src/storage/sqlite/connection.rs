//! Shared connection handling for the `SQLite` store.

use crate::{Error, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (a previous critical section panicked) the inner
/// value is recovered and a warning logged, so one failed operation does not
/// take every later one down with it.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("store mutex was poisoned, recovering");
            metrics::counter!("postport_store_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection.
///
/// - **WAL mode** and **NORMAL synchronous** for file databases
/// - **`busy_timeout`** of 5 seconds
/// - **`foreign_keys`** on, so a post can never reference a missing author
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if foreign key enforcement cannot be enabled.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode returns a row ("wal"), so its result is ignored
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| Error::OperationFailed {
            operation: "configure_sqlite".to_string(),
            cause: e.to_string(),
        })?;

    Ok(())
}
