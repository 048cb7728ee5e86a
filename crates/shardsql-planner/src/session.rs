//! Execution context: database-wide configuration and the
//! per-connection session.
//!
//! A `Session` is owned by one execution thread for the duration of a
//! query. Index conditions are immutable and may be shared read-only,
//! but every value snapshot consumes a session and inherits its
//! thread affinity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shardsql_error::{ShardError, ShardResult};
use shardsql_types::CompareMode;

/// Process-wide, read-mostly database state. The compare mode is
/// fixed when the database is created and never changes afterwards.
#[derive(Debug)]
pub struct Database {
    compare_mode: CompareMode,
}

impl Database {
    /// Create a database with the given compare mode.
    #[must_use]
    pub const fn new(compare_mode: CompareMode) -> Self {
        Self { compare_mode }
    }

    /// The value-ordering configuration for this database.
    #[must_use]
    pub const fn compare_mode(&self) -> &CompareMode {
        &self.compare_mode
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(CompareMode::default())
    }
}

/// Per-connection execution context.
///
/// Carries the owning database and a cancel flag. Expression and
/// subquery evaluation must call [`Session::check_cancelled`] before
/// doing work; the index-condition path itself holds no timers and
/// initiates no retries.
#[derive(Debug)]
pub struct Session {
    database: Arc<Database>,
    cancelled: AtomicBool,
}

impl Session {
    /// Open a session against a database.
    #[must_use]
    pub fn new(database: Arc<Database>) -> Self {
        Self {
            database,
            cancelled: AtomicBool::new(false),
        }
    }

    /// The owning database.
    #[must_use]
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Shorthand for the database compare mode.
    #[must_use]
    pub fn compare_mode(&self) -> &CompareMode {
        self.database.compare_mode()
    }

    /// Request cancellation of the running statement. Safe to call
    /// from another thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the cancel flag is set.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail with [`ShardError::QueryCancelled`] if the cancel flag is
    /// set.
    pub fn check_cancelled(&self) -> ShardResult<()> {
        if self.is_cancelled() {
            Err(ShardError::QueryCancelled)
        } else {
            Ok(())
        }
    }
}
