//! Monitored transactions
//!
//! Wraps `sqlx::Transaction` to log connection acquisition wait and hold
//! time. A transaction dropped without commit rolls back (sqlx semantics)
//! and is logged, which is how a failed merge shows up.

use crate::Result;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;
use tracing::{debug, trace, warn};

const SLOW_ACQUIRE_MS: u128 = 1000;
const LONG_HOLD_MS: u128 = 2000;

/// Transaction plus the timing needed to report on its release
pub struct MonitoredTransaction<'c> {
    tx: Transaction<'c, Sqlite>,
    guard: ReleaseGuard,
}

/// Logs an abandoned transaction unless it was committed
struct ReleaseGuard {
    caller: &'static str,
    acquired_at: Instant,
    released: bool,
}

impl ReleaseGuard {
    fn release(&mut self) {
        self.released = true;
        let held_ms = self.acquired_at.elapsed().as_millis();
        if held_ms > LONG_HOLD_MS {
            warn!(caller = self.caller, held_ms, "Long transaction held its connection");
        } else {
            debug!(caller = self.caller, held_ms, "Committed, connection released");
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if !self.released {
            debug!(
                caller = self.caller,
                held_ms = self.acquired_at.elapsed().as_millis(),
                "Transaction dropped without commit, rolling back"
            );
        }
    }
}

impl<'c> MonitoredTransaction<'c> {
    /// Connection to run statements on
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<()> {
        let Self { tx, mut guard } = self;
        tx.commit().await?;
        guard.release();
        Ok(())
    }
}

/// Begin a transaction on `pool`, logging slow connection acquisition
///
/// ```ignore
/// let mut tx = begin_monitored(&pool, "merge::meeting").await?;
/// sqlx::query("...").execute(tx.conn()).await?;
/// tx.commit().await?;
/// ```
pub async fn begin_monitored<'c>(pool: &'c SqlitePool, caller: &'static str) -> Result<MonitoredTransaction<'c>> {
    let requested = Instant::now();
    let tx = pool.begin().await?;

    let wait_ms = requested.elapsed().as_millis();
    if wait_ms > SLOW_ACQUIRE_MS {
        warn!(caller, wait_ms, "Slow connection acquisition, pool may be saturated");
    } else {
        trace!(caller, wait_ms, "Connection acquired");
    }

    Ok(MonitoredTransaction {
        tx,
        guard: ReleaseGuard {
            caller,
            acquired_at: Instant::now(),
            released: false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::connect;

    async fn scratch_pool() -> sqlx::SqlitePool {
        let pool = connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE scratch (v INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn count(pool: &sqlx::SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM scratch")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let pool = scratch_pool().await;

        let mut tx = begin_monitored(&pool, "test").await.unwrap();
        sqlx::query("INSERT INTO scratch (v) VALUES (1)")
            .execute(tx.conn())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let pool = scratch_pool().await;

        {
            let mut tx = begin_monitored(&pool, "test").await.unwrap();
            sqlx::query("INSERT INTO scratch (v) VALUES (1)")
                .execute(tx.conn())
                .await
                .unwrap();
        }

        assert_eq!(count(&pool).await, 0);
    }
}
