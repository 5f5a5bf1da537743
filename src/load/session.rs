//! Relaxed-consistency scope for bulk loads.
//!
//! A `BulkLoadSession` owns the run transaction. On entry it relaxes checks
//! that slow bulk inserts down:
//!
//! - autocommit is off for the whole run (everything is one transaction)
//! - deferrable constraints, such as the `Emails` foreign key, are checked at
//!   commit instead of per row
//! - `synchronous_commit = off`, when enabled
//! - `session_replication_role = replica`, when enabled, which skips
//!   foreign-key triggers
//!
//! Every setting is `SET LOCAL`, so PostgreSQL restores the defaults when the
//! transaction ends: on `commit`, on `rollback`, and when a session is dropped
//! without either (sqlx rolls the transaction back on drop).

use sqlx::{Connection, PgConnection, Postgres, Transaction};

use crate::config::BulkLoadSettings;

/// Transaction with bulk-load settings applied.
pub struct BulkLoadSession<'c> {
    tx: Transaction<'c, Postgres>,
}

impl<'c> BulkLoadSession<'c> {
    /// Begin the run transaction and relax checks for its duration.
    pub async fn begin(
        conn: &'c mut PgConnection,
        settings: BulkLoadSettings,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = conn.begin().await?;

        log::debug!("applying bulk load session settings: {:?}", settings);

        sqlx::query("SET CONSTRAINTS ALL DEFERRED")
            .execute(&mut *tx)
            .await?;

        if settings.async_commit {
            sqlx::query("SET LOCAL synchronous_commit = 'off'")
                .execute(&mut *tx)
                .await?;
        }

        if settings.disable_triggers {
            sqlx::query("SET LOCAL session_replication_role = 'replica'")
                .execute(&mut *tx)
                .await?;
        }

        Ok(Self { tx })
    }

    /// Connection running inside the session's transaction.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await?;
        log::debug!("bulk load committed, session settings restored");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await?;
        log::debug!("bulk load rolled back, session settings restored");
        Ok(())
    }
}

/// Current values of the settings a `BulkLoadSession` touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub synchronous_commit: String,
    pub session_replication_role: String,
}

impl SessionSnapshot {
    pub async fn capture(conn: &mut PgConnection) -> Result<Self, sqlx::Error> {
        let synchronous_commit: (String,) = sqlx::query_as("SHOW synchronous_commit")
            .fetch_one(&mut *conn)
            .await?;

        let session_replication_role: (String,) = sqlx::query_as("SHOW session_replication_role")
            .fetch_one(&mut *conn)
            .await?;

        Ok(Self {
            synchronous_commit: synchronous_commit.0,
            session_replication_role: session_replication_role.0,
        })
    }
}

impl std::fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "synchronous_commit={}, session_replication_role={}",
            self.synchronous_commit, self.session_replication_role
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_display() {
        let snapshot = SessionSnapshot {
            synchronous_commit: "on".to_string(),
            session_replication_role: "origin".to_string(),
        };
        assert_eq!(
            snapshot.to_string(),
            "synchronous_commit=on, session_replication_role=origin"
        );
    }
}
