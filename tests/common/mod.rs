#![allow(dead_code)]

use mail_loader::load::SourceRow;
use mail_loader::test_support::{TestDatabase, TestDatabaseError};

/// Provision a test database, or `None` when no database is configured.
pub async fn test_database(test_name: &str) -> Option<TestDatabase> {
    match TestDatabase::new_from_env().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!(
                "skipping {test_name}: set TEST_DATABASE_URL or LOADER_TEST_CONTAINERS=1"
            );
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

/// `count` well-formed rows whose `Size` equals their index.
pub fn sample_rows(count: usize) -> Vec<SourceRow> {
    (0..count)
        .map(|n| SourceRow {
            message_id: Some(format!("<{n}@example.com>")),
            date: Some("Mon 1 Jan 2020 10:00:00 +0000 (UTC)".to_string()),
            from: Some("sender@example.com".to_string()),
            subject: Some(format!("Message {n}")),
            recipient: Some("recipient@example.com".to_string()),
            size: Some(n.to_string()),
        })
        .collect()
}

pub async fn count_rows(pool: &sqlx::PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count query")
}
