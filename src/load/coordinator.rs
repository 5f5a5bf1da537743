//! Load run coordination.
//!
//! `EmailLoader` runs the whole pipeline inside one `BulkLoadSession`:
//! 1. Prepare categories
//! 2. Assemble records (date normalization, recipient truncation, sampling)
//! 3. Insert records in batches
//! 4. Commit, or roll back everything on the first error

use std::time::Instant;

use rand::Rng;
use sqlx::PgConnection;

use crate::config::{BulkLoadSettings, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RECIPIENT_LEN, LoaderConfig};
use crate::error::{LoadError, LoadResult};
use crate::load::batch::insert_batches;
use crate::load::categories::{CategoryMap, prepare_categories};
use crate::load::record::{EmailRecord, RecordAssembler};
use crate::load::session::{BulkLoadSession, SessionSnapshot};
use crate::load::source::SourceRow;
use crate::load::stats::LoadStats;
use crate::taxonomy::Taxonomy;

/// Width of the `Emails.recipientEmail` column.
pub const RECIPIENT_COLUMN_LEN: usize = 100;

/// Tunables for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub max_recipient_len: usize,
    pub session: BulkLoadSettings,
}

impl LoadOptions {
    pub fn from_config(config: &LoaderConfig, session: BulkLoadSettings) -> Self {
        Self {
            batch_size: config.batch_size,
            max_recipient_len: config.max_recipient_len,
            session,
        }
    }

    /// Reject options the schema cannot accept.
    pub fn validate(&self) -> LoadResult<()> {
        if self.batch_size == 0 {
            return Err(LoadError::Config("batch size must be at least 1".into()));
        }
        if self.max_recipient_len == 0 || self.max_recipient_len > RECIPIENT_COLUMN_LEN {
            return Err(LoadError::Config(format!(
                "recipient limit must be between 1 and {}, got {}",
                RECIPIENT_COLUMN_LEN, self.max_recipient_len
            )));
        }
        Ok(())
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_recipient_len: DEFAULT_MAX_RECIPIENT_LEN,
            session: BulkLoadSettings::default(),
        }
    }
}

/// Loads source rows into `Categories` and `Emails`.
pub struct EmailLoader<'t> {
    taxonomy: &'t Taxonomy,
    options: LoadOptions,
}

impl<'t> EmailLoader<'t> {
    pub fn new(taxonomy: &'t Taxonomy, options: LoadOptions) -> Self {
        Self { taxonomy, options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load all rows as one transaction.
    ///
    /// On error nothing from this run is committed, categories included, and
    /// the error is returned after the rollback.
    pub async fn load<R: Rng + ?Sized>(
        &self,
        conn: &mut PgConnection,
        rows: &[SourceRow],
        rng: &mut R,
    ) -> LoadResult<LoadStats> {
        self.options.validate()?;
        let started = Instant::now();
        log::info!(
            "loading {} rows (batch size {}, recipient limit {})",
            rows.len(),
            self.options.batch_size,
            self.options.max_recipient_len
        );

        let mut session = BulkLoadSession::begin(&mut *conn, self.options.session).await?;

        let outcome = self.load_in_session(session.connection(), rows, rng).await;
        match outcome {
            Ok(stats) => {
                session.commit().await?;
                log::info!(
                    "committed {} emails in {} batches ({:.2}s)",
                    stats.emails_inserted,
                    stats.batches(),
                    started.elapsed().as_secs_f64()
                );
                if log::log_enabled!(log::Level::Debug) {
                    match SessionSnapshot::capture(conn).await {
                        Ok(snapshot) => log::debug!("session settings after commit: {}", snapshot),
                        Err(err) => log::warn!("could not read session settings: {}", err),
                    }
                }
                Ok(stats)
            }
            Err(err) => {
                log::error!("load failed, rolling back: {}", err);
                if let Err(rollback_err) = session.rollback().await {
                    log::error!("rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn load_in_session<R: Rng + ?Sized>(
        &self,
        conn: &mut PgConnection,
        rows: &[SourceRow],
        rng: &mut R,
    ) -> LoadResult<LoadStats> {
        let categories = prepare_categories(conn, self.taxonomy).await?;

        let (records, mut stats) = self.assemble(&categories, rows, rng)?;

        stats.batch_sizes = insert_batches(conn, &records, self.options.batch_size).await?;
        stats.emails_inserted = stats.batch_sizes.iter().sum();
        Ok(stats)
    }

    /// Assemble records against provisional category ids without touching
    /// the database.
    pub fn dry_run<R: Rng + ?Sized>(&self, rows: &[SourceRow], rng: &mut R) -> LoadResult<LoadStats> {
        self.options.validate()?;
        let categories = CategoryMap::provisional(self.taxonomy);
        let (_, stats) = self.assemble(&categories, rows, rng)?;
        log::info!("dry run assembled {} records", stats.rows_read);
        Ok(stats)
    }

    fn assemble<R: Rng + ?Sized>(
        &self,
        categories: &CategoryMap,
        rows: &[SourceRow],
        rng: &mut R,
    ) -> LoadResult<(Vec<EmailRecord>, LoadStats)> {
        RecordAssembler::new(self.taxonomy, categories, self.options.max_recipient_len)?
            .assemble(rows, rng)
    }
}
