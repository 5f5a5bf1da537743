//! Bulk loading of email metadata from CSV into PostgreSQL.
//!
//! The pipeline is one sequential pass:
//!
//! 1. **Source** (`source`) - Read the whole CSV export into memory
//! 2. **Categories** (`categories`) - Insert-if-absent the taxonomy, map names to ids
//! 3. **Assembly** (`record`, `date`) - Normalize dates, truncate recipients and
//!    sample a category for every row, producing immutable `EmailRecord`s
//! 4. **Batches** (`batch`) - Multi-row inserts using PostgreSQL UNNEST
//! 5. **Coordination** (`coordinator`) - Runs 2-4 inside a `BulkLoadSession`
//!    (`session`), committing once or rolling everything back
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use mail_loader::load::{EmailLoader, LoadOptions, source};
//! use mail_loader::taxonomy::Taxonomy;
//!
//! let taxonomy = Taxonomy::email_default();
//! let rows = source::read_csv_path("updated_data.csv".as_ref())?;
//! let loader = EmailLoader::new(&taxonomy, LoadOptions::default());
//! let stats = loader.load(&mut conn, &rows, &mut rand::thread_rng()).await?;
//! println!("{}", stats);
//! ```

pub mod batch;
pub mod categories;
pub mod coordinator;
pub mod date;
pub mod record;
pub mod session;
pub mod source;
pub mod stats;

pub use categories::{CategoryMap, prepare_categories};
pub use coordinator::{EmailLoader, LoadOptions};
pub use record::{EmailRecord, RecordAssembler};
pub use session::BulkLoadSession;
pub use source::SourceRow;
pub use stats::LoadStats;
