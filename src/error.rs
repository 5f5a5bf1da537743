use thiserror::Error;

use crate::taxonomy::TaxonomyError;

/// Errors that abort a load run.
///
/// Per-row problems (bad dates, oversized recipients, unparseable sizes) never
/// surface here; they degrade to `None` fields during record assembly.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("CSV file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),
    #[error("category `{0}` has no identifier after preparation")]
    MissingCategory(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type LoadResult<T> = Result<T, LoadError>;
