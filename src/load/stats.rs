//! Load run statistics.

use std::collections::BTreeMap;
use std::fmt;

/// Counters for one load run.
///
/// Assembly fills in the per-row counters; the batch phase fills in
/// `emails_inserted` and `batch_sizes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Rows read from the CSV export
    pub rows_read: usize,
    /// Rows written to `Emails`
    pub emails_inserted: usize,
    /// Size of every submitted batch, in submission order
    pub batch_sizes: Vec<usize>,
    /// Categories known after preparation (taxonomy plus pre-existing rows)
    pub categories_prepared: usize,
    /// Rows whose date could not be parsed
    pub null_dates: usize,
    /// Rows whose recipient was cut to the maximum length
    pub truncated_recipients: usize,
    /// Rows without a recipient
    pub null_recipients: usize,
    /// Rows whose size was present but not a whole number
    pub invalid_sizes: usize,
    /// Rows assigned to each category name
    pub category_counts: BTreeMap<String, usize>,
}

impl LoadStats {
    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Load statistics:")?;
        writeln!(f, "  rows read: {}", self.rows_read)?;
        writeln!(
            f,
            "  emails inserted: {} in {} batches",
            self.emails_inserted,
            self.batches()
        )?;
        writeln!(f, "  categories: {}", self.categories_prepared)?;
        writeln!(f, "  null dates: {}", self.null_dates)?;
        writeln!(
            f,
            "  recipients: {} truncated, {} null",
            self.truncated_recipients, self.null_recipients
        )?;
        writeln!(f, "  invalid sizes: {}", self.invalid_sizes)?;
        for (name, count) in &self.category_counts {
            writeln!(f, "  {}: {}", name, count)?;
        }
        Ok(())
    }
}
