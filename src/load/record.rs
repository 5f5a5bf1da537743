//! Insert-ready email records.
//!
//! `RecordAssembler` turns raw `SourceRow`s into `EmailRecord`s in one pure
//! pass. Every row produces exactly one record; malformed fields become `None`
//! instead of dropping the row.

use rand::Rng;

use crate::error::{LoadError, LoadResult};
use crate::load::categories::CategoryMap;
use crate::load::date::normalize_date;
use crate::load::source::SourceRow;
use crate::load::stats::LoadStats;
use crate::taxonomy::{CategorySampler, Taxonomy};

/// One row of the `Emails` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    pub message_id: Option<String>,
    /// Normalized `YYYY-MM-DD HH:MM:SS`, or `None` when unparseable
    pub date: Option<String>,
    pub sender_email: Option<String>,
    /// The export's `Subject`, stored in the `message` column
    pub message: Option<String>,
    pub recipient_email: Option<String>,
    pub size: Option<i64>,
    pub category_id: i32,
}

/// Cut `value` to at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &value[..byte_index],
        None => value,
    }
}

/// Parse the export's `Size` column.
///
/// Accepts whole numbers, including float spellings such as `"1024.0"`.
pub fn parse_size(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(size) = trimmed.parse::<i64>() {
        return Some(size);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Some(value as i64),
        _ => None,
    }
}

/// Builds `EmailRecord`s from source rows.
pub struct RecordAssembler<'a> {
    sampler: CategorySampler<'a>,
    categories: &'a CategoryMap,
    max_recipient_len: usize,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(
        taxonomy: &'a Taxonomy,
        categories: &'a CategoryMap,
        max_recipient_len: usize,
    ) -> LoadResult<Self> {
        Ok(Self {
            sampler: taxonomy.sampler()?,
            categories,
            max_recipient_len,
        })
    }

    /// Assemble one record per row, preserving row order.
    ///
    /// Returns the records together with the per-row counters of `LoadStats`.
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        rows: &[SourceRow],
        rng: &mut R,
    ) -> LoadResult<(Vec<EmailRecord>, LoadStats)> {
        let mut stats = LoadStats {
            rows_read: rows.len(),
            categories_prepared: self.categories.len(),
            ..Default::default()
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(self.assemble_row(row, rng, &mut stats)?);
        }

        if stats.null_dates > 0 {
            log::warn!(
                "{} of {} rows have unparseable dates, stored as NULL",
                stats.null_dates,
                stats.rows_read
            );
        }
        if stats.truncated_recipients > 0 {
            log::info!(
                "truncated {} recipients to {} characters",
                stats.truncated_recipients,
                self.max_recipient_len
            );
        }

        Ok((records, stats))
    }

    fn assemble_row<R: Rng + ?Sized>(
        &self,
        row: &SourceRow,
        rng: &mut R,
        stats: &mut LoadStats,
    ) -> LoadResult<EmailRecord> {
        let category = self.sampler.sample(rng);
        let category_id = self
            .categories
            .get(category)
            .ok_or_else(|| LoadError::MissingCategory(category.to_string()))?;
        *stats.category_counts.entry(category.to_string()).or_default() += 1;

        let date = row.date.as_deref().and_then(normalize_date);
        if date.is_none() {
            stats.null_dates += 1;
        }

        let recipient_email = match row.recipient.as_deref() {
            Some(recipient) => {
                let truncated = truncate_chars(recipient, self.max_recipient_len);
                if truncated.len() < recipient.len() {
                    stats.truncated_recipients += 1;
                }
                Some(truncated.to_string())
            }
            None => {
                stats.null_recipients += 1;
                None
            }
        };

        let size = match row.size.as_deref() {
            Some(raw) => {
                let parsed = parse_size(raw);
                if parsed.is_none() {
                    log::debug!(
                        "invalid size `{}` for message {:?}, storing NULL",
                        raw,
                        row.message_id
                    );
                    stats.invalid_sizes += 1;
                }
                parsed
            }
            None => None,
        };

        Ok(EmailRecord {
            message_id: row.message_id.clone(),
            date,
            sender_email: row.from.clone(),
            message: row.subject.clone(),
            recipient_email,
            size,
            category_id,
        })
    }
}
