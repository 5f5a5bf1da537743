//! Batched email inserts.
//!
//! Records are split into contiguous batches and each batch becomes a single
//! `INSERT ... SELECT FROM UNNEST(...)` statement with one array parameter per
//! column. `WITH ORDINALITY` keeps rows in input order so `emailID` follows
//! the CSV.

use std::ops::Range;

use sqlx::PgConnection;

use crate::load::record::EmailRecord;

/// One batch in columnar form, ready to bind as UNNEST arrays.
///
/// All vectors have the same length; index `i` is one `Emails` row.
#[derive(Debug, Default)]
pub struct EmailColumns {
    pub message_ids: Vec<Option<String>>,
    pub dates: Vec<Option<String>>,
    pub sender_emails: Vec<Option<String>>,
    pub messages: Vec<Option<String>>,
    pub recipient_emails: Vec<Option<String>>,
    pub sizes: Vec<Option<i64>>,
    pub category_ids: Vec<i32>,
}

impl EmailColumns {
    pub fn len(&self) -> usize {
        self.message_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.message_ids.is_empty()
    }
}

impl From<&[EmailRecord]> for EmailColumns {
    fn from(records: &[EmailRecord]) -> Self {
        let mut columns = EmailColumns {
            message_ids: Vec::with_capacity(records.len()),
            dates: Vec::with_capacity(records.len()),
            sender_emails: Vec::with_capacity(records.len()),
            messages: Vec::with_capacity(records.len()),
            recipient_emails: Vec::with_capacity(records.len()),
            sizes: Vec::with_capacity(records.len()),
            category_ids: Vec::with_capacity(records.len()),
        };

        for record in records {
            columns.message_ids.push(record.message_id.clone());
            columns.dates.push(record.date.clone());
            columns.sender_emails.push(record.sender_email.clone());
            columns.messages.push(record.message.clone());
            columns.recipient_emails.push(record.recipient_email.clone());
            columns.sizes.push(record.size);
            columns.category_ids.push(record.category_id);
        }

        columns
    }
}

/// Split `total` rows into contiguous ranges of at most `batch_size`.
///
/// A `batch_size` of zero is treated as one.
pub fn plan_batches(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

/// Insert one batch as a single statement.
///
/// # Returns
/// Number of rows inserted
pub async fn insert_batch(
    conn: &mut PgConnection,
    records: &[EmailRecord],
) -> Result<usize, sqlx::Error> {
    if records.is_empty() {
        return Ok(0);
    }

    let columns = EmailColumns::from(records);

    let result = sqlx::query(
        r#"INSERT INTO Emails (
            messageID, date, senderEmail, message, recipientEmail, size, CategoryID
           )
           SELECT
               message_id,
               mail_date::timestamp,
               sender_email,
               message,
               recipient_email,
               size,
               category_id
           FROM UNNEST(
               $1::text[],
               $2::text[],
               $3::text[],
               $4::text[],
               $5::text[],
               $6::bigint[],
               $7::int[]
           ) WITH ORDINALITY AS t(
               message_id, mail_date, sender_email, message, recipient_email, size, category_id, ord
           )
           ORDER BY ord"#,
    )
    .bind(&columns.message_ids)
    .bind(&columns.dates)
    .bind(&columns.sender_emails)
    .bind(&columns.messages)
    .bind(&columns.recipient_emails)
    .bind(&columns.sizes)
    .bind(&columns.category_ids)
    .execute(&mut *conn)
    .await?;

    let inserted = result.rows_affected() as usize;
    log::trace!("bulk inserted {} emails", inserted);
    Ok(inserted)
}

/// Insert all records batch by batch, in order, logging progress after each.
///
/// # Returns
/// The size of every submitted batch
pub async fn insert_batches(
    conn: &mut PgConnection,
    records: &[EmailRecord],
    batch_size: usize,
) -> Result<Vec<usize>, sqlx::Error> {
    let total = records.len();
    let plan = plan_batches(total, batch_size);
    let mut batch_sizes = Vec::with_capacity(plan.len());
    let mut inserted = 0;

    for (index, range) in plan.into_iter().enumerate() {
        let count = insert_batch(conn, &records[range]).await?;
        inserted += count;
        batch_sizes.push(count);
        log::info!(
            "batch {}: inserted {}/{} emails",
            index + 1,
            inserted,
            total
        );
    }

    Ok(batch_sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> EmailRecord {
        EmailRecord {
            message_id: Some(format!("<{}@example.com>", n)),
            date: None,
            sender_email: Some("a@example.com".into()),
            message: None,
            recipient_email: None,
            size: Some(n as i64),
            category_id: 1,
        }
    }

    #[test]
    fn plans_full_batches_and_a_remainder() {
        let plan = plan_batches(2500, 1000);
        assert_eq!(plan, vec![0..1000, 1000..2000, 2000..2500]);
        let sizes: Vec<usize> = plan.iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
    }

    #[test]
    fn plans_exact_multiple_and_empty_input() {
        assert_eq!(plan_batches(2000, 1000).len(), 2);
        assert!(plan_batches(0, 1000).is_empty());
        assert_eq!(plan_batches(3, 0), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn columns_preserve_record_order() {
        let records: Vec<EmailRecord> = (0..5).map(record).collect();
        let columns = EmailColumns::from(records.as_slice());
        assert_eq!(columns.len(), 5);
        assert_eq!(columns.sizes, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(columns.message_ids[4].as_deref(), Some("<4@example.com>"));
    }
}
