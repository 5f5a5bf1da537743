//! Per-category summary of loaded emails.

use std::fmt;

use sqlx::PgConnection;

/// Email count and total size for one category.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CategorySummary {
    pub category_id: i32,
    pub category_name: String,
    pub email_count: i64,
    pub total_size: i64,
}

/// Count emails per category, including categories without any emails.
///
/// Ordered by email count, largest first.
pub async fn category_summary(conn: &mut PgConnection) -> Result<Vec<CategorySummary>, sqlx::Error> {
    sqlx::query_as::<_, CategorySummary>(
        r#"SELECT
               c.categoryID AS category_id,
               c.categoryName AS category_name,
               COUNT(e.emailID) AS email_count,
               COALESCE(SUM(e.size), 0)::BIGINT AS total_size
           FROM Categories c
           LEFT JOIN Emails e ON c.categoryID = e.CategoryID
           GROUP BY c.categoryID, c.categoryName
           ORDER BY email_count DESC, c.categoryName"#,
    )
    .fetch_all(&mut *conn)
    .await
}

/// Renders summaries as an aligned text table.
pub struct SummaryTable<'a>(pub &'a [CategorySummary]);

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .0
            .iter()
            .map(|summary| summary.category_name.len())
            .max()
            .unwrap_or(0)
            .max("category".len());

        writeln!(f, "{:<width$}  {:>10}  {:>14}", "category", "emails", "total size")?;
        for summary in self.0 {
            writeln!(
                f,
                "{:<width$}  {:>10}  {:>14}",
                summary.category_name, summary.email_count, summary.total_size
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_columns() {
        let rows = vec![
            CategorySummary {
                category_id: 2,
                category_name: "newsletters".into(),
                email_count: 25,
                total_size: 4096,
            },
            CategorySummary {
                category_id: 9,
                category_name: "spam".into(),
                email_count: 0,
                total_size: 0,
            },
        ];

        let rendered = SummaryTable(&rows).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("category   "));
        assert!(lines[1].starts_with("newsletters"));
        assert!(lines[1].ends_with("4096"));
        assert_eq!(lines[1].len(), lines[2].len());
    }
}
