//! Category preparation.
//!
//! Every taxonomy name is inserted if absent (one statement per category,
//! conflicts ignored), then the whole `Categories` table is read back into a
//! name → id map. Rows that existed before the run are included in the map.

use std::collections::HashMap;

use sqlx::PgConnection;

use crate::error::{LoadError, LoadResult};
use crate::taxonomy::Taxonomy;

/// Category name to `categoryID`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    ids: HashMap<String, i32>,
}

impl CategoryMap {
    /// Ids numbered 1.. in taxonomy order, for runs that never touch the
    /// database.
    pub fn provisional(taxonomy: &Taxonomy) -> Self {
        Self {
            ids: taxonomy
                .names()
                .enumerate()
                .map(|(index, name)| (name.to_string(), index as i32 + 1))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.ids.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl FromIterator<(String, i32)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (String, i32)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Ensure every taxonomy category exists exactly once and return the full
/// name → id map.
///
/// Runs on whatever connection it is given; inside a load this is the run
/// transaction, so a failed load also rolls back newly inserted categories.
pub async fn prepare_categories(
    conn: &mut PgConnection,
    taxonomy: &Taxonomy,
) -> LoadResult<CategoryMap> {
    let mut inserted = 0u64;
    for name in taxonomy.names() {
        let result = sqlx::query(
            "INSERT INTO Categories (categoryName) VALUES ($1) ON CONFLICT (categoryName) DO NOTHING",
        )
        .bind(name)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }

    let rows: Vec<(String, i32)> =
        sqlx::query_as("SELECT categoryName, categoryID FROM Categories")
            .fetch_all(&mut *conn)
            .await?;
    let categories: CategoryMap = rows.into_iter().collect();

    for name in taxonomy.names() {
        match categories.get(name) {
            Some(id) => log::debug!("category {} -> {}", name, id),
            None => return Err(LoadError::MissingCategory(name.to_string())),
        }
    }

    log::info!(
        "prepared {} categories ({} new, {} total in table)",
        taxonomy.len(),
        inserted,
        categories.len()
    );
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_ids_follow_taxonomy_order() {
        let taxonomy = Taxonomy::email_default();
        let map = CategoryMap::provisional(&taxonomy);
        assert_eq!(map.len(), 9);
        assert_eq!(map.get("purchases"), Some(1));
        assert_eq!(map.get("spam"), Some(9));
        assert_eq!(map.get("unknown"), None);
    }
}
