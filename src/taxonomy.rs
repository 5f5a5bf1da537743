//! Category taxonomy and weighted sampling.
//!
//! The taxonomy is a closed set of category names, each with a sampling
//! weight. It is built once at startup (either the built-in email taxonomy or
//! a JSON file) and then passed by reference to the category preparer and the
//! sampler. Nothing here is global or mutable after construction.

use std::collections::HashSet;
use std::path::Path;

use rand::Rng;
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use serde::Deserialize;
use thiserror::Error;

/// Allowed drift between the sum of weights and 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Built-in email categories with their sampling weights.
const EMAIL_CATEGORIES: [(&str, f64); 9] = [
    ("purchases", 0.15),
    ("newsletters", 0.25),
    ("updates", 0.10),
    ("work", 0.20),
    ("promotions", 0.10),
    ("social", 0.05),
    ("personal", 0.05),
    ("forums", 0.05),
    ("spam", 0.05),
];

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("taxonomy has no categories")]
    Empty,
    #[error("category name must not be empty")]
    EmptyName,
    #[error("duplicate category `{0}`")]
    DuplicateName(String),
    #[error("category `{name}` has invalid weight {weight}")]
    InvalidWeight { name: String, weight: f64 },
    #[error("category weights sum to {0}, expected 1.0")]
    WeightSum(f64),
    #[error("cannot sample from category weights: {0}")]
    Sampling(#[from] WeightedError),
    #[error("failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid taxonomy file: {0}")]
    Json(#[from] serde_json::Error),
}

/// A category name paired with its sampling probability.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    categories: Vec<Category>,
}

/// Immutable, validated set of categories.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    /// Validate and build a taxonomy.
    ///
    /// Names must be non-empty and unique, weights finite and non-negative,
    /// and the weights must sum to 1.0.
    pub fn new(categories: Vec<Category>) -> Result<Self, TaxonomyError> {
        if categories.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if category.name.trim().is_empty() {
                return Err(TaxonomyError::EmptyName);
            }
            if !seen.insert(category.name.as_str()) {
                return Err(TaxonomyError::DuplicateName(category.name.clone()));
            }
            if !category.weight.is_finite() || category.weight < 0.0 {
                return Err(TaxonomyError::InvalidWeight {
                    name: category.name.clone(),
                    weight: category.weight,
                });
            }
        }

        let total: f64 = categories.iter().map(|c| c.weight).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(TaxonomyError::WeightSum(total));
        }

        Ok(Self { categories })
    }

    /// The nine built-in email categories.
    pub fn email_default() -> Self {
        Self {
            categories: EMAIL_CATEGORIES
                .iter()
                .map(|(name, weight)| Category {
                    name: (*name).to_string(),
                    weight: *weight,
                })
                .collect(),
        }
    }

    /// Load a taxonomy from a JSON file of the form
    /// `{"categories": [{"name": "work", "weight": 1.0}]}`.
    pub fn from_json_file(path: &Path) -> Result<Self, TaxonomyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = serde_json::from_str(raw)?;
        Self::new(file.categories)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Build the weighted sampler for this taxonomy.
    pub fn sampler(&self) -> Result<CategorySampler<'_>, TaxonomyError> {
        CategorySampler::new(self)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::email_default()
    }
}

/// Draws category names independently according to the taxonomy weights.
///
/// The sampler holds no state between draws; randomness comes entirely from
/// the caller's RNG, so a seeded RNG gives reproducible assignments.
pub struct CategorySampler<'t> {
    taxonomy: &'t Taxonomy,
    index: WeightedIndex<f64>,
}

impl<'t> CategorySampler<'t> {
    pub fn new(taxonomy: &'t Taxonomy) -> Result<Self, TaxonomyError> {
        let index = WeightedIndex::new(taxonomy.categories.iter().map(|c| c.weight))?;
        Ok(Self { taxonomy, index })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &'t str {
        let taxonomy: &'t Taxonomy = self.taxonomy;
        taxonomy.categories[self.index.sample(rng)].name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    #[test]
    fn default_taxonomy_is_valid() {
        let taxonomy = Taxonomy::email_default();
        assert_eq!(taxonomy.len(), 9);
        Taxonomy::new(taxonomy.categories().to_vec()).expect("built-in taxonomy validates");
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let err = Taxonomy::new(vec![
            Category { name: "a".into(), weight: 0.5 },
            Category { name: "b".into(), weight: 0.4 },
        ])
        .unwrap_err();
        assert!(matches!(err, TaxonomyError::WeightSum(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Taxonomy::new(vec![
            Category { name: "work".into(), weight: 0.5 },
            Category { name: "work".into(), weight: 0.5 },
        ])
        .unwrap_err();
        assert!(matches!(err, TaxonomyError::DuplicateName(name) if name == "work"));
    }

    #[test]
    fn rejects_negative_weight() {
        let err = Taxonomy::new(vec![
            Category { name: "a".into(), weight: 1.5 },
            Category { name: "b".into(), weight: -0.5 },
        ])
        .unwrap_err();
        assert!(matches!(err, TaxonomyError::InvalidWeight { .. }));
    }

    #[test]
    fn parses_json_taxonomy() {
        let taxonomy = Taxonomy::from_json_str(
            r#"{"categories": [{"name": "work", "weight": 0.75}, {"name": "spam", "weight": 0.25}]}"#,
        )
        .expect("valid taxonomy");
        assert_eq!(taxonomy.names().collect::<Vec<_>>(), vec!["work", "spam"]);
    }

    #[test]
    fn weighted_sampling_matches_configured_probabilities() {
        let taxonomy = Taxonomy::email_default();
        let sampler = taxonomy.sampler().expect("sampler");
        let mut rng = StdRng::seed_from_u64(42);

        let draws = 20_000;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..draws {
            *counts.entry(sampler.sample(&mut rng)).or_default() += 1;
        }

        for category in taxonomy.categories() {
            let observed = counts.get(category.name.as_str()).copied().unwrap_or(0) as f64
                / draws as f64;
            assert!(
                (observed - category.weight).abs() <= 0.02,
                "{}: observed {:.4}, expected {:.2}",
                category.name,
                observed,
                category.weight
            );
        }
    }

    #[test]
    fn zero_weight_category_is_never_drawn() {
        let taxonomy = Taxonomy::new(vec![
            Category { name: "never".into(), weight: 0.0 },
            Category { name: "always".into(), weight: 1.0 },
        ])
        .expect("valid taxonomy");
        let sampler = taxonomy.sampler().expect("sampler");
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..1_000).all(|_| sampler.sample(&mut rng) == "always"));
    }

    #[test]
    fn sampler_reports_the_weight_error() {
        let taxonomy = Taxonomy {
            categories: vec![Category { name: "idle".into(), weight: 0.0 }],
        };
        let err = taxonomy.sampler().err().expect("all-zero weights cannot be sampled");
        assert!(matches!(
            err,
            TaxonomyError::Sampling(WeightedError::AllWeightsZero)
        ));
        assert!(err.to_string().starts_with("cannot sample from category weights"));
    }
}
