use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_fallback() -> String {
    "Other".to_string()
}

/// A category and the lowercase substrings that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub patterns: Vec<String>,
}

/// Ordered substring rules; the first matching rule wins. Names matching no
/// rule go to `fallback`, which is never filtered out downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categorizer {
    #[serde(default = "default_fallback")]
    pub fallback: String,
    #[serde(default)]
    pub rules: Vec<CategoryRule>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Categorizer {
            fallback: default_fallback(),
            rules: Vec::new(),
        }
    }
}

impl Categorizer {
    pub fn new(fallback: impl Into<String>) -> Self {
        Categorizer {
            fallback: fallback.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule<S: Into<String>>(
        mut self,
        category: impl Into<String>,
        patterns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.rules.push(CategoryRule {
            category: category.into(),
            patterns: patterns.into_iter().map(|p| p.into().to_lowercase()).collect(),
        });
        self
    }

    /// Case-insensitive: both the name and the patterns are lowercased.
    pub fn categorize(&self, name: &str) -> &str {
        let name = name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|p| name.contains(&p.to_lowercase())))
            .map_or(self.fallback.as_str(), |rule| rule.category.as_str())
    }
}

/// Group `(key, item)` records into baskets, one per distinct key, in
/// ascending key order. Duplicate items are kept; the encoder collapses them.
pub fn group_baskets<K: Ord, L>(records: impl IntoIterator<Item = (K, L)>) -> Vec<Vec<L>> {
    let mut groups: BTreeMap<K, Vec<L>> = BTreeMap::new();
    for (key, item) in records {
        groups.entry(key).or_default().push(item);
    }
    groups.into_values().collect()
}
