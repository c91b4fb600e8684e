use std::fmt;
use std::hash::Hash;

use serde::Serialize;
use tracing::info_span;

use crate::apriori::{apriori, FrequentItemset};
use crate::association_rules::{association_rules, AssociationRule};
use crate::config::MiningConfig;
use crate::encoder::encode;
use crate::error::Result;

/// What the core hands to a reporting or export consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiningReport<I> {
    pub n_transactions: usize,
    pub n_items: usize,
    /// Smallest itemsets first, canonical order within a size.
    pub frequent_itemsets: Vec<FrequentItemset<I>>,
    pub rules: Vec<AssociationRule<I>>,
}

impl<I> MiningReport<I> {
    /// Keep only the `n` highest-ranked rules.
    pub fn truncate_rules(&mut self, n: usize) {
        self.rules.truncate(n);
    }
}

/// Run the whole pipeline over raw transactions.
///
/// The configuration is validated before the input is touched.
pub fn mine<I, T, It>(transactions: It, config: &MiningConfig) -> Result<MiningReport<I>>
where
    I: fmt::Debug + Ord + Hash + Clone + Send + Sync,
    T: IntoIterator<Item = I>,
    It: IntoIterator<Item = T>,
{
    config.validate()?;
    let _span = info_span!(
        "mine",
        min_support = config.min_support,
        metric = config.metric.name(),
        min_threshold = config.min_threshold
    )
    .entered();

    let encoded = encode(transactions, config.representation, config.empty_transactions)?;
    let itemsets = apriori(&encoded, config.min_support, config.max_len)?;
    let rules = association_rules(&itemsets, config.metric, config.min_threshold)?;

    Ok(MiningReport {
        n_transactions: encoded.len(),
        n_items: encoded.vocabulary().len(),
        frequent_itemsets: itemsets.iter().collect(),
        rules,
    })
}
