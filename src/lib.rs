//! Frequent itemset mining and association rules for market-basket data.
//!
//! The pipeline has three stages, each reading only the previous one's output:
//!
//! 1. [`encoder::encode`] turns raw transactions into a sorted vocabulary and
//!    one membership row per transaction.
//! 2. [`apriori::apriori`] runs the level-wise search for every itemset whose
//!    support reaches `min_support`.
//! 3. [`association_rules::association_rules`] splits each frequent itemset into
//!    antecedent/consequent pairs, scores them and returns a deterministically
//!    ordered list.
//!
//! [`pipeline::mine`] runs all three from a [`MiningConfig`].
//!
//! ```
//! use rulemine::{mine, Itemset, MiningConfig};
//!
//! let baskets = vec![
//!     vec!["A", "B"],
//!     vec!["A", "B", "C"],
//!     vec!["A", "B"],
//!     vec!["A", "C"],
//!     vec!["B", "C"],
//! ];
//! let report = mine(baskets, &MiningConfig::new(0.4, 0.9)).unwrap();
//! assert_eq!(report.rules.len(), 2);
//! assert_eq!(report.rules[0].antecedent, Itemset::new(["A"]));
//! ```

pub mod apriori;
pub mod association_rules;
pub mod categorize;
pub mod cli;
mod common;
pub mod config;
pub mod encoder;
pub mod error;
pub mod itemset;
pub mod membership;
pub mod pipeline;
#[cfg(feature = "python")]
mod python;

pub use apriori::{apriori, FrequentItemset, FrequentItemsets};
pub use association_rules::{association_rules, AssociationRule, RuleMetrics};
pub use categorize::{group_baskets, Categorizer};
pub use config::{EmptyTransactionPolicy, Metric, MiningConfig};
pub use encoder::{encode, EncodedTransactions, Vocabulary};
pub use error::{ErrorKind, MiningError, Result};
pub use itemset::Itemset;
pub use membership::{BitSet, Membership, Representation, SparseRow};
pub use pipeline::{mine, MiningReport};
