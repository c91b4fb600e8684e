use std::hash::Hash;

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use tracing::{debug, info};

use crate::common::count_pattern_support;
use crate::config::{validate_max_len, validate_min_support};
use crate::encoder::{EncodedTransactions, TransactionRows, Vocabulary};
use crate::error::{MiningError, Result};
use crate::itemset::Itemset;
use crate::membership::Membership;

/// A frequent itemset paired with its support.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequentItemset<I> {
    pub itemset: Itemset<I>,
    pub support: f64,
}

/// Every frequent itemset found, organised by size.
///
/// Itemsets are kept as sorted vocabulary ids; accessors decode them.
/// Within a level entries are in canonical order.
#[derive(Debug, Clone)]
pub struct FrequentItemsets<I> {
    vocabulary: Vocabulary<I>,
    n_transactions: usize,
    min_support: f64,
    levels: Vec<Vec<(Vec<u32>, f64)>>,
    supports: AHashMap<Vec<u32>, f64>,
}

impl<I: Ord + Hash + Clone> FrequentItemsets<I> {
    fn from_levels(
        vocabulary: Vocabulary<I>,
        n_transactions: usize,
        min_support: f64,
        levels: Vec<Vec<(Vec<u32>, f64)>>,
    ) -> Self {
        let supports = levels
            .iter()
            .flatten()
            .map(|(ids, support)| (ids.clone(), *support))
            .collect();
        FrequentItemsets {
            vocabulary,
            n_transactions,
            min_support,
            levels,
            supports,
        }
    }

    /// Build a collection from externally computed `(itemset, support)` pairs,
    /// e.g. itemsets mined elsewhere. Supports must lie in `[0, 1]` and each
    /// itemset may appear once; the smallest support becomes the collection's
    /// `min_support`.
    pub fn from_supports(
        entries: impl IntoIterator<Item = (Itemset<I>, f64)>,
        n_transactions: usize,
    ) -> Result<Self> {
        let entries: Vec<(usize, Itemset<I>, f64)> = entries
            .into_iter()
            .enumerate()
            .filter(|(_, (itemset, _))| !itemset.is_empty())
            .map(|(index, (itemset, support))| (index, itemset, support))
            .collect();
        let vocabulary = Vocabulary::from_items(
            entries.iter().flat_map(|(_, itemset, _)| itemset.iter().cloned()),
        );

        let mut by_ids: AHashMap<Vec<u32>, f64> = AHashMap::with_capacity(entries.len());
        for (index, itemset, support) in &entries {
            let (index, support) = (*index, *support);
            if !(0.0..=1.0).contains(&support) {
                return Err(MiningError::InvalidSupport { index, value: support });
            }
            if let Some(ids) = vocabulary.encode_itemset(itemset) {
                if by_ids.insert(ids, support).is_some() {
                    return Err(MiningError::DuplicateItemset { index });
                }
            }
        }

        let max_len = by_ids.keys().map(Vec::len).max().unwrap_or(0);
        let mut levels: Vec<Vec<(Vec<u32>, f64)>> = vec![Vec::new(); max_len];
        for (ids, support) in by_ids {
            levels[ids.len() - 1].push((ids, support));
        }
        for level in &mut levels {
            level.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        }
        let min_support = levels
            .iter()
            .flatten()
            .map(|(_, s)| *s)
            .fold(f64::INFINITY, f64::min);
        let min_support = if min_support.is_finite() { min_support } else { 0.0 };

        Ok(FrequentItemsets::from_levels(vocabulary, n_transactions, min_support, levels))
    }

    pub fn vocabulary(&self) -> &Vocabulary<I> {
        &self.vocabulary
    }

    pub fn n_transactions(&self) -> usize {
        self.n_transactions
    }

    pub fn min_support(&self) -> f64 {
        self.min_support
    }

    /// Total number of frequent itemsets across all sizes.
    pub fn len(&self) -> usize {
        self.supports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supports.is_empty()
    }

    /// Size of the largest frequent itemset, 0 when none were found.
    pub fn max_len(&self) -> usize {
        self.levels.len()
    }

    /// Frequent itemsets of size `k`, in canonical order.
    pub fn level(&self, k: usize) -> impl Iterator<Item = FrequentItemset<I>> + '_ {
        let level: &[(Vec<u32>, f64)] = match k {
            0 => &[],
            k => self.levels.get(k - 1).map(Vec::as_slice).unwrap_or(&[]),
        };
        level.iter().map(|(ids, support)| FrequentItemset {
            itemset: self.vocabulary.decode(ids),
            support: *support,
        })
    }

    /// All frequent itemsets, smallest first, canonical order within a size.
    pub fn iter(&self) -> impl Iterator<Item = FrequentItemset<I>> + '_ {
        (1..=self.levels.len()).flat_map(move |k| self.level(k))
    }

    pub fn support(&self, itemset: &Itemset<I>) -> Option<f64> {
        let ids = self.vocabulary.encode_itemset(itemset)?;
        self.supports.get(&ids).copied()
    }

    pub fn contains(&self, itemset: &Itemset<I>) -> bool {
        self.support(itemset).is_some()
    }

    pub(crate) fn support_of_ids(&self, ids: &[u32]) -> Option<f64> {
        self.supports.get(ids).copied()
    }

    pub(crate) fn id_itemsets(&self) -> impl Iterator<Item = (&[u32], f64)> + '_ {
        self.levels
            .iter()
            .flatten()
            .map(|(ids, support)| (ids.as_slice(), *support))
    }
}

/// Smallest count `c` with `c / n >= min_support`, evaluated exactly the way
/// supports are, so the count filter and the support filter agree.
pub(crate) fn min_count(min_support: f64, n_transactions: usize) -> u64 {
    let n = n_transactions as f64;
    let mut count = (min_support * n).ceil() as u64;
    while count > 0 && (count - 1) as f64 / n >= min_support {
        count -= 1;
    }
    while (count as f64) / n < min_support {
        count += 1;
    }
    count.max(1)
}

/// Mine every itemset whose support is at least `min_support`.
///
/// Level k+1 joins frequent k-itemsets sharing a (k-1)-prefix and drops any
/// candidate with an infrequent k-subset before counting. A level is complete
/// before the next is generated. `max_len` caps itemset size.
///
/// Fails before counting on an invalid `min_support` or `max_len`.
pub fn apriori<I: Ord + Hash + Clone>(
    encoded: &EncodedTransactions<I>,
    min_support: f64,
    max_len: Option<usize>,
) -> Result<FrequentItemsets<I>> {
    validate_min_support(min_support)?;
    validate_max_len(max_len)?;
    if encoded.is_empty() {
        return Err(MiningError::EmptyCollection);
    }

    let n_transactions = encoded.len();
    let n_items = encoded.vocabulary().len();
    let min_count = min_count(min_support, n_transactions);
    let to_support = |count: u64| count as f64 / n_transactions as f64;

    let level1: Vec<(Vec<u32>, f64)> = encoded
        .item_counts()
        .iter()
        .enumerate()
        .filter(|(_, &count)| count >= min_count)
        .map(|(id, &count)| (vec![id as u32], to_support(count)))
        .collect();
    debug!(level = 1, candidates = n_items, frequent = level1.len(), "apriori level");

    let mut levels = Vec::new();
    if !level1.is_empty() {
        levels.push(level1);
    }

    let mut k = 2;
    while let Some(prev) = levels.last() {
        if max_len.is_some_and(|ml| k > ml) {
            break;
        }
        let prev_ids: Vec<&[u32]> = prev.iter().map(|(ids, _)| ids.as_slice()).collect();
        let (candidates, pruned) = generate_candidates(&prev_ids);
        if candidates.is_empty() {
            debug!(level = k, pruned, "no candidates left");
            break;
        }

        let counts = match encoded.rows() {
            TransactionRows::Dense(rows) => count_candidates(rows, &candidates, n_items),
            TransactionRows::Sparse(rows) => count_candidates(rows, &candidates, n_items),
        };
        let n_candidates = candidates.len();
        let frequent: Vec<(Vec<u32>, f64)> = candidates
            .into_iter()
            .zip(counts)
            .filter(|&(_, count)| count >= min_count)
            .map(|(ids, count)| (ids, to_support(count)))
            .collect();
        debug!(
            level = k,
            candidates = n_candidates,
            pruned,
            frequent = frequent.len(),
            "apriori level"
        );
        if frequent.is_empty() {
            break;
        }
        levels.push(frequent);
        k += 1;
    }

    let result = FrequentItemsets::from_levels(
        encoded.vocabulary().clone(),
        n_transactions,
        min_support,
        levels,
    );
    info!(
        n_transactions,
        min_support,
        frequent_itemsets = result.len(),
        max_len = result.max_len(),
        "apriori finished"
    );
    Ok(result)
}

fn count_candidates<M: Membership>(rows: &[M], candidates: &[Vec<u32>], n_items: usize) -> Vec<u64> {
    let patterns: Vec<M::Pattern> = candidates.iter().map(|c| M::pattern(c, n_items)).collect();
    count_pattern_support(rows, &patterns)
}

/// Join step plus subset pruning.
///
/// `prev` holds the frequent (k-1)-itemsets in canonical order. Returns the
/// surviving k-candidates, also in canonical order, and how many joined
/// candidates were pruned.
pub(crate) fn generate_candidates(prev: &[&[u32]]) -> (Vec<Vec<u32>>, usize) {
    let Some(first) = prev.first() else {
        return (Vec::new(), 0);
    };
    let prefix_len = first.len() - 1;
    let known: AHashSet<&[u32]> = prev.iter().copied().collect();

    let mut candidates = Vec::new();
    let mut pruned = 0usize;
    let mut subset = Vec::with_capacity(prefix_len + 1);

    let mut start = 0;
    while start < prev.len() {
        let prefix = &prev[start][..prefix_len];
        let mut end = start + 1;
        while end < prev.len() && &prev[end][..prefix_len] == prefix {
            end += 1;
        }

        for i in start..end {
            for j in (i + 1)..end {
                let mut candidate = Vec::with_capacity(prefix_len + 2);
                candidate.extend_from_slice(prev[i]);
                candidate.push(prev[j][prefix_len]);

                // Dropping either of the last two items yields a parent, already known frequent.
                let all_subsets_frequent = (0..prefix_len).all(|skip| {
                    subset.clear();
                    subset.extend(
                        candidate
                            .iter()
                            .enumerate()
                            .filter(|&(pos, _)| pos != skip)
                            .map(|(_, &id)| id),
                    );
                    known.contains(subset.as_slice())
                });
                if all_subsets_frequent {
                    candidates.push(candidate);
                } else {
                    pruned += 1;
                }
            }
        }
        start = end;
    }
    (candidates, pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmptyTransactionPolicy;
    use crate::encoder::encode;
    use crate::membership::Representation;

    fn scenario(representation: Representation) -> EncodedTransactions<&'static str> {
        encode(
            vec![
                vec!["A", "B"],
                vec!["A", "B", "C"],
                vec!["A", "B"],
                vec!["A", "C"],
                vec!["B", "C"],
            ],
            representation,
            EmptyTransactionPolicy::Reject,
        )
        .unwrap()
    }

    #[test]
    fn min_count_matches_support_comparison() {
        assert_eq!(min_count(0.4, 5), 2);
        assert_eq!(min_count(0.41, 5), 3);
        assert_eq!(min_count(1.0, 7), 7);
        assert_eq!(min_count(0.01, 3), 1);
        assert_eq!(min_count(0.3, 10), 3);
        for n in 1..50usize {
            for c in 1..=n {
                let support = c as f64 / n as f64;
                assert_eq!(min_count(support, n), c as u64, "n={n} c={c}");
            }
        }
    }

    #[test]
    fn join_requires_shared_prefix() {
        let prev: Vec<&[u32]> = vec![&[0, 1], &[0, 2], &[1, 2], &[1, 3]];
        let (candidates, pruned) = generate_candidates(&prev);
        // {0,1,2} survives, {1,2,3} needs {2,3}.
        assert_eq!(candidates, vec![vec![0, 1, 2]]);
        assert_eq!(pruned, 1);
    }

    #[test]
    fn level_two_candidates_are_all_pairs() {
        let prev: Vec<&[u32]> = vec![&[0], &[1], &[2]];
        let (candidates, pruned) = generate_candidates(&prev);
        assert_eq!(candidates, vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
        assert_eq!(pruned, 0);
    }

    #[test]
    fn mines_scenario_itemsets() {
        for representation in [Representation::Dense, Representation::Sparse] {
            let frequent = apriori(&scenario(representation), 0.4, None).unwrap();
            let got: Vec<(Vec<&str>, f64)> = frequent
                .iter()
                .map(|f| (f.itemset.into_vec(), f.support))
                .collect();
            assert_eq!(
                got,
                vec![
                    (vec!["A"], 0.8),
                    (vec!["B"], 0.8),
                    (vec!["C"], 0.6),
                    (vec!["A", "B"], 0.6),
                    (vec!["A", "C"], 0.4),
                    (vec!["B", "C"], 0.4),
                ]
            );
            assert!(!frequent.contains(&Itemset::new(["A", "B", "C"])));
            assert_eq!(frequent.max_len(), 2);
            assert_eq!(frequent.n_transactions(), 5);
        }
    }

    #[test]
    fn max_len_caps_itemset_size() {
        let frequent = apriori(&scenario(Representation::Auto), 0.2, Some(1)).unwrap();
        assert_eq!(frequent.max_len(), 1);
        assert_eq!(frequent.len(), 3);
        let unbounded = apriori(&scenario(Representation::Auto), 0.2, None).unwrap();
        assert_eq!(unbounded.support(&Itemset::new(["A", "B", "C"])), Some(0.2));
    }

    #[test]
    fn high_min_support_yields_empty_collection() {
        let frequent = apriori(&scenario(Representation::Auto), 1.0, None).unwrap();
        assert!(frequent.is_empty());
        assert_eq!(frequent.max_len(), 0);
        assert_eq!(frequent.iter().count(), 0);
    }

    #[test]
    fn invalid_settings_fail_before_counting() {
        let encoded = scenario(Representation::Auto);
        assert_eq!(
            apriori(&encoded, 1.5, None).unwrap_err(),
            MiningError::InvalidMinSupport(1.5)
        );
        assert_eq!(apriori(&encoded, 0.5, Some(0)).unwrap_err(), MiningError::InvalidMaxLen);
    }

    #[test]
    fn from_supports_rebuilds_levels() {
        let frequent = FrequentItemsets::from_supports(
            vec![
                (Itemset::new([2u32]), 0.5),
                (Itemset::new([1u32]), 0.7),
                (Itemset::new([2u32, 1]), 0.4),
            ],
            10,
        )
        .unwrap();
        assert_eq!(frequent.len(), 3);
        assert_eq!(frequent.max_len(), 2);
        assert_eq!(frequent.min_support(), 0.4);
        assert_eq!(frequent.support(&Itemset::new([1, 2])), Some(0.4));
        let first: Vec<u32> = frequent.level(1).map(|f| f.itemset.items()[0]).collect();
        assert_eq!(first, vec![1, 2]);

        let bad = FrequentItemsets::from_supports(vec![(Itemset::new([1u32]), 1.2)], 10);
        assert!(matches!(bad, Err(MiningError::InvalidSupport { .. })));
    }

    #[test]
    fn from_supports_rejects_repeated_itemsets() {
        let repeated = FrequentItemsets::from_supports(
            vec![
                (Itemset::new(["a"]), 0.5),
                (Itemset::new(Vec::<&str>::new()), 1.0),
                (Itemset::new(["b", "a"]), 0.3),
                (Itemset::new(["a", "b"]), 0.4),
            ],
            10,
        );
        assert_eq!(repeated.unwrap_err(), MiningError::DuplicateItemset { index: 3 });
    }
}
