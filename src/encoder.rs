use std::hash::Hash;

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::common::count_item_support;
use crate::config::EmptyTransactionPolicy;
use crate::error::{MiningError, Result};
use crate::itemset::Itemset;
use crate::membership::{BitSet, Membership, Representation, SparseRow};

/// Canonical, deduplicated item vocabulary.
#[derive(Debug, Clone)]
pub struct Vocabulary<I> {
    items: Vec<I>,
    index: AHashMap<I, u32>,
}

impl<I: PartialEq> PartialEq for Vocabulary<I> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<I: Eq> Eq for Vocabulary<I> {}

impl<I: Ord + Hash + Clone> Vocabulary<I> {
    pub fn from_items(items: impl IntoIterator<Item = I>) -> Self {
        let mut items: Vec<I> = items.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        let index = items
            .iter()
            .enumerate()
            .map(|(id, item)| (item.clone(), id as u32))
            .collect();
        Vocabulary { items, index }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in vocabulary order.
    pub fn items(&self) -> &[I] {
        &self.items
    }

    pub fn id(&self, item: &I) -> Option<u32> {
        self.index.get(item).copied()
    }

    pub fn item(&self, id: u32) -> Option<&I> {
        self.items.get(id as usize)
    }

    /// Vocabulary ids of `itemset`, or `None` if any member is unknown.
    pub fn encode_itemset(&self, itemset: &Itemset<I>) -> Option<Vec<u32>> {
        itemset.iter().map(|item| self.id(item)).collect()
    }

    /// `ids` must be sorted ascending and in range.
    pub(crate) fn decode(&self, ids: &[u32]) -> Itemset<I> {
        Itemset::from_sorted(ids.iter().map(|&id| self.items[id as usize].clone()).collect())
    }
}

/// Per-transaction rows in the selected representation.
#[derive(Debug, Clone)]
pub enum TransactionRows {
    Dense(Vec<BitSet>),
    Sparse(Vec<SparseRow>),
}

impl TransactionRows {
    fn build(rows: &[Vec<u32>], n_items: usize, representation: Representation) -> Self {
        match representation.resolve(n_items) {
            Representation::Sparse => TransactionRows::Sparse(build_rows(rows, n_items)),
            _ => TransactionRows::Dense(build_rows(rows, n_items)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TransactionRows::Dense(rows) => rows.len(),
            TransactionRows::Sparse(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn representation(&self) -> Representation {
        match self {
            TransactionRows::Dense(_) => Representation::Dense,
            TransactionRows::Sparse(_) => Representation::Sparse,
        }
    }

    fn contains_ids(&self, row: usize, ids: &[u32], n_items: usize) -> bool {
        match self {
            TransactionRows::Dense(rows) => rows[row].contains(&BitSet::pattern(ids, n_items)),
            TransactionRows::Sparse(rows) => rows[row].contains(&SparseRow::pattern(ids, n_items)),
        }
    }
}

fn build_rows<M: Membership>(rows: &[Vec<u32>], n_items: usize) -> Vec<M> {
    rows.iter().map(|ids| M::from_items(ids, n_items)).collect()
}

/// Output of [`encode`]: the vocabulary and one membership row per transaction.
#[derive(Debug, Clone)]
pub struct EncodedTransactions<I> {
    vocabulary: Vocabulary<I>,
    rows: TransactionRows,
    item_counts: Vec<u64>,
}

impl<I: Ord + Hash + Clone> EncodedTransactions<I> {
    /// Number of transactions, including any kept empty ones.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn vocabulary(&self) -> &Vocabulary<I> {
        &self.vocabulary
    }

    pub fn rows(&self) -> &TransactionRows {
        &self.rows
    }

    pub fn representation(&self) -> Representation {
        self.rows.representation()
    }

    /// `item_counts()[id]` is the number of transactions containing vocabulary item `id`.
    pub fn item_counts(&self) -> &[u64] {
        &self.item_counts
    }

    /// Whether transaction `row` contains every member of `itemset`.
    /// Out-of-range rows and unknown items yield `false`.
    pub fn contains(&self, row: usize, itemset: &Itemset<I>) -> bool {
        if row >= self.len() {
            return false;
        }
        match self.vocabulary.encode_itemset(itemset) {
            Some(ids) => self.rows.contains_ids(row, &ids, self.vocabulary.len()),
            None => false,
        }
    }
}

/// Encode raw transactions.
///
/// Duplicates inside a transaction collapse to one membership flag. An empty
/// input sequence is always an error; an empty transaction is handled per
/// `empty_policy`.
pub fn encode<I, T, It>(
    transactions: It,
    representation: Representation,
    empty_policy: EmptyTransactionPolicy,
) -> Result<EncodedTransactions<I>>
where
    I: Ord + Hash + Clone,
    T: IntoIterator<Item = I>,
    It: IntoIterator<Item = T>,
{
    let mut baskets: Vec<Vec<I>> = Vec::new();
    let mut n_empty = 0usize;
    for (index, transaction) in transactions.into_iter().enumerate() {
        let mut items: Vec<I> = transaction.into_iter().collect();
        if items.is_empty() {
            match empty_policy {
                EmptyTransactionPolicy::Reject => return Err(MiningError::EmptyTransaction { index }),
                EmptyTransactionPolicy::Keep => n_empty += 1,
            }
        }
        items.sort_unstable();
        items.dedup();
        baskets.push(items);
    }
    if baskets.is_empty() {
        return Err(MiningError::EmptyCollection);
    }
    if n_empty > 0 {
        warn!(
            n_empty,
            n_transactions = baskets.len(),
            "keeping empty transactions in the support denominator"
        );
    }

    let vocabulary = Vocabulary::from_items(baskets.iter().flatten().cloned());
    let n_items = vocabulary.len();

    // Items are sorted and the vocabulary is order-preserving, so ids come out sorted.
    let id_rows: Vec<Vec<u32>> = baskets
        .iter()
        .map(|items| items.iter().map(|item| vocabulary.index[item]).collect())
        .collect();

    let item_counts = count_item_support(&id_rows, n_items);
    let rows = TransactionRows::build(&id_rows, n_items, representation);
    debug!(
        n_transactions = rows.len(),
        n_items,
        representation = rows.representation().name(),
        "encoded transactions"
    );

    Ok(EncodedTransactions {
        vocabulary,
        rows,
        item_counts,
    })
}
