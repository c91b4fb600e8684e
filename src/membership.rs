use std::str::FromStr;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::error::MiningError;

/// Vocabularies up to this size use [`BitSet`] rows under [`Representation::Auto`].
pub const DENSE_VOCABULARY_CUTOFF: usize = 4096;

/// Membership test capability over vocabulary ids. Rows are queried with a
/// pre-built pattern per candidate; the miner never looks inside the row.
pub trait Membership: Send + Sync {
    /// Query form of an itemset.
    type Pattern: Send + Sync;

    /// Build a row from sorted, deduplicated vocabulary ids.
    fn from_items(items: &[u32], n_items: usize) -> Self;

    fn pattern(items: &[u32], n_items: usize) -> Self::Pattern;

    /// True when every item of `pattern` is present in this row.
    fn contains(&self, pattern: &Self::Pattern) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense bit-vector over the vocabulary, backed by `Vec<u64>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    blocks: Vec<u64>,
}

impl BitSet {
    pub fn new(num_bits: usize) -> Self {
        BitSet {
            blocks: vec![0; num_bits.div_ceil(64)],
        }
    }

    #[inline]
    pub fn set(&mut self, bit: usize) {
        self.blocks[bit / 64] |= 1 << (bit % 64);
    }

    #[inline]
    pub fn count_ones(&self) -> u64 {
        self.blocks.iter().map(|b| b.count_ones() as u64).sum()
    }

    #[inline]
    pub fn is_subset_of(&self, other: &BitSet) -> bool {
        self.blocks
            .iter()
            .zip(other.blocks.iter())
            .all(|(a, b)| a & !b == 0)
    }
}

impl Membership for BitSet {
    type Pattern = BitSet;

    fn from_items(items: &[u32], n_items: usize) -> Self {
        let mut bs = BitSet::new(n_items);
        for &item in items {
            bs.set(item as usize);
        }
        bs
    }

    fn pattern(items: &[u32], n_items: usize) -> BitSet {
        <BitSet as Membership>::from_items(items, n_items)
    }

    #[inline]
    fn contains(&self, pattern: &BitSet) -> bool {
        pattern.is_subset_of(self)
    }

    fn len(&self) -> usize {
        self.count_ones() as usize
    }
}

/// Sparse hash-set row, for vocabularies too large for a bit-vector per row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseRow {
    items: AHashSet<u32>,
}

impl Membership for SparseRow {
    type Pattern = Vec<u32>;

    fn from_items(items: &[u32], _n_items: usize) -> Self {
        SparseRow {
            items: items.iter().copied().collect(),
        }
    }

    fn pattern(items: &[u32], _n_items: usize) -> Vec<u32> {
        items.to_vec()
    }

    #[inline]
    fn contains(&self, pattern: &Vec<u32>) -> bool {
        pattern.len() <= self.items.len() && pattern.iter().all(|i| self.items.contains(i))
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Selects the row representation used by the encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    /// Dense for small vocabularies, sparse otherwise.
    #[default]
    Auto,
    Dense,
    Sparse,
}

impl Representation {
    /// Resolve `Auto` against the vocabulary size; never returns `Auto`.
    pub fn resolve(self, n_items: usize) -> Representation {
        match self {
            Representation::Auto if n_items <= DENSE_VOCABULARY_CUTOFF => Representation::Dense,
            Representation::Auto => Representation::Sparse,
            other => other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Representation::Auto => "auto",
            Representation::Dense => "dense",
            Representation::Sparse => "sparse",
        }
    }
}

impl FromStr for Representation {
    type Err = MiningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Representation::Auto),
            "dense" => Ok(Representation::Dense),
            "sparse" => Ok(Representation::Sparse),
            other => Err(MiningError::UnknownRepresentation(other.to_string())),
        }
    }
}
