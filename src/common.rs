use rayon::prelude::*;

use crate::membership::Membership;

/// Below this many row-pattern tests, counting stays on the calling thread.
pub(crate) const PAR_COUNT_CUTOFF: usize = 1 << 15;

/// Compute per-item support counts from rows of sorted vocabulary ids.
/// Returns a Vec where `result[item] = count of rows containing item`.
pub(crate) fn count_item_support(rows: &[Vec<u32>], n_items: usize) -> Vec<u64> {
    let total: usize = rows.iter().map(Vec::len).sum();
    if total < PAR_COUNT_CUTOFF {
        let mut counts = vec![0u64; n_items];
        for row in rows {
            for &item in row {
                counts[item as usize] += 1;
            }
        }
        return counts;
    }
    rows.par_iter()
        .fold(
            || vec![0u64; n_items],
            |mut acc, row| {
                for &item in row {
                    acc[item as usize] += 1;
                }
                acc
            },
        )
        .reduce(|| vec![0u64; n_items], merge_counts)
}

/// Count, for each pattern, the rows that contain it.
///
/// Workers accumulate into local vectors that are summed at the end, so the
/// result does not depend on how rows are split across threads.
pub(crate) fn count_pattern_support<M: Membership>(rows: &[M], patterns: &[M::Pattern]) -> Vec<u64> {
    let n = patterns.len();
    let tally = |mut acc: Vec<u64>, row: &M| {
        for (count, pattern) in acc.iter_mut().zip(patterns) {
            if row.contains(pattern) {
                *count += 1;
            }
        }
        acc
    };
    if rows.len().saturating_mul(n) < PAR_COUNT_CUTOFF {
        return rows.iter().fold(vec![0u64; n], tally);
    }
    rows.par_iter()
        .fold(|| vec![0u64; n], tally)
        .reduce(|| vec![0u64; n], merge_counts)
}

fn merge_counts(mut a: Vec<u64>, b: Vec<u64>) -> Vec<u64> {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x += y;
    }
    a
}
