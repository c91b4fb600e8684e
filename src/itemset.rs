use std::fmt;

use serde::Serialize;

/// A duplicate-free set of items held in canonical (sorted) order, so that two
/// itemsets with the same members compare equal and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Itemset<I>(Vec<I>);

impl<I: Ord> Itemset<I> {
    pub fn new(items: impl IntoIterator<Item = I>) -> Self {
        let mut items: Vec<I> = items.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Itemset(items)
    }

    /// Caller guarantees `items` is strictly increasing.
    pub(crate) fn from_sorted(items: Vec<I>) -> Self {
        debug_assert!(items.windows(2).all(|w| w[0] < w[1]));
        Itemset(items)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn items(&self) -> &[I] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, I> {
        self.0.iter()
    }

    pub fn contains(&self, item: &I) -> bool {
        self.0.binary_search(item).is_ok()
    }

    pub fn is_disjoint(&self, other: &Itemset<I>) -> bool {
        !self.0.iter().any(|item| other.contains(item))
    }

    pub fn union(&self, other: &Itemset<I>) -> Itemset<I>
    where
        I: Clone,
    {
        Itemset::new(self.0.iter().chain(other.0.iter()).cloned())
    }

    pub fn into_vec(self) -> Vec<I> {
        self.0
    }
}

impl<I: Ord> FromIterator<I> for Itemset<I> {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Itemset::new(iter)
    }
}

impl<'a, I> IntoIterator for &'a Itemset<I> {
    type Item = &'a I;
    type IntoIter = std::slice::Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<I: fmt::Display> fmt::Display for Itemset<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("}")
    }
}

/// Elements of sorted `all` that are not in sorted `part`.
pub(crate) fn sorted_difference<T: Ord + Copy>(all: &[T], part: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(all.len().saturating_sub(part.len()));
    let mut j = 0;
    for &x in all {
        while j < part.len() && part[j] < x {
            j += 1;
        }
        if j < part.len() && part[j] == x {
            continue;
        }
        out.push(x);
    }
    out
}

/// Lexicographic `size`-combinations of `items`, in index order.
pub(crate) fn combinations<T: Copy>(items: &[T], size: usize) -> impl Iterator<Item = Vec<T>> + '_ {
    let n = items.len();
    let mut indices: Vec<usize> = (0..size).collect();
    let mut first = true;

    std::iter::from_fn(move || {
        if size == 0 || n < size {
            return None;
        }
        if first {
            first = false;
        } else {
            let mut i = size as isize - 1;
            while i >= 0 {
                if indices[i as usize] < n - size + i as usize {
                    break;
                }
                i -= 1;
            }
            if i < 0 {
                return None;
            }
            let idx = i as usize;
            indices[idx] += 1;
            for j in (idx + 1)..size {
                indices[j] = indices[j - 1] + 1;
            }
        }
        Some(indices.iter().map(|&i| items[i]).collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_ignores_order_and_duplicates() {
        let a = Itemset::new(["b", "a", "b", "c"]);
        let b: Itemset<&str> = ["c", "a", "b"].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.items(), &["a", "b", "c"]);
    }

    #[test]
    fn ordering_is_lexicographic_over_members() {
        let a = Itemset::new(["A"]);
        let ab = Itemset::new(["A", "B"]);
        let b = Itemset::new(["B"]);
        assert!(a < ab);
        assert!(ab < b);
    }

    #[test]
    fn disjoint_and_union() {
        let ab = Itemset::new([1, 2]);
        let abc = Itemset::new([1, 2, 3]);
        let d = Itemset::new([4]);
        assert!(ab.contains(&2));
        assert!(!ab.contains(&3));
        assert!(ab.is_disjoint(&d));
        assert!(!ab.is_disjoint(&abc));
        assert_eq!(ab.union(&d), Itemset::new([1, 2, 4]));
    }

    #[test]
    fn display_lists_members() {
        assert_eq!(Itemset::new(["Sprite", "Fanta"]).to_string(), "{Fanta, Sprite}");
    }

    #[test]
    fn combinations_enumerate_in_index_order() {
        let got: Vec<Vec<u32>> = combinations(&[1, 2, 3, 4], 2).collect();
        assert_eq!(
            got,
            vec![vec![1, 2], vec![1, 3], vec![1, 4], vec![2, 3], vec![2, 4], vec![3, 4]]
        );
        assert_eq!(combinations(&[1, 2], 3).count(), 0);
        assert_eq!(combinations(&[1, 2], 0).count(), 0);
        assert_eq!(combinations(&[7, 8, 9], 3).collect::<Vec<_>>(), vec![vec![7, 8, 9]]);
    }

    #[test]
    fn difference_of_sorted_slices() {
        assert_eq!(sorted_difference(&[1, 2, 3, 5], &[2, 5]), vec![1, 3]);
        assert_eq!(sorted_difference(&[1, 2], &[]), vec![1, 2]);
    }
}
