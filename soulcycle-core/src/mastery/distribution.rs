//! Exact integer apportionment (largest-remainder method).
//!
//! `total` units are split across weighted keys so the parts always sum to
//! `total`. Each key first gets `floor(total * w / W)`; the leftover units go
//! one each to the keys with the largest fractional remainders. Remainders
//! share the denominator `W`, so they are compared as exact integers. Ties
//! keep the order in which keys appear in `weights`.

/// Split `total` across `weights` (in first-seen order).
///
/// Zero-weight keys get nothing. When the total weight is zero the entire
/// amount goes to `fallback`. Returns `(key, amount)` pairs in the order of
/// `weights`; a zero `total` yields an empty list.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn distribute_exact<K: Clone>(total: u64, weights: &[(K, u64)], fallback: K) -> Vec<(K, u64)> {
    if total == 0 {
        return Vec::new();
    }

    let total_weight: u128 = weights.iter().map(|(_, w)| u128::from(*w)).sum();
    if total_weight == 0 {
        return vec![(fallback, total)];
    }

    let mut out: Vec<(K, u64)> = Vec::with_capacity(weights.len());
    // (index into `out`, remainder numerator)
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(weights.len());
    let mut used: u64 = 0;

    for (key, w) in weights.iter().filter(|(_, w)| *w > 0) {
        let scaled = u128::from(total) * u128::from(*w);
        // scaled / total_weight <= total, so it fits back into u64.
        let base = (scaled / total_weight) as u64;
        used += base;
        remainders.push((out.len(), scaled % total_weight));
        out.push((key.clone(), base));
    }

    // Stable: equal remainders stay in first-seen order.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));

    let mut leftover = total - used;
    let mut i = 0;
    while leftover > 0 && !remainders.is_empty() {
        let idx = remainders[i % remainders.len()].0;
        out[idx].1 += 1;
        leftover -= 1;
        i += 1;
    }
    out
}

/// Accumulate weights per key, preserving the order keys are first seen.
pub fn accumulate<K: PartialEq>(weights: &mut Vec<(K, u64)>, key: K, amount: u64) {
    if let Some(entry) = weights.iter_mut().find(|(k, _)| *k == key) {
        entry.1 = entry.1.saturating_add(amount);
    } else {
        weights.push((key, amount));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(parts: &[(&str, u64)]) -> u64 {
        parts.iter().map(|(_, v)| v).sum()
    }

    #[test]
    fn splits_proportionally() {
        let parts = distribute_exact(30, &[("a", 2), ("b", 1)], "z");
        assert_eq!(parts, vec![("a", 20), ("b", 10)]);
    }

    #[test]
    fn leftover_goes_to_largest_remainder() {
        // 10 * 2/3 = 6.67, 10 * 1/3 = 3.33 -> a gets the spare unit.
        let parts = distribute_exact(10, &[("a", 2), ("b", 1)], "z");
        assert_eq!(parts, vec![("a", 7), ("b", 3)]);
        assert_eq!(sum(&parts), 10);
    }

    #[test]
    fn ties_break_by_first_seen() {
        let parts = distribute_exact(1, &[("b", 1), ("a", 1)], "z");
        assert_eq!(parts, vec![("b", 1), ("a", 0)]);
        let parts = distribute_exact(2, &[("c", 1), ("a", 1), ("b", 1)], "z");
        assert_eq!(parts, vec![("c", 1), ("a", 1), ("b", 0)]);
    }

    #[test]
    fn zero_weights_use_fallback() {
        assert_eq!(distribute_exact(9, &[("a", 0)], "z"), vec![("z", 9)]);
        assert_eq!(distribute_exact(9, &[], "z"), vec![("z", 9)]);
    }

    #[test]
    fn zero_total_is_empty() {
        assert!(distribute_exact(0, &[("a", 4)], "z").is_empty());
    }

    #[test]
    fn zero_weight_keys_are_skipped() {
        let parts = distribute_exact(5, &[("a", 0), ("b", 3)], "z");
        assert_eq!(parts, vec![("b", 5)]);
    }

    #[test]
    fn accumulate_preserves_first_seen_order() {
        let mut w = Vec::new();
        accumulate(&mut w, "b", 1);
        accumulate(&mut w, "a", 2);
        accumulate(&mut w, "b", 3);
        assert_eq!(w, vec![("b", 4), ("a", 2)]);
    }
}
