//! Reciprocal rank fusion over any number of ranked id lists.

use std::collections::HashMap;
use std::hash::Hash;

/// Default RRF constant, from Cormack, Clarke & Buettcher (SIGIR 2009).
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Merge ranked lists into one ranking.
///
/// An item at 0-based rank `r` in a list earns `1 / (r + k)` from that list;
/// its fused score is the sum over all lists. Only positions matter, never
/// the retrievers' own scores.
///
/// Output is sorted by descending score. Equal scores keep first-seen order:
/// lists are walked in the order given, each from rank 0, so an item surfaced
/// by an earlier list (or higher in the same list) wins the tie.
pub fn reciprocal_rank_fusion<T>(lists: &[&[T]], k: f64) -> Vec<(T, f64)>
where
    T: Clone + Eq + Hash,
{
    let mut slots: HashMap<&T, usize> = HashMap::new();
    let mut fused: Vec<(T, f64)> = Vec::new();

    for list in lists {
        for (rank, item) in list.iter().enumerate() {
            let contribution = 1.0 / (rank as f64 + k);
            match slots.get(item) {
                Some(&slot) => fused[slot].1 += contribution,
                None => {
                    slots.insert(item, fused.len());
                    fused.push((item.clone(), contribution));
                }
            }
        }
    }

    // Stable sort: ties stay in first-seen order.
    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused
}

/// Fused ids only, best first.
pub fn fuse<T>(lists: &[&[T]], k: f64) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    reciprocal_rank_fusion(lists, k)
        .into_iter()
        .map(|(item, _)| item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_inputs() {
        let none: Vec<(String, f64)> = reciprocal_rank_fusion::<String>(&[], DEFAULT_RRF_K);
        assert!(none.is_empty());

        let empty: Vec<String> = Vec::new();
        assert!(fuse(&[&empty[..], &empty[..]], DEFAULT_RRF_K).is_empty());
    }

    #[test]
    fn test_single_list_preserves_order() {
        let a = ids(&["x", "y", "z"]);
        assert_eq!(fuse(&[&a[..]], DEFAULT_RRF_K), a);
    }

    #[test]
    fn test_scores_sum_reciprocal_ranks() {
        let keyword = ids(&["A", "B", "C"]);
        let vector = ids(&["B", "A", "D"]);
        let fused = reciprocal_rank_fusion(&[&keyword[..], &vector[..]], 60.0);

        let score = |id: &str| fused.iter().find(|(i, _)| i == id).map(|(_, s)| *s).unwrap();
        assert!((score("A") - (1.0 / 60.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert!((score("B") - (1.0 / 61.0 + 1.0 / 60.0)).abs() < 1e-12);
        assert!((score("C") - 1.0 / 62.0).abs() < 1e-12);
        assert!((score("D") - 1.0 / 62.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_break_by_first_seen_order() {
        let keyword = ids(&["A", "B", "C"]);
        let vector = ids(&["B", "A", "D"]);
        assert_eq!(
            fuse(&[&keyword[..], &vector[..]], 60.0),
            ids(&["A", "B", "C", "D"])
        );
        // Swapping list order swaps which list wins the ties.
        assert_eq!(
            fuse(&[&vector[..], &keyword[..]], 60.0),
            ids(&["B", "A", "D", "C"])
        );
    }

    #[test]
    fn test_items_in_more_lists_rank_higher() {
        let a = ids(&["1", "2", "3"]);
        let b = ids(&["1", "3", "5"]);
        let fused = fuse(&[&a[..], &b[..]], DEFAULT_RRF_K);
        assert_eq!(fused.len(), 4);
        assert_eq!(fused[0], "1");
        assert_eq!(fused[1], "3");
    }

    #[test]
    fn test_output_contains_only_input_items() {
        let a = ids(&["p", "q"]);
        let b = ids(&["r"]);
        let fused = fuse(&[&a[..], &b[..]], DEFAULT_RRF_K);
        let mut sorted = fused.clone();
        sorted.sort();
        assert_eq!(sorted, ids(&["p", "q", "r"]));
    }

    #[test]
    fn test_rank_only_ignores_retriever_scores() {
        // Same orderings, wildly different hidden scores: fusion sees only ids.
        let bm25: Vec<(String, f32)> = vec![("a".into(), 42.0), ("b".into(), 0.1)];
        let bm25_rescored: Vec<(String, f32)> = vec![("a".into(), 0.9), ("b".into(), 0.89)];
        let to_ids = |hits: &[(String, f32)]| hits.iter().map(|(i, _)| i.clone()).collect::<Vec<_>>();
        let vector = ids(&["b", "c"]);

        let first = reciprocal_rank_fusion(&[&to_ids(&bm25)[..], &vector[..]], 60.0);
        let second = reciprocal_rank_fusion(&[&to_ids(&bm25_rescored)[..], &vector[..]], 60.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_small_k_favours_single_top_rank() {
        let a = ids(&["p", "x", "y", "q"]);
        let b = ids(&["z1", "z2", "z3", "q"]);
        // k=1: p = 1, q = 2/4
        assert_eq!(fuse(&[&a[..], &b[..]], 1.0)[0], "p");
        // k=60: p = 1/60, q = 2/63
        assert_eq!(fuse(&[&a[..], &b[..]], 60.0)[0], "q");
    }

    #[test]
    fn test_works_with_non_string_ids() {
        let a = [3u32, 1, 2];
        let b = [1u32, 4];
        assert_eq!(fuse(&[&a[..], &b[..]], DEFAULT_RRF_K)[0], 1);
    }
}
