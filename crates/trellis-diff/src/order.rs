//! Order reconciliation for siblings that stay under the same parent.
//!
//! Old positions are ranked and the rank sequences are diffed with the
//! `similar` crate's Myers algorithm. Its shortest edit script keeps a longest
//! common order-preserving subsequence in place; every other item has to move.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use similar::{capture_diff_slices, Algorithm, DiffOp};

/// The elements of `new` that lie on a longest subsequence common to `old`
/// and `new`.
///
/// Both slices are expected to hold the same set of distinct identities in
/// possibly different orders. An identity of `new` missing from `old` is
/// never stable. The result is deterministic for a given input.
pub fn stable_subsequence<'a, Id>(old: &[&'a Id], new: &[&'a Id]) -> HashSet<&'a Id>
where
    Id: Eq + Hash,
{
    let position: HashMap<&Id, usize> = old.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let old_ranks: Vec<usize> = (0..old.len()).collect();
    let new_ranks: Vec<usize> = new
        .iter()
        .enumerate()
        .map(|(i, id)| position.get(*id).copied().unwrap_or(old.len() + i))
        .collect();

    let mut stable = HashSet::with_capacity(new.len());
    for op in capture_diff_slices(Algorithm::Myers, &old_ranks, &new_ranks) {
        if let DiffOp::Equal { new_index, len, .. } = op {
            stable.extend(new[new_index..new_index + len].iter().copied());
        }
    }
    stable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable(old: &[&'static str], new: &[&'static str]) -> Vec<&'static str> {
        let old: Vec<&&str> = old.iter().collect();
        let new: Vec<&&str> = new.iter().collect();
        let set = stable_subsequence(&old, &new);
        let mut out: Vec<&str> = new.iter().filter(|id| set.contains(*id)).map(|id| **id).collect();
        out.dedup();
        out
    }

    #[test]
    fn identical_order_is_fully_stable() {
        assert_eq!(stable(&["a", "b", "c"], &["a", "b", "c"]), vec!["a", "b", "c"]);
    }

    #[test]
    fn single_item_moved_to_end() {
        let kept = stable(&["a", "b", "c", "d"], &["b", "c", "d", "a"]);
        assert_eq!(kept, vec!["b", "c", "d"]);
    }

    #[test]
    fn reversal_keeps_one() {
        let kept = stable(&["a", "b", "c", "d"], &["d", "c", "b", "a"]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn empty_input() {
        assert!(stable(&[], &[]).is_empty());
    }

    #[test]
    fn keeps_a_longest_subsequence() {
        let kept = stable(
            &["0", "1", "2", "3", "4", "5", "6", "7"],
            &["0", "1", "6", "4", "2", "5", "3", "7"],
        );
        assert_eq!(kept.len(), 5);
        assert!(kept.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn new_identity_is_never_stable() {
        assert_eq!(stable(&["a", "b"], &["a", "x", "b"]), vec!["a", "b"]);
    }

    #[test]
    fn swap_of_two_keeps_one() {
        assert_eq!(stable(&["x", "y"], &["y", "x"]).len(), 1);
    }
}
