//! Ordered list algebra
//!
//! Operations over ordered sequences of [`ListEntry`]:
//! - `sanitize`: resolve `~value` retractions in a single left-to-right pass
//! - `merge_records`: layer record lists without repeating base records
//! - `merge_lists` / `merge_lists_dedup`: concatenate in argument order,
//!   optionally keeping only the first occurrence, then sanitize
//! - `merge_maps`: per-key union, right-most argument wins

use std::collections::{BTreeMap, HashSet};

use crate::entry::ListEntry;

/// Resolve retraction markers.
///
/// Each `~target` at index `j` removes itself and the nearest entry before
/// `j` spelled exactly `target`. A retraction with no earlier match is
/// dropped on its own. Every retraction is matched against the input as
/// given, so several of them compose independently.
pub fn sanitize(entries: Vec<ListEntry>) -> Vec<ListEntry> {
    let mut dropped = vec![false; entries.len()];

    for (j, entry) in entries.iter().enumerate() {
        if let ListEntry::Retract(target) = entry {
            if let Some(i) = (0..j).rev().find(|&i| entries[i].is_spelled(target)) {
                dropped[i] = true;
            }
            dropped[j] = true;
        }
    }

    entries
        .into_iter()
        .zip(dropped)
        .filter_map(|(entry, drop)| (!drop).then_some(entry))
        .collect()
}

/// Keep every base record, then append the overlay records the base does
/// not already hold. Repeats within one layer are kept.
pub fn merge_records<T: Clone + PartialEq>(base: &[T], overlay: &[T]) -> Vec<T> {
    let mut out = base.to_vec();
    out.extend(overlay.iter().filter(|record| !base.contains(record)).cloned());
    out
}

/// Concatenate lists in argument order and sanitize the result.
pub fn merge_lists(lists: &[&[ListEntry]]) -> Vec<ListEntry> {
    sanitize(lists.iter().flat_map(|l| l.iter().cloned()).collect())
}

/// Concatenate lists, drop later duplicates, then sanitize.
pub fn merge_lists_dedup(lists: &[&[ListEntry]]) -> Vec<ListEntry> {
    let mut seen = HashSet::new();
    let all = lists
        .iter()
        .flat_map(|l| l.iter())
        .filter(|entry| seen.insert(*entry))
        .cloned()
        .collect();
    sanitize(all)
}

/// Union of all maps; on key conflicts the right-most map wins.
pub fn merge_maps<K, V>(maps: &[&BTreeMap<K, V>]) -> BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    let mut out = BTreeMap::new();
    for map in maps {
        for (k, v) in map.iter() {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

/// Apply `!value` markers to a list that is not a port list.
///
/// Every plain occurrence of an excluded value is removed along with the
/// marker itself; the order of surviving entries is kept.
pub fn apply_exclusions(entries: Vec<ListEntry>) -> Vec<ListEntry> {
    let excluded: HashSet<String> = entries
        .iter()
        .filter_map(|e| match e {
            ListEntry::Exclude(v) => Some(v.clone()),
            _ => None,
        })
        .collect();

    entries
        .into_iter()
        .filter(|e| match e {
            ListEntry::Plain(v) => !excluded.contains(v),
            _ => false,
        })
        .collect()
}

/// Fully resolve a general-purpose string list (DNS, NTP, kernel flags).
pub fn resolve_list(lists: &[&[ListEntry]]) -> Vec<ListEntry> {
    apply_exclusions(merge_lists_dedup(lists))
}

/// Split a whitespace-separated argument string into entries.
pub fn split_tokens(args: &str) -> Vec<ListEntry> {
    args.split_whitespace().map(ListEntry::parse).collect()
}

/// Join resolved entries back into an argument string.
pub fn join_tokens(entries: &[ListEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve several argument strings as one token list.
pub fn resolve_tokens(args: &[&str]) -> String {
    let lists: Vec<Vec<ListEntry>> = args.iter().map(|a| split_tokens(a)).collect();
    let slices: Vec<&[ListEntry]> = lists.iter().map(Vec::as_slice).collect();
    join_tokens(&resolve_list(&slices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::entries;
    use proptest::prelude::*;

    fn raw(list: &[ListEntry]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_sanitize_retracts_earlier_value() {
        assert_eq!(raw(&sanitize(entries(&["x", "~x"]))), Vec::<String>::new());
        assert_eq!(raw(&sanitize(entries(&["a", "x", "b", "~x"]))), vec!["a", "b"]);
    }

    #[test]
    fn test_sanitize_unmatched_marker_dropped() {
        assert_eq!(raw(&sanitize(entries(&["~x"]))), Vec::<String>::new());
        assert_eq!(raw(&sanitize(entries(&["a", "~x"]))), vec!["a"]);
    }

    #[test]
    fn test_sanitize_does_not_look_forward() {
        assert_eq!(raw(&sanitize(entries(&["~x", "x"]))), vec!["x"]);
    }

    #[test]
    fn test_sanitize_nearest_earlier_match() {
        let out = sanitize(entries(&["x", "y", "x", "~x"]));
        assert_eq!(raw(&out), vec!["x", "y"]);
    }

    #[test]
    fn test_sanitize_retractions_are_independent() {
        // Both markers see the same nearest "x"; the first "x" survives.
        let out = sanitize(entries(&["x", "x", "~x", "~x"]));
        assert_eq!(raw(&out), vec!["x"]);

        let out = sanitize(entries(&["a", "b", "~a", "~b", "c"]));
        assert_eq!(raw(&out), vec!["c"]);
    }

    #[test]
    fn test_sanitize_matches_exact_spelling() {
        let out = sanitize(entries(&["!80", "80", "~!80"]));
        assert_eq!(raw(&out), vec!["80"]);
    }

    #[test]
    fn test_merge_lists_keeps_duplicates() {
        let a = entries(&["x", "y"]);
        let b = entries(&["y", "z"]);
        assert_eq!(raw(&merge_lists(&[&a, &b])), vec!["x", "y", "y", "z"]);
    }

    #[test]
    fn test_merge_lists_overlay_retracts_base() {
        let a = entries(&["quiet", "debug"]);
        let b = entries(&["~quiet"]);
        assert_eq!(raw(&merge_lists(&[&a, &b])), vec!["debug"]);
    }

    #[test]
    fn test_merge_lists_dedup_first_wins() {
        let a = entries(&["8.8.8.8", "1.1.1.1"]);
        let b = entries(&["1.1.1.1", "9.9.9.9", "8.8.8.8"]);
        assert_eq!(
            raw(&merge_lists_dedup(&[&a, &b])),
            vec!["8.8.8.8", "1.1.1.1", "9.9.9.9"]
        );
    }

    #[test]
    fn test_merge_maps_right_most_wins() {
        let a = BTreeMap::from([("k1", "a"), ("k2", "a")]);
        let b = BTreeMap::from([("k2", "b"), ("k3", "b")]);
        let out = merge_maps(&[&a, &b]);
        assert_eq!(out.len(), 3);
        assert_eq!(out["k1"], "a");
        assert_eq!(out["k2"], "b");
        assert_eq!(out["k3"], "b");
    }

    #[test]
    fn test_apply_exclusions() {
        let out = apply_exclusions(entries(&["a", "b", "a", "!a", "c"]));
        assert_eq!(raw(&out), vec!["b", "c"]);
    }

    #[test]
    fn test_resolve_tokens() {
        assert_eq!(
            resolve_tokens(&["console=ttyS0 quiet", "~quiet loglevel=7"]),
            "console=ttyS0 loglevel=7"
        );
        assert_eq!(resolve_tokens(&["a  b", "a"]), "a b");
        assert_eq!(resolve_tokens(&["", ""]), "");
    }

    #[test]
    fn test_resolve_tokens_keeps_distinct_repeated_keys() {
        assert_eq!(
            resolve_tokens(&["console=tty0 quiet", "console=ttyS0 quiet"]),
            "console=tty0 quiet console=ttyS0"
        );
        assert_eq!(
            resolve_tokens(&["console=tty0 console=ttyS0", "~console=tty0"]),
            "console=ttyS0"
        );
    }

    #[test]
    fn test_merge_records_keeps_base_repeats() {
        assert_eq!(merge_records(&[3, 1, 3], &[2, 1, 4]), vec![3, 1, 3, 2, 4]);
        assert_eq!(merge_records(&[3, 3], &[3, 3]), vec![3, 3]);
        assert_eq!(merge_records::<i32>(&[], &[5, 5]), vec![5, 5]);
    }

    fn entry_strategy() -> impl Strategy<Value = ListEntry> {
        ("[~!]?", "[a-d]").prop_map(|(marker, value)| ListEntry::parse(&format!("{marker}{value}")))
    }

    proptest! {
        #[test]
        fn test_sanitize_idempotent(list in prop::collection::vec(entry_strategy(), 0..16)) {
            let once = sanitize(list);
            let twice = sanitize(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn test_sanitize_leaves_no_retractions(list in prop::collection::vec(entry_strategy(), 0..16)) {
            let out = sanitize(list);
            prop_assert!(out.iter().all(|e| !matches!(e, ListEntry::Retract(_))));
        }

        #[test]
        fn test_merge_records_with_self_is_identity(records in prop::collection::vec(0u8..4, 0..12)) {
            prop_assert_eq!(merge_records(&records, &records), records);
        }

        #[test]
        fn test_merge_records_reapplied_overlay_changes_nothing(
            base in prop::collection::vec(0u8..4, 0..8),
            overlay in prop::collection::vec(0u8..4, 0..8),
        ) {
            let once = merge_records(&base, &overlay);
            prop_assert_eq!(merge_records(&once, &overlay), once);
        }
    }
}
