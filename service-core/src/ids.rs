//! Id helpers shared by the entity managers.

use uuid::Uuid;

/// Generate a fresh entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Remove duplicate ids, preserving first-seen order.
pub fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

/// Symmetric difference between an old and a new reference list.
///
/// Returns `(added, removed)`: ids present only in `new` and ids present only
/// in `old`, independent of input ordering.
pub fn added_and_removed(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let added = new.iter().filter(|id| !old.contains(id)).cloned().collect();
    let removed = old.iter().filter(|id| !new.contains(id)).cloned().collect();
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedup_preserves_order() {
        assert_eq!(
            dedup_ids(&ids(&["b", "a", "b", "c", "a"])),
            ids(&["b", "a", "c"])
        );
    }

    #[test]
    fn dedup_of_empty_is_empty() {
        assert!(dedup_ids(&[]).is_empty());
    }

    #[test]
    fn diff_computes_added_and_removed() {
        let (added, removed) = added_and_removed(&ids(&["a", "b", "c"]), &ids(&["b", "c", "d"]));
        assert_eq!(added, ids(&["d"]));
        assert_eq!(removed, ids(&["a"]));
    }

    #[test]
    fn diff_is_order_independent() {
        let (added, removed) = added_and_removed(&ids(&["c", "a", "b"]), &ids(&["d", "c", "b"]));
        assert_eq!(added, ids(&["d"]));
        assert_eq!(removed, ids(&["a"]));
    }

    #[test]
    fn diff_against_empty_lists() {
        let (added, removed) = added_and_removed(&[], &ids(&["x"]));
        assert_eq!(added, ids(&["x"]));
        assert!(removed.is_empty());

        let (added, removed) = added_and_removed(&ids(&["x"]), &[]);
        assert!(added.is_empty());
        assert_eq!(removed, ids(&["x"]));
    }
}
