//! Semantic-ID collision detection.
//!
//! Records are lines of the form `ID;rest`. Two sides can insert different
//! records with the same ID at different positions; the line detector never
//! sees those, but merging them verbatim yields a duplicate key. A line added
//! on one side is checked against every line of the other side's current
//! file, not only against the other side's additions.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::models::{semantic_id, LineDiff};

/// Stateless detector for duplicate semantic IDs.
pub struct DuplicateIdDetector;

impl DuplicateIdDetector {
    /// IDs added on one side that already exist in the other side's file.
    pub fn detect(
        local_text: &str,
        remote_text: &str,
        local: &LineDiff,
        remote: &LineDiff,
    ) -> BTreeSet<String> {
        let mut duplicates = colliding_ids(remote_text, local);
        duplicates.extend(colliding_ids(local_text, remote));

        if !duplicates.is_empty() {
            info!(count = duplicates.len(), "duplicate IDs detected");
        }
        duplicates
    }
}

/// IDs of `added` lines in `diff` that also occur anywhere in `other_text`.
fn colliding_ids(other_text: &str, diff: &LineDiff) -> BTreeSet<String> {
    let existing: HashSet<&str> = other_text.lines().map(semantic_id).collect();

    diff.added
        .iter()
        .map(|line| line.semantic_id())
        .filter(|id| existing.contains(id))
        .inspect(|id| debug!(id, "semantic ID collision"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Line;

    fn added(entries: &[(u32, &str)]) -> LineDiff {
        LineDiff::new(
            entries.iter().map(|(n, c)| Line::new(*n, *c)).collect(),
            vec![],
        )
    }

    #[test]
    fn test_independent_inserts_with_same_id() {
        let local = added(&[(1, "7;foo")]);
        let remote = added(&[(9, "7;bar")]);
        let local_text = "7;foo\n";
        let remote_text = "1;a\n2;b\n3;c\n4;d\n5;e\n6;f\n7;g\n8;h\n7;bar\n";

        let ids = DuplicateIdDetector::detect(local_text, remote_text, &local, &remote);
        assert_eq!(ids, BTreeSet::from(["7".to_string()]));
    }

    #[test]
    fn test_addition_against_existing_line() {
        let local = added(&[(3, "12;new")]);
        let remote = added(&[(1, "99;other")]);
        let ids = DuplicateIdDetector::detect("", "99;other\n12;old\n", &local, &remote);
        assert_eq!(ids, BTreeSet::from(["12".to_string()]));
    }

    #[test]
    fn test_distinct_ids_are_clean() {
        let local = added(&[(1, "1;a")]);
        let remote = added(&[(2, "2;b")]);
        let ids = DuplicateIdDetector::detect("1;a\n", "2;b\n", &local, &remote);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_symmetric_under_label_swap() {
        let a = added(&[(1, "5;x"), (4, "6;y")]);
        let b = added(&[(2, "6;z"), (3, "8;w")]);
        let a_text = "5;x\n3;q\n8;old\n6;y\n";
        let b_text = "1;p\n6;z\n8;w\n";

        let forward = DuplicateIdDetector::detect(a_text, b_text, &a, &b);
        let swapped = DuplicateIdDetector::detect(b_text, a_text, &b, &a);
        assert_eq!(forward, swapped);
        assert_eq!(
            forward,
            BTreeSet::from(["6".to_string(), "8".to_string()])
        );
    }

    #[test]
    fn test_line_without_delimiter_uses_whole_content() {
        let local = added(&[(1, "header")]);
        let remote = added(&[(1, "other")]);
        let ids = DuplicateIdDetector::detect("", "header\nother\n", &local, &remote);
        assert_eq!(ids, BTreeSet::from(["header".to_string()]));
    }

    #[test]
    fn test_crlf_text_is_split_cleanly() {
        let local = added(&[(2, "3;c")]);
        let ids = DuplicateIdDetector::detect("", "1;a\r\n3;b\r\n", &local, &LineDiff::default());
        assert_eq!(ids, BTreeSet::from(["3".to_string()]));
    }
}
