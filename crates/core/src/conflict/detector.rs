//! Line-position conflict detection.
//!
//! Given the local and remote diffs of one file against their merge base,
//! the detector finds every base line number that both sides touched.
//! Collisions are keyed by line number only: two sides diverging from the
//! same anchor line conflict even when their new content happens to match.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::models::{LineChange, LineChangePair, LineDiff};

/// Stateless detector for overlapping line changes.
pub struct LineConflictDetector;

impl LineConflictDetector {
    /// Return one pair per line number changed on both sides, ascending.
    ///
    /// A side without any change yields no conflicts.
    pub fn detect(local: &LineDiff, remote: &LineDiff) -> Vec<LineChangePair> {
        if local.is_empty() || remote.is_empty() {
            return Vec::new();
        }

        let local_changed = changed_by_number(local);
        let remote_changed = changed_by_number(remote);

        let conflicts: Vec<LineChangePair> = local_changed
            .into_iter()
            .filter_map(|(number, local)| {
                let remote = remote_changed.get(&number)?.clone();
                debug!(
                    line = number,
                    local = %local.change,
                    remote = %remote.change,
                    "line conflict"
                );
                Some(LineChangePair { local, remote })
            })
            .collect();

        if !conflicts.is_empty() {
            info!(count = conflicts.len(), "line conflicts detected");
        }
        conflicts
    }
}

/// Index a diff's changed lines by number, one line per number.
///
/// Added lines are indexed first, so an added line shadows a deleted line at
/// the same number and the first occurrence wins within each set.
fn changed_by_number(diff: &LineDiff) -> BTreeMap<u32, LineChange> {
    let mut changed = BTreeMap::new();
    for line in diff.added.iter().chain(diff.deleted.iter()) {
        changed.entry(line.number).or_insert_with(|| LineChange {
            line: line.clone(),
            change: diff.classify(line),
        });
    }
    changed
}
