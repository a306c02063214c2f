//! Per-path memory of the last remote state shown to the user.
//!
//! The watermark is the cheap pre-filter in front of the line-level
//! detectors: a remote blob hash that was already surfaced never triggers a
//! second notification, whether or not the user merged it.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::errors::WatchError;

/// Tracked path → blob hash at some commit.
pub type HashSnapshot = HashMap<String, String>;

/// Remembers, per tracked path, the last remote hash already presented.
#[derive(Debug, Clone)]
pub struct WatermarkTracker {
    paths: Vec<String>,
    marks: HashMap<String, String>,
}

impl WatermarkTracker {
    /// Seed the watermark from a snapshot of the remote tip.
    ///
    /// Every tracked path must be present in `remote`.
    pub fn initialize(
        paths: &[String],
        remote: &HashSnapshot,
        remote_commit: &str,
    ) -> Result<Self, WatchError> {
        let mut marks = HashMap::with_capacity(paths.len());
        for path in paths {
            let hash = remote.get(path).ok_or_else(|| WatchError::PathNotFound {
                path: path.clone(),
                commit: remote_commit.to_string(),
            })?;
            marks.insert(path.clone(), hash.clone());
        }
        debug!(paths = paths.len(), "watermark initialized");
        Ok(Self {
            paths: paths.to_vec(),
            marks,
        })
    }

    /// Tracked paths, in tracking order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Last remote hash surfaced for `path`.
    pub fn watermark(&self, path: &str) -> Option<&str> {
        self.marks.get(path).map(String::as_str)
    }

    /// True when some tracked path has a remote hash that is both new since
    /// the watermark and different from the local hash.
    ///
    /// Stops at the first such path. Paths missing from `remote` are skipped.
    pub fn has_changed(&self, local: &HashSnapshot, remote: &HashSnapshot) -> bool {
        for path in &self.paths {
            let Some(remote_hash) = remote.get(path) else {
                debug!(path = %path, "path missing from remote snapshot, skipping");
                continue;
            };
            let unseen = self.watermark(path) != Some(remote_hash.as_str());
            let diverged = local.get(path) != Some(remote_hash);
            if unseen && diverged {
                debug!(path = %path, "remote change detected");
                return true;
            }
        }
        false
    }

    /// Move every tracked path's watermark to its hash in `remote`.
    pub fn advance(&mut self, remote: &HashSnapshot) {
        for path in &self.paths {
            match remote.get(path) {
                Some(hash) => {
                    self.marks.insert(path.clone(), hash.clone());
                }
                None => warn!(path = %path, "cannot advance watermark, path missing from remote"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, &str)]) -> HashSnapshot {
        entries
            .iter()
            .map(|(p, h)| (p.to_string(), h.to_string()))
            .collect()
    }

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_initialize_requires_every_path() {
        let result = WatermarkTracker::initialize(
            &paths(&["a.txt", "b.txt"]),
            &snapshot(&[("a.txt", "h1")]),
            "remote",
        );
        assert!(matches!(
            result,
            Err(WatchError::PathNotFound { ref path, .. }) if path == "b.txt"
        ));
    }

    #[test]
    fn test_unchanged_remote_is_not_new() {
        let remote = snapshot(&[("a.txt", "r1")]);
        let tracker = WatermarkTracker::initialize(&paths(&["a.txt"]), &remote, "r").unwrap();
        assert!(!tracker.has_changed(&snapshot(&[("a.txt", "l1")]), &remote));
    }

    #[test]
    fn test_new_remote_hash_detected() {
        let tracker = WatermarkTracker::initialize(
            &paths(&["a.txt"]),
            &snapshot(&[("a.txt", "r1")]),
            "r",
        )
        .unwrap();
        let local = snapshot(&[("a.txt", "r1")]);
        let remote = snapshot(&[("a.txt", "r2")]);
        assert!(tracker.has_changed(&local, &remote));
    }

    #[test]
    fn test_local_already_matches_remote() {
        let tracker = WatermarkTracker::initialize(
            &paths(&["a.txt"]),
            &snapshot(&[("a.txt", "r1")]),
            "r",
        )
        .unwrap();
        let current = snapshot(&[("a.txt", "r2")]);
        assert!(!tracker.has_changed(&current, &current));
    }

    #[test]
    fn test_advance_suppresses_same_state() {
        let mut tracker = WatermarkTracker::initialize(
            &paths(&["a.txt", "b.txt"]),
            &snapshot(&[("a.txt", "r1"), ("b.txt", "s1")]),
            "r",
        )
        .unwrap();
        let local = snapshot(&[("a.txt", "r1"), ("b.txt", "s1")]);
        let remote = snapshot(&[("a.txt", "r1"), ("b.txt", "s2")]);
        assert!(tracker.has_changed(&local, &remote));

        tracker.advance(&remote);
        assert!(!tracker.has_changed(&local, &remote));
        assert_eq!(tracker.watermark("b.txt"), Some("s2"));

        let moved_again = snapshot(&[("a.txt", "r1"), ("b.txt", "s3")]);
        assert!(tracker.has_changed(&local, &moved_again));
    }

    #[test]
    fn test_missing_remote_path_is_skipped() {
        let mut tracker = WatermarkTracker::initialize(
            &paths(&["a.txt", "b.txt"]),
            &snapshot(&[("a.txt", "r1"), ("b.txt", "s1")]),
            "r",
        )
        .unwrap();
        let remote = snapshot(&[("b.txt", "s1")]);
        assert!(!tracker.has_changed(&snapshot(&[]), &remote));

        tracker.advance(&remote);
        assert_eq!(tracker.watermark("a.txt"), Some("r1"));
    }
}
