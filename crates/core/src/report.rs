//! Problem report aggregation and plain-text rendering.
//!
//! One report covers every tracked path against a single merge base, so all
//! per-file results are computed relative to the same ancestor.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::{DuplicateIdDetector, LineConflictDetector};
use crate::errors::{CoreError, GitError, WatchError};
use crate::git::RepositoryProvider;
use crate::models::{short_sha, Change, DiffPair, LineChange, LineChangePair};

const RULE: &str = "-----------------------------";

/// Consolidated result of one problem check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemReport {
    pub generated_at: DateTime<Utc>,
    /// `None` when local and remote share no ancestor; nothing was analysed.
    pub merge_base: Option<String>,
    pub conflicts: BTreeMap<String, Vec<LineChangePair>>,
    pub duplicate_ids: BTreeMap<String, BTreeSet<String>>,
    /// Paths missing from one of the trees and left out of the analysis.
    pub skipped_paths: Vec<String>,
}

impl ProblemReport {
    pub fn new(merge_base: Option<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            merge_base,
            conflicts: BTreeMap::new(),
            duplicate_ids: BTreeMap::new(),
            skipped_paths: Vec::new(),
        }
    }

    /// Run both detectors on one path and keep only non-empty results.
    pub fn analyze_path(&mut self, path: &str, diffs: &DiffPair, local_text: &str, remote_text: &str) {
        let (Some(local), Some(remote)) = (&diffs.local, &diffs.remote) else {
            debug!(path, "path untouched on one side, skipping");
            return;
        };

        let conflicts = LineConflictDetector::detect(local, remote);
        if !conflicts.is_empty() {
            self.conflicts.insert(path.to_string(), conflicts);
        }

        let duplicates = DuplicateIdDetector::detect(local_text, remote_text, local, remote);
        if !duplicates.is_empty() {
            self.duplicate_ids.insert(path.to_string(), duplicates);
        }
    }

    /// True when no conflicts or duplicate IDs were found.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.duplicate_ids.is_empty()
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts.values().map(Vec::len).sum()
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicate_ids.values().map(BTreeSet::len).sum()
    }
}

impl std::fmt::Display for ProblemReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&render_text(self))
    }
}

/// Build a [`ProblemReport`] for `paths` from the collaborator's current
/// local and remote tips.
///
/// A missing merge base yields an empty report with `merge_base = None`.
/// Paths missing from a tree are recorded in `skipped_paths`.
pub fn check_for_problems<P>(paths: &[String], provider: &P) -> Result<ProblemReport, CoreError>
where
    P: RepositoryProvider + ?Sized,
{
    let local_tip = provider.local_tip()?;
    let remote_tip = provider.remote_tip()?;

    let Some(base) = provider.merge_base(&local_tip, &remote_tip)? else {
        let err = WatchError::MergeBaseNotFound {
            local: short_sha(&local_tip).to_string(),
            remote: short_sha(&remote_tip).to_string(),
        };
        warn!(error = %err, "skipping conflict analysis");
        return Ok(ProblemReport::new(None));
    };

    let mut report = ProblemReport::new(Some(base.clone()));
    for path in paths {
        match collect_path(provider, &base, &local_tip, &remote_tip, path) {
            Ok(Some((diffs, local_text, remote_text))) => {
                report.analyze_path(path, &diffs, &local_text, &remote_text);
            }
            Ok(None) => debug!(path = %path, "no pending changes on both sides"),
            Err(GitError::PathNotFound { path: missing, commit }) => {
                warn!(path = %missing, commit = short_sha(&commit), "tracked path missing, skipping");
                report.skipped_paths.push(path.clone());
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        conflicts = report.conflict_count(),
        duplicates = report.duplicate_count(),
        "problem check complete"
    );
    Ok(report)
}

/// Diffs and full texts for one path, `None` when a side is untouched.
fn collect_path<P>(
    provider: &P,
    base: &str,
    local_tip: &str,
    remote_tip: &str,
    path: &str,
) -> Result<Option<(DiffPair, String, String)>, GitError>
where
    P: RepositoryProvider + ?Sized,
{
    let diffs = DiffPair {
        local: provider.line_diff(base, local_tip, path)?,
        remote: provider.line_diff(base, remote_tip, path)?,
    };
    if diffs.local.is_none() || diffs.remote.is_none() {
        return Ok(None);
    }
    let local_text = provider.full_text(local_tip, path)?;
    let remote_text = provider.full_text(remote_tip, path)?;
    Ok(Some((diffs, local_text, remote_text)))
}

/// Role of a rendered fragment, for renderers that colour their output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Success,
    Warning,
    Muted,
    Added,
    Deleted,
}

impl From<Change> for Tone {
    fn from(change: Change) -> Self {
        match change {
            Change::Added => Tone::Added,
            Change::Deleted => Tone::Deleted,
            Change::Unchanged => Tone::Plain,
        }
    }
}

/// Lay out a report line by line, passing each styled fragment through
/// `paint`.
pub fn render_with<F>(report: &ProblemReport, paint: F) -> String
where
    F: Fn(Tone, &str) -> String,
{
    let mut lines = Vec::new();

    if report.merge_base.is_none() {
        lines.push(paint(
            Tone::Warning,
            "Couldn't find a merge base between local and remote; no conflict analysis possible.",
        ));
        return finish(lines);
    }

    if report.is_clean() {
        lines.push(paint(Tone::Success, "No conflicting lines or duplicate IDs found."));
    }

    let rule = paint(Tone::Muted, RULE);
    let side = |change: &LineChange| {
        format!(
            "{} {}",
            paint(change.change.into(), change.change.marker()),
            change.line.content
        )
    };
    for (path, pairs) in &report.conflicts {
        lines.push(paint(
            Tone::Warning,
            &format!("Conflicting lines in {} ({}):", path, pairs.len()),
        ));
        lines.push(rule.clone());
        for pair in pairs {
            lines.push(format!("Index: {}", pair.number()));
            lines.push(format!("Local:  {}", side(&pair.local)));
            lines.push(format!("Remote: {}", side(&pair.remote)));
            lines.push(rule.clone());
        }
    }

    for (path, ids) in &report.duplicate_ids {
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        lines.push(paint(
            Tone::Warning,
            &format!("Duplicate IDs in {}: {}", path, ids.join(", ")),
        ));
    }

    for path in &report.skipped_paths {
        lines.push(paint(
            Tone::Muted,
            &format!("Skipped {}: not present in both trees", path),
        ));
    }

    finish(lines)
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Render a report as plain text for the decision prompt.
pub fn render_text(report: &ProblemReport) -> String {
    render_with(report, |_, text| text.to_string())
}
