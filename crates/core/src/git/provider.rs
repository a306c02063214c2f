//! The repository collaborator consumed by the watch session.
//!
//! Commits are identified by their hex SHA. Implementations own transport,
//! credentials, and diff computation; the session and detectors only consume
//! what this trait returns.

use crate::errors::GitError;
use crate::models::{LineDiff, MergeOutcome};

/// Operations the watch session needs from a version-control backend.
pub trait RepositoryProvider {
    /// Commit at the tip of the local branch.
    fn local_tip(&self) -> Result<String, GitError>;

    /// Commit at the tip of the remote tracking branch.
    fn remote_tip(&self) -> Result<String, GitError>;

    /// Nearest common ancestor of two commits, if any.
    fn merge_base(&self, local: &str, remote: &str) -> Result<Option<String>, GitError>;

    /// Line diff of `path` from `base` to `target`, `None` when unchanged.
    fn line_diff(&self, base: &str, target: &str, path: &str)
        -> Result<Option<LineDiff>, GitError>;

    /// Full text of `path` at `commit`.
    fn full_text(&self, commit: &str, path: &str) -> Result<String, GitError>;

    /// Opaque content hash of `path` at `commit`.
    fn content_hash(&self, commit: &str, path: &str) -> Result<String, GitError>;

    /// Update the remote tracking branch from the remote.
    fn fetch(&self) -> Result<(), GitError>;

    /// Merge the remote tracking branch into the local branch, taking lines
    /// from both sides where they overlap.
    fn pull_merge(&self) -> Result<MergeOutcome, GitError>;

    /// Push the local branch to the remote.
    fn push(&self) -> Result<(), GitError>;

    /// Commit the given paths. Returns `None` when there was nothing to commit.
    fn commit(&self, paths: &[String], message: &str) -> Result<Option<String>, GitError>;
}
