//! The watch session: one repository, one tracked-path set, one watermark.
//!
//! A session is an explicit context object. Several sessions can run side by
//! side against different repositories, and tests drive one with an
//! in-memory collaborator.

use tracing::{debug, info, warn};

use crate::errors::{CoreError, GitError, WatchError};
use crate::git::RepositoryProvider;
use crate::models::{short_sha, Decision, MergeOutcome};
use crate::report::{self, ProblemReport};
use crate::watermark::{HashSnapshot, WatermarkTracker};

/// Default commit message template; `{paths}` lists the tracked paths.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Committed local {paths} changes";

/// Hashes of one tracked path, for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathState {
    pub path: String,
    pub local: Option<String>,
    pub remote: Option<String>,
    pub watermark: Option<String>,
}

impl PathState {
    /// Remote differs from local and has not been shown yet.
    pub fn is_pending(&self) -> bool {
        self.remote.is_some() && self.remote != self.local && self.remote != self.watermark
    }
}

/// Watches a set of paths in one repository.
pub struct WatchSession<P: RepositoryProvider> {
    provider: P,
    tracker: WatermarkTracker,
    commit_message: String,
}

impl<P: RepositoryProvider> WatchSession<P> {
    /// Seed the watermark from the current remote tip.
    ///
    /// Fails with [`WatchError::PathNotFound`] when a tracked path is absent
    /// from the remote tree.
    pub fn initialize(provider: P, paths: Vec<String>) -> Result<Self, CoreError> {
        let remote_tip = provider.remote_tip()?;
        let mut remote = HashSnapshot::with_capacity(paths.len());
        for path in &paths {
            match provider.content_hash(&remote_tip, path) {
                Ok(hash) => {
                    remote.insert(path.clone(), hash);
                }
                Err(GitError::PathNotFound { .. }) => {
                    return Err(WatchError::PathNotFound {
                        path: path.clone(),
                        commit: remote_tip,
                    }
                    .into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        let tracker = WatermarkTracker::initialize(&paths, &remote, &remote_tip)?;
        info!(
            paths = paths.len(),
            remote = short_sha(&remote_tip),
            "watch session initialized"
        );
        Ok(Self {
            provider,
            tracker,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        })
    }

    /// Message template for commits made before merging.
    pub fn with_commit_message(mut self, template: impl Into<String>) -> Self {
        self.commit_message = template.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn paths(&self) -> &[String] {
        self.tracker.paths()
    }

    pub fn tracker(&self) -> &WatermarkTracker {
        &self.tracker
    }

    /// Update the remote tracking branch.
    pub fn fetch(&self) -> Result<(), WatchError> {
        self.provider
            .fetch()
            .map_err(|e| WatchError::external("fetch", e))
    }

    /// True when the remote moved to a state not yet shown to the user and
    /// not already merged locally.
    pub fn has_changed(&self) -> Result<bool, CoreError> {
        let local = self.snapshot(&self.provider.local_tip()?)?;
        let remote = self.snapshot(&self.provider.remote_tip()?)?;
        Ok(self.tracker.has_changed(&local, &remote))
    }

    /// Run both detectors over every tracked path.
    pub fn check_for_problems(&self) -> Result<ProblemReport, CoreError> {
        report::check_for_problems(self.paths(), &self.provider)
    }

    /// Act on the user's decision.
    ///
    /// Accepting commits the tracked paths, merges the remote branch and
    /// pushes. Push runs for every outcome except conflicts, so local
    /// commits ahead of the remote are published even when there is nothing
    /// to merge. Declining returns [`WatchError::UserDeclined`].
    pub fn apply_decision(&self, decision: Decision) -> Result<MergeOutcome, WatchError> {
        if decision == Decision::Decline {
            info!("merge declined");
            return Err(WatchError::UserDeclined);
        }

        let message = self.commit_message.replace("{paths}", &self.paths().join(", "));
        match self
            .provider
            .commit(self.paths(), &message)
            .map_err(|e| WatchError::external("commit", e))?
        {
            Some(sha) => info!(sha = short_sha(&sha), "committed local changes"),
            None => debug!("no local changes to commit"),
        }

        let outcome = self
            .provider
            .pull_merge()
            .map_err(|e| WatchError::external("pull", e))?;

        match &outcome {
            MergeOutcome::Conflicts { paths } => {
                warn!(
                    ?paths,
                    "conflicts detected, merge aborted; merge manually and re-run"
                );
            }
            _ => {
                self.provider
                    .push()
                    .map_err(|e| WatchError::external("push", e))?;
                info!(%outcome, "pushed");
            }
        }
        Ok(outcome)
    }

    /// Move the watermark to the current remote state.
    pub fn advance(&mut self) -> Result<(), CoreError> {
        let remote = self.snapshot(&self.provider.remote_tip()?)?;
        self.tracker.advance(&remote);
        debug!("watermark advanced");
        Ok(())
    }

    /// Per-path local, remote and watermark hashes.
    pub fn pending_paths(&self) -> Result<Vec<PathState>, CoreError> {
        let local = self.snapshot(&self.provider.local_tip()?)?;
        let remote = self.snapshot(&self.provider.remote_tip()?)?;
        Ok(self
            .paths()
            .iter()
            .map(|path| PathState {
                path: path.clone(),
                local: local.get(path).cloned(),
                remote: remote.get(path).cloned(),
                watermark: self.tracker.watermark(path).map(str::to_string),
            })
            .collect())
    }

    /// Hashes of every tracked path at `commit`, skipping missing paths.
    fn snapshot(&self, commit: &str) -> Result<HashSnapshot, GitError> {
        let mut hashes = HashSnapshot::with_capacity(self.paths().len());
        for path in self.paths() {
            match self.provider.content_hash(commit, path) {
                Ok(hash) => {
                    hashes.insert(path.clone(), hash);
                }
                Err(GitError::PathNotFound { .. }) => {
                    debug!(path = %path, commit = short_sha(commit), "path missing from tree");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Line, LineDiff};
    use crate::testing::MemoryRepository;

    const PATH: &str = "records.txt";

    fn paths() -> Vec<String> {
        vec![PATH.to_string()]
    }

    /// base → local (l1) and remote (r1), both touching line 5.
    fn diverged_repo() -> MemoryRepository {
        let repo = MemoryRepository::new();
        repo.add_commit("base", &[(PATH, "42;apple\n")])
            .add_commit("l1", &[(PATH, "42;banana\n")])
            .add_commit("r1", &[(PATH, "42;cherry\n")])
            .set_local_tip("l1")
            .set_remote_tip("base")
            .set_merge_base(Some("base"))
            .set_diff(
                "base",
                "l1",
                PATH,
                LineDiff::new(vec![Line::new(5, "42;banana")], vec![]),
            )
            .set_diff(
                "base",
                "r1",
                PATH,
                LineDiff::new(vec![Line::new(5, "42;cherry")], vec![]),
            );
        repo
    }

    #[test]
    fn test_initialize_rejects_missing_path() {
        let repo = MemoryRepository::new();
        repo.add_commit("base", &[("other.txt", "x\n")])
            .set_remote_tip("base");
        let result = WatchSession::initialize(repo, paths());
        assert!(matches!(
            result,
            Err(CoreError::Watch(WatchError::PathNotFound { ref path, .. })) if path == PATH
        ));
    }

    #[test]
    fn test_change_then_advance_suppresses() {
        let repo = diverged_repo();
        let mut session = WatchSession::initialize(repo, paths()).unwrap();
        assert!(!session.has_changed().unwrap());

        session.provider().publish_remote("r1");
        session.fetch().unwrap();
        assert!(session.has_changed().unwrap());

        session.advance().unwrap();
        assert!(!session.has_changed().unwrap());
    }

    #[test]
    fn test_check_for_problems_reports_line_conflict() {
        let repo = diverged_repo();
        repo.set_remote_tip("r1");
        let session = WatchSession::initialize(repo, paths()).unwrap();

        let report = session.check_for_problems().unwrap();
        let pairs = &report.conflicts[PATH];
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].number(), 5);
        assert_eq!(report.duplicate_ids[PATH].len(), 1);
    }

    #[test]
    fn test_missing_merge_base_gives_empty_report() {
        let repo = diverged_repo();
        repo.set_remote_tip("r1").set_merge_base(None);
        let session = WatchSession::initialize(repo, paths()).unwrap();

        let report = session.check_for_problems().unwrap();
        assert!(report.merge_base.is_none());
        assert!(report.is_clean());
    }

    #[test]
    fn test_decline_does_not_touch_repository() {
        let session = WatchSession::initialize(diverged_repo(), paths()).unwrap();
        let result = session.apply_decision(Decision::Decline);
        assert!(matches!(result, Err(WatchError::UserDeclined)));
        assert!(session.provider().calls().is_empty());
    }

    #[test]
    fn test_accept_commits_merges_and_pushes() {
        let repo = diverged_repo();
        repo.set_remote_tip("r1");
        let session = WatchSession::initialize(repo, paths()).unwrap();

        let outcome = session.apply_decision(Decision::Accept).unwrap();
        assert_eq!(outcome, MergeOutcome::FastForward { sha: "r1".into() });
        assert_eq!(session.provider().calls(), vec!["commit", "pull", "push"]);
    }

    #[test]
    fn test_accept_pushes_local_commits_ahead_of_remote() {
        let repo = diverged_repo();
        let session = WatchSession::initialize(repo, paths()).unwrap();

        let outcome = session.apply_decision(Decision::Accept).unwrap();
        assert_eq!(outcome, MergeOutcome::UpToDate);
        assert_eq!(session.provider().calls(), vec!["commit", "pull", "push"]);
        assert_eq!(session.provider().current_local_tip(), "l1");
    }

    #[test]
    fn test_conflicting_merge_skips_push() {
        let repo = diverged_repo();
        repo.set_remote_tip("r1").conflict_on_pull(true);
        let session = WatchSession::initialize(repo, paths()).unwrap();

        let outcome = session.apply_decision(Decision::Accept).unwrap();
        assert!(matches!(outcome, MergeOutcome::Conflicts { .. }));
        assert_eq!(session.provider().calls(), vec!["commit", "pull"]);
    }

    #[test]
    fn test_push_failure_is_external_operation_error() {
        let repo = diverged_repo();
        repo.set_remote_tip("r1").fail_push(true);
        let session = WatchSession::initialize(repo, paths()).unwrap();

        let result = session.apply_decision(Decision::Accept);
        assert!(matches!(
            result,
            Err(WatchError::ExternalOperation { operation: "push", .. })
        ));
    }

    #[test]
    fn test_pending_paths_mark_pending() {
        let repo = diverged_repo();
        let session = WatchSession::initialize(repo, paths()).unwrap();
        session.provider().set_remote_tip("r1");

        let states = session.pending_paths().unwrap();
        assert_eq!(states.len(), 1);
        assert!(states[0].is_pending());
        assert_eq!(
            states[0].watermark.as_deref(),
            Some(MemoryRepository::hash_of("42;apple\n").as_str())
        );
    }
}
