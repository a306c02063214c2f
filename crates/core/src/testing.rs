//! In-memory repository collaborator for tests.
//!
//! Commits are named snapshots of file contents. Diffs are registered
//! explicitly per `(base, target, path)`, since computing diffs is the
//! collaborator's job and not something the detectors should be tested
//! through.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use crate::errors::GitError;
use crate::git::RepositoryProvider;
use crate::models::{LineDiff, MergeOutcome};

#[derive(Default)]
struct State {
    commits: HashMap<String, BTreeMap<String, String>>,
    local_tip: String,
    remote_tip: String,
    upstream_tip: Option<String>,
    merge_base: Option<String>,
    diffs: HashMap<(String, String, String), LineDiff>,
    calls: Vec<&'static str>,
    fail_fetch: bool,
    fail_push: bool,
    conflict_on_pull: bool,
}

/// A scripted [`RepositoryProvider`].
#[derive(Default)]
pub struct MemoryRepository {
    state: RefCell<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a commit with the given file contents.
    pub fn add_commit(&self, id: &str, files: &[(&str, &str)]) -> &Self {
        let files = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect();
        self.state.borrow_mut().commits.insert(id.to_string(), files);
        self
    }

    pub fn set_local_tip(&self, id: &str) -> &Self {
        self.state.borrow_mut().local_tip = id.to_string();
        self
    }

    pub fn set_remote_tip(&self, id: &str) -> &Self {
        self.state.borrow_mut().remote_tip = id.to_string();
        self
    }

    /// Make `id` the upstream tip; it becomes the remote tip on the next fetch.
    pub fn publish_remote(&self, id: &str) -> &Self {
        self.state.borrow_mut().upstream_tip = Some(id.to_string());
        self
    }

    pub fn set_merge_base(&self, id: Option<&str>) -> &Self {
        self.state.borrow_mut().merge_base = id.map(str::to_string);
        self
    }

    pub fn set_diff(&self, base: &str, target: &str, path: &str, diff: LineDiff) -> &Self {
        self.state
            .borrow_mut()
            .diffs
            .insert((base.into(), target.into(), path.into()), diff);
        self
    }

    pub fn fail_fetch(&self, fail: bool) -> &Self {
        self.state.borrow_mut().fail_fetch = fail;
        self
    }

    pub fn fail_push(&self, fail: bool) -> &Self {
        self.state.borrow_mut().fail_push = fail;
        self
    }

    pub fn conflict_on_pull(&self, conflict: bool) -> &Self {
        self.state.borrow_mut().conflict_on_pull = conflict;
        self
    }

    /// Names of the mutating operations called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }

    pub fn current_local_tip(&self) -> String {
        self.state.borrow().local_tip.clone()
    }

    /// Hash used by [`RepositoryProvider::content_hash`] for `content`.
    pub fn hash_of(content: &str) -> String {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    fn file(&self, commit: &str, path: &str) -> Result<String, GitError> {
        let state = self.state.borrow();
        let files = state
            .commits
            .get(commit)
            .ok_or_else(|| GitError::RefNotFound(commit.to_string()))?;
        files.get(path).cloned().ok_or_else(|| GitError::PathNotFound {
            path: path.to_string(),
            commit: commit.to_string(),
        })
    }
}

impl RepositoryProvider for MemoryRepository {
    fn local_tip(&self) -> Result<String, GitError> {
        Ok(self.state.borrow().local_tip.clone())
    }

    fn remote_tip(&self) -> Result<String, GitError> {
        Ok(self.state.borrow().remote_tip.clone())
    }

    fn merge_base(&self, _local: &str, _remote: &str) -> Result<Option<String>, GitError> {
        Ok(self.state.borrow().merge_base.clone())
    }

    fn line_diff(
        &self,
        base: &str,
        target: &str,
        path: &str,
    ) -> Result<Option<LineDiff>, GitError> {
        let key = (base.to_string(), target.to_string(), path.to_string());
        Ok(self.state.borrow().diffs.get(&key).cloned())
    }

    fn full_text(&self, commit: &str, path: &str) -> Result<String, GitError> {
        self.file(commit, path)
    }

    fn content_hash(&self, commit: &str, path: &str) -> Result<String, GitError> {
        self.file(commit, path).map(|content| Self::hash_of(&content))
    }

    fn fetch(&self) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        state.calls.push("fetch");
        if state.fail_fetch {
            return Err(GitError::Git2Error(git2::Error::from_str(
                "network unreachable",
            )));
        }
        if let Some(tip) = state.upstream_tip.take() {
            state.remote_tip = tip;
        }
        Ok(())
    }

    fn pull_merge(&self) -> Result<MergeOutcome, GitError> {
        let mut state = self.state.borrow_mut();
        state.calls.push("pull");
        if state.conflict_on_pull {
            let paths = state
                .commits
                .get(&state.remote_tip)
                .map(|files| files.keys().cloned().collect())
                .unwrap_or_default();
            return Ok(MergeOutcome::Conflicts { paths });
        }
        let remote_reachable = state.merge_base.as_deref() == Some(state.remote_tip.as_str());
        if state.local_tip == state.remote_tip || remote_reachable {
            return Ok(MergeOutcome::UpToDate);
        }
        state.local_tip = state.remote_tip.clone();
        Ok(MergeOutcome::FastForward {
            sha: state.remote_tip.clone(),
        })
    }

    fn push(&self) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        state.calls.push("push");
        if state.fail_push {
            return Err(GitError::PushRejected {
                branch: "main".into(),
                detail: "non-fast-forward".into(),
            });
        }
        Ok(())
    }

    fn commit(&self, _paths: &[String], _message: &str) -> Result<Option<String>, GitError> {
        self.state.borrow_mut().calls.push("commit");
        Ok(None)
    }
}
