//! Local Git repository operations via `git2`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use git2::build::CheckoutBuilder;
use git2::{
    Cred, DiffFormat, DiffOptions, ErrorCode, FetchOptions, FileFavor, MergeOptions, Oid,
    PushOptions, RemoteCallbacks, Repository, Signature,
};
use tracing::{debug, info, instrument, warn};

use crate::errors::GitError;
use crate::git::provider::RepositoryProvider;
use crate::models::{Line, LineDiff, MergeOutcome};

/// Username/token pair used for fetch and push.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

/// High-level Git client wrapping a `git2::Repository`.
///
/// The local side is `HEAD`; the remote side is
/// `refs/remotes/<remote>/<branch>`.
pub struct GitClient {
    repo: Repository,
    repo_path: PathBuf,
    remote_name: String,
    branch: String,
    credentials: Option<Credentials>,
    author_name: String,
    author_email: String,
}

impl GitClient {
    /// Open an existing Git repository at `repo_path`, tracking `origin/main`.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
            remote_name: "origin".into(),
            branch: "main".into(),
            credentials: None,
            author_name: "mergewatch".into(),
            author_email: "mergewatch@localhost".into(),
        })
    }

    /// Track `refs/remotes/<remote>/<branch>` and push to `<branch>`.
    pub fn with_remote(mut self, remote: impl Into<String>, branch: impl Into<String>) -> Self {
        self.remote_name = remote.into();
        self.branch = branch.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Author and committer identity for commits and merges.
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Full name of the remote tracking ref.
    pub fn remote_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.remote_name, self.branch)
    }

    fn callbacks(&self) -> RemoteCallbacks<'static> {
        let mut callbacks = RemoteCallbacks::new();
        if let Some(creds) = &self.credentials {
            let username = creds.username.clone();
            let token = creds.token.clone();
            callbacks.credentials(move |_url, _username, _allowed| {
                Cred::userpass_plaintext(&username, &token)
            });
        }
        callbacks
    }

    fn signature(&self) -> Result<Signature<'static>, GitError> {
        Ok(Signature::now(&self.author_name, &self.author_email)?)
    }

    fn find_commit(&self, sha: &str) -> Result<git2::Commit<'_>, GitError> {
        let oid = Oid::from_str(sha)?;
        self.repo
            .find_commit(oid)
            .map_err(|_| GitError::RefNotFound(sha.to_string()))
    }

    /// Blob id of `path` in the tree of `commit`.
    fn entry_id(&self, commit: &str, path: &str) -> Result<Oid, GitError> {
        let tree = self.find_commit(commit)?.tree()?;
        let entry = tree.get_path(Path::new(path)).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                GitError::PathNotFound {
                    path: path.to_string(),
                    commit: commit.to_string(),
                }
            } else {
                GitError::Git2Error(e)
            }
        })?;
        Ok(entry.id())
    }

    fn head_branch(&self) -> Result<(String, String), GitError> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(GitError::DetachedHead);
        }
        let name = head.name().ok_or(GitError::DetachedHead)?.to_string();
        let short = head.shorthand().ok_or(GitError::DetachedHead)?.to_string();
        Ok((name, short))
    }
}

impl RepositoryProvider for GitClient {
    fn local_tip(&self) -> Result<String, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|_| GitError::RefNotFound("HEAD".into()))?;
        Ok(head.peel_to_commit()?.id().to_string())
    }

    fn remote_tip(&self) -> Result<String, GitError> {
        let name = self.remote_ref();
        let reference = self
            .repo
            .find_reference(&name)
            .map_err(|_| GitError::RefNotFound(name.clone()))?;
        Ok(reference.peel_to_commit()?.id().to_string())
    }

    fn merge_base(&self, local: &str, remote: &str) -> Result<Option<String>, GitError> {
        let local = Oid::from_str(local)?;
        let remote = Oid::from_str(remote)?;
        match self.repo.merge_base(local, remote) {
            Ok(oid) => Ok(Some(oid.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn line_diff(
        &self,
        base: &str,
        target: &str,
        path: &str,
    ) -> Result<Option<LineDiff>, GitError> {
        let base_tree = self.find_commit(base)?.tree()?;
        let target_tree = self.find_commit(target)?.tree()?;

        let mut opts = DiffOptions::new();
        opts.pathspec(path)
            .disable_pathspec_match(true)
            .context_lines(0);
        let diff =
            self.repo
                .diff_tree_to_tree(Some(&base_tree), Some(&target_tree), Some(&mut opts))?;

        if diff.deltas().next().is_none() {
            return Ok(None);
        }

        let mut added = Vec::new();
        let mut deleted = Vec::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let text = String::from_utf8_lossy(line.content());
            let content = trim_line_ending(&text);
            match (line.origin(), line.new_lineno(), line.old_lineno()) {
                ('+', Some(number), _) => added.push(Line::new(number, content)),
                ('-', _, Some(number)) => deleted.push(Line::new(number, content)),
                _ => {}
            }
            true
        })?;

        debug!(
            path,
            added = added.len(),
            deleted = deleted.len(),
            "computed line diff"
        );
        Ok(Some(LineDiff::new(added, deleted)))
    }

    fn full_text(&self, commit: &str, path: &str) -> Result<String, GitError> {
        let blob = self.repo.find_blob(self.entry_id(commit, path)?)?;
        Ok(String::from_utf8_lossy(blob.content()).into_owned())
    }

    fn content_hash(&self, commit: &str, path: &str) -> Result<String, GitError> {
        Ok(self.entry_id(commit, path)?.to_string())
    }

    #[instrument(skip(self))]
    fn fetch(&self) -> Result<(), GitError> {
        info!(remote = %self.remote_name, "fetching");
        let mut remote = self.repo.find_remote(&self.remote_name)?;
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(self.callbacks());
        remote.fetch(&[] as &[&str], Some(&mut fetch_opts), None)?;
        debug!("fetch completed");
        Ok(())
    }

    #[instrument(skip(self))]
    fn pull_merge(&self) -> Result<MergeOutcome, GitError> {
        let remote_ref = self.remote_ref();
        let reference = self
            .repo
            .find_reference(&remote_ref)
            .map_err(|_| GitError::RefNotFound(remote_ref.clone()))?;
        let annotated = self.repo.reference_to_annotated_commit(&reference)?;
        let (analysis, _) = self.repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            info!("already up to date");
            return Ok(MergeOutcome::UpToDate);
        }

        let (head_name, head_short) = self.head_branch()?;
        let remote_commit = reference.peel_to_commit()?;

        if analysis.is_fast_forward() {
            self.repo.checkout_tree(
                remote_commit.as_object(),
                Some(CheckoutBuilder::new().safe()),
            )?;
            let mut head_ref = self.repo.find_reference(&head_name)?;
            head_ref.set_target(remote_commit.id(), "mergewatch: fast-forward pull")?;
            info!(sha = %remote_commit.id(), "fast-forward completed");
            return Ok(MergeOutcome::FastForward {
                sha: remote_commit.id().to_string(),
            });
        }

        let local_commit = self.repo.head()?.peel_to_commit()?;
        let mut merge_opts = MergeOptions::new();
        merge_opts.file_favor(FileFavor::Union);
        let mut index =
            self.repo
                .merge_commits(&local_commit, &remote_commit, Some(&merge_opts))?;

        if index.has_conflicts() {
            let paths: Vec<String> = index
                .conflicts()?
                .filter_map(Result::ok)
                .filter_map(|c| c.our.or(c.their).or(c.ancestor))
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
                .collect();
            warn!(?paths, "merge produced conflicts, aborting");
            return Ok(MergeOutcome::Conflicts { paths });
        }

        let tree_oid = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_oid)?;
        self.repo
            .checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().safe()))?;

        let signature = self.signature()?;
        let message = format!("Merge {} into {}", remote_ref, head_short);
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&local_commit, &remote_commit],
        )?;
        info!(sha = %oid, "merge commit created");
        Ok(MergeOutcome::Merged {
            sha: oid.to_string(),
        })
    }

    #[instrument(skip(self))]
    fn push(&self) -> Result<(), GitError> {
        let (_, local_branch) = self.head_branch()?;
        info!(remote = %self.remote_name, branch = %self.branch, "pushing");
        let mut remote = self.repo.find_remote(&self.remote_name)?;

        let mut callbacks = self.callbacks();
        let push_error = Arc::new(Mutex::new(None::<String>));
        let push_error_clone = push_error.clone();
        callbacks.push_update_reference(move |refname, status| {
            if let Some(msg) = status {
                warn!(refname, msg, "push rejected");
                *push_error_clone.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(msg.to_string());
            }
            Ok(())
        });

        let mut push_opts = PushOptions::new();
        push_opts.remote_callbacks(callbacks);
        let refspec = format!("refs/heads/{}:refs/heads/{}", local_branch, self.branch);
        remote.push(&[&refspec], Some(&mut push_opts))?;

        if let Some(detail) = push_error.lock().unwrap_or_else(|e| e.into_inner()).take() {
            return Err(GitError::PushRejected {
                branch: self.branch.clone(),
                detail,
            });
        }
        info!("push completed");
        Ok(())
    }

    #[instrument(skip(self, message))]
    fn commit(&self, paths: &[String], message: &str) -> Result<Option<String>, GitError> {
        let workdir = self.repo.workdir().unwrap_or(self.repo_path.as_path());
        let mut index = self.repo.index()?;
        for path in paths {
            let relative = Path::new(path);
            if !workdir.join(relative).exists() {
                warn!(path = %path, "tracked file missing from working tree, not committing it");
                continue;
            }
            index.add_path(relative)?;
        }
        index.write()?;
        let tree_oid = index.write_tree()?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        if parent.as_ref().map(|p| p.tree_id()) == Some(tree_oid) {
            debug!("nothing to commit");
            return Ok(None);
        }

        let tree = self.repo.find_tree(tree_oid)?;
        let signature = self.signature()?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        info!(sha = %oid, "created commit");
        Ok(Some(oid.to_string()))
    }
}

/// Strip a trailing `\n` or `\r\n`.
fn trim_line_ending(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.strip_suffix('\r').unwrap_or(text)
}
