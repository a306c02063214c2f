//! Error types for the mergewatch core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lfs(#[from] LfsError),
}

// ---------------------------------------------------------------------------
// Watch errors
// ---------------------------------------------------------------------------

/// Errors raised by the watch session and the merge hand-off.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A tracked path is absent from a tree the session needed to read.
    #[error("tracked path '{path}' not found in {commit}")]
    PathNotFound { path: String, commit: String },

    /// Local and remote tips share no common ancestor.
    #[error("no merge base between local {local} and remote {remote}")]
    MergeBaseNotFound { local: String, remote: String },

    /// The user declined the proposed merge after seeing the report.
    #[error("merge declined by user")]
    UserDeclined,

    /// Fetch, pull, commit or push failed in the repository collaborator.
    #[error("{operation} failed: {source}")]
    ExternalOperation {
        operation: &'static str,
        #[source]
        source: GitError,
    },
}

impl WatchError {
    pub(crate) fn external(operation: &'static str, source: GitError) -> Self {
        Self::ExternalOperation { operation, source }
    }
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A ref (branch, remote tracking ref, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// A path is not present in the tree of the given commit.
    #[error("path '{path}' not found in commit {commit}")]
    PathNotFound { path: String, commit: String },

    /// Push was rejected (e.g. non-fast-forward).
    #[error("git push rejected for branch '{branch}': {detail}")]
    PushRejected { branch: String, detail: String },

    /// HEAD is detached or unborn where a branch is required.
    #[error("HEAD is not on a branch")]
    DetachedHead,

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// LFS errors
// ---------------------------------------------------------------------------

/// Errors from `git lfs` lock management.
#[derive(Debug, Error)]
pub enum LfsError {
    /// `git lfs` is not installed or not on `$PATH`.
    #[error("git lfs not available: {0}")]
    NotAvailable(String),

    /// A `git lfs` command exited with a non-zero status.
    #[error("git lfs {command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Generic I/O wrapper.
    #[error("git lfs I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = WatchError::PathNotFound {
            path: "data.txt".into(),
            commit: "abc123".into(),
        };
        assert_eq!(err.to_string(), "tracked path 'data.txt' not found in abc123");

        let err = GitError::RepositoryNotFound("/tmp/repo".into());
        assert_eq!(err.to_string(), "git repository not found at '/tmp/repo'");

        let err = WatchError::external(
            "push",
            GitError::PushRejected {
                branch: "main".into(),
                detail: "non-fast-forward".into(),
            },
        );
        assert!(err.to_string().starts_with("push failed"));
        assert!(err.to_string().contains("non-fast-forward"));

        let err = ConfigError::EnvVarMissing {
            var: "MERGEWATCH_TOKEN".into(),
            field: "credentials.token_env".into(),
        };
        assert!(err.to_string().contains("MERGEWATCH_TOKEN"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = WatchError::UserDeclined.into();
        assert!(matches!(core_err, CoreError::Watch(WatchError::UserDeclined)));

        let core_err: CoreError = GitError::DetachedHead.into();
        assert!(matches!(core_err, CoreError::Git(_)));
    }
}
