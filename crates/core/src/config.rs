//! Configuration for mergewatch.
//!
//! Loaded from a TOML file. Secrets are never stored in the file itself;
//! `[credentials]` names an environment variable holding the token.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::session::DEFAULT_COMMIT_MESSAGE;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Polling and tracked-path settings.
    pub watch: WatchSection,

    /// Repository location and remote branch.
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Optional HTTPS credentials for fetch and push.
    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,

    /// Identity and message used for pre-merge commits.
    #[serde(default)]
    pub commit: CommitConfig,
}

// ---------------------------------------------------------------------------
// [watch]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSection {
    /// Seconds between polling cycles (default 5).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Repository-relative paths of the watched files.
    pub paths: Vec<String>,

    /// Take an LFS lock on every tracked path when `watch` starts.
    #[serde(default)]
    pub lock_on_start: bool,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".into()
}

// ---------------------------------------------------------------------------
// [repository]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Path to the working copy (default `.`).
    #[serde(default = "default_repo_path")]
    pub path: PathBuf,

    /// Remote name (default `origin`).
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Remote branch to watch and push to (default `main`).
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_remote() -> String {
    "origin".into()
}

fn default_branch() -> String {
    "main".into()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
            remote: default_remote(),
            branch: default_branch(),
        }
    }
}

// ---------------------------------------------------------------------------
// [credentials]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub username: String,

    /// Environment variable holding the access token.
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// [commit]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,

    /// Commit message template. Placeholder: `{paths}`.
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_author_name() -> String {
    "mergewatch".into()
}

fn default_author_email() -> String {
    "mergewatch@localhost".into()
}

fn default_message() -> String {
    DEFAULT_COMMIT_MESSAGE.into()
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
            message: default_message(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl WatchConfig {
    /// Load a [`WatchConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: WatchConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(paths = config.watch.paths.len(), "configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `token_env` into the credentials token. An unset or empty
    /// variable is an error.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(creds) = self.credentials.as_mut() {
            match std::env::var(&creds.token_env) {
                Ok(val) if !val.is_empty() => {
                    debug!(env_name = %creds.token_env, "resolved credentials token");
                    creds.token = Some(val);
                }
                _ => {
                    return Err(ConfigError::EnvVarMissing {
                        var: creds.token_env.clone(),
                        field: "credentials.token_env".into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watch.poll_interval_secs".into(),
                detail: "poll interval must be > 0".into(),
            });
        }
        if self.watch.paths.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "watch.paths".into(),
                detail: "at least one path must be tracked".into(),
            });
        }
        if let Some(empty) = self.watch.paths.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "watch.paths".into(),
                detail: format!("tracked path must not be blank: {:?}", empty),
            });
        }
        if self.repository.remote.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repository.remote".into(),
                detail: "remote name must not be empty".into(),
            });
        }
        if self.repository.branch.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repository.branch".into(),
                detail: "branch name must not be empty".into(),
            });
        }
        if let Some(creds) = &self.credentials {
            if creds.username.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "credentials.username".into(),
                    detail: "username must not be empty".into(),
                });
            }
        }
        if self.commit.author_name.is_empty() || self.commit.author_email.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "commit".into(),
                detail: "author name and email must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# mergewatch configuration

[watch]
poll_interval_secs = 5
log_level = "info"
# log_file = "~/.local/state/mergewatch.log"
paths = ["data/records.txt"]
lock_on_start = false

[repository]
path = "."
remote = "origin"
branch = "main"

# [credentials]
# username = "your_username"
# token_env = "MERGEWATCH_TOKEN"

[commit]
author_name = "Your Name"
author_email = "you@example.com"
message = "Committed local {paths} changes"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
[watch]
poll_interval_secs = 10
log_level = "debug"
log_file = "/tmp/mergewatch.log"
paths = ["a.txt", "data/b.txt"]
lock_on_start = true

[repository]
path = "/srv/checkout"
remote = "upstream"
branch = "develop"

[credentials]
username = "jdoe"
token_env = "MERGEWATCH_TEST_TOKEN"

[commit]
author_name = "John Doe"
author_email = "jdoe@example.com"
message = "sync {paths}"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: WatchConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.watch.poll_interval_secs, 10);
        assert_eq!(config.watch.paths, vec!["a.txt", "data/b.txt"]);
        assert!(config.watch.lock_on_start);
        assert_eq!(config.repository.remote, "upstream");
        assert_eq!(config.repository.branch, "develop");
        assert_eq!(config.credentials.as_ref().unwrap().username, "jdoe");
        assert_eq!(config.commit.message, "sync {paths}");
    }

    #[test]
    fn test_defaults() {
        let minimal = r#"
[watch]
paths = ["records.txt"]
"#;
        let config: WatchConfig = toml::from_str(minimal).unwrap();
        assert_eq!(config.watch.poll_interval_secs, 5);
        assert_eq!(config.watch.log_level, "info");
        assert!(config.watch.log_file.is_none());
        assert!(!config.watch.lock_on_start);
        assert_eq!(config.repository.path, PathBuf::from("."));
        assert_eq!(config.repository.remote, "origin");
        assert_eq!(config.repository.branch, "main");
        assert!(config.credentials.is_none());
        assert_eq!(config.commit.message, DEFAULT_COMMIT_MESSAGE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mergewatch.toml");
        std::fs::write(&path, sample_toml()).unwrap();

        let config = WatchConfig::load_from_file(&path).expect("load failed");
        assert_eq!(config.watch.log_level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = WatchConfig::load_from_file("/nonexistent/mergewatch.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[watch\npaths = ").unwrap();

        let result = WatchConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_poll() {
        let mut config: WatchConfig = toml::from_str(sample_toml()).unwrap();
        config.watch.poll_interval_secs = 0;
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "watch.poll_interval_secs"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        let mut config: WatchConfig = toml::from_str(sample_toml()).unwrap();
        config.watch.paths.clear();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "watch.paths"
        ));

        config.watch.paths = vec!["  ".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("MERGEWATCH_TEST_TOKEN", "tok_123");
        let mut config: WatchConfig = toml::from_str(sample_toml()).unwrap();
        config.resolve_env_vars().unwrap();
        assert_eq!(
            config.credentials.as_ref().and_then(|c| c.token.as_deref()),
            Some("tok_123")
        );
        std::env::remove_var("MERGEWATCH_TEST_TOKEN");
    }

    #[test]
    fn test_resolve_env_vars_missing() {
        let mut config: WatchConfig = toml::from_str(sample_toml()).unwrap();
        config.credentials.as_mut().unwrap().token_env = "MERGEWATCH_TEST_UNSET_VAR".into();
        let result = config.resolve_env_vars();
        assert!(matches!(
            result,
            Err(ConfigError::EnvVarMissing { ref var, .. }) if var == "MERGEWATCH_TEST_UNSET_VAR"
        ));
    }

    #[test]
    fn test_default_template_is_valid() {
        let config: WatchConfig = toml::from_str(WatchConfig::default_template())
            .expect("default template should be valid TOML");
        assert!(config.validate().is_ok());
    }
}
