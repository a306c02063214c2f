//! Start-up helpers shared by the CLI commands: path expansion, tracing,
//! config template and session construction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use mergewatch_core::git::Credentials;
use mergewatch_core::{GitClient, RepositoryProvider, WatchConfig, WatchSession};

/// Expand `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `level`. With a `log_file` the output goes through a
/// non-blocking file writer; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(log_file) = log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    };

    let file_name = log_file
        .file_name()
        .with_context(|| format!("log file has no file name: {}", log_file.display()))?;
    let dir = match log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

/// Write the default config template to `path`, creating parent directories.
pub fn write_config_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }
    std::fs::write(path, WatchConfig::default_template())
        .with_context(|| format!("failed to write config: {}", path.display()))?;
    Ok(())
}

/// Load, resolve and validate the config at `path`.
pub fn load_config(path: &Path) -> Result<WatchConfig> {
    WatchConfig::load_and_resolve(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

/// Open the configured repository.
pub fn open_client(config: &WatchConfig) -> Result<GitClient> {
    let repo_path = expand_tilde(&config.repository.path.to_string_lossy());
    let mut client = GitClient::new(&repo_path)
        .with_context(|| format!("failed to open repository at {}", repo_path.display()))?
        .with_remote(&config.repository.remote, &config.repository.branch)
        .with_identity(&config.commit.author_name, &config.commit.author_email);

    if let Some(creds) = &config.credentials {
        if let Some(token) = &creds.token {
            client = client.with_credentials(Credentials {
                username: creds.username.clone(),
                token: token.clone(),
            });
        }
    }
    Ok(client)
}

/// Open the repository, fetch once and seed a watch session.
///
/// A failed initial fetch is logged and the session starts from the last
/// fetched remote state.
pub fn build_session(config: &WatchConfig) -> Result<WatchSession<GitClient>> {
    let client = open_client(config)?;
    if let Err(e) = client.fetch() {
        warn!(error = %e, "initial fetch failed, using last fetched remote state");
    }

    let session = WatchSession::initialize(client, config.watch.paths.clone())
        .context("failed to initialize watch session")?
        .with_commit_message(&config.commit.message);
    info!(
        remote = %config.repository.remote,
        branch = %config.repository.branch,
        "watch session ready"
    );
    Ok(session)
}
