//! mergewatch daemon.
//!
//! Polls the remote branch for changes to tracked files, reports line
//! conflicts and duplicate record IDs against the merge base, and asks before
//! committing, merging and pushing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use tracing::info;

use mergewatch::decision::{DecisionPrompt, FixedPolicy, InteractivePrompt};
use mergewatch::{scheduler, setup, signals, style};
use mergewatch_core::lfs;
use mergewatch_core::models::Decision;
use mergewatch_core::WatchConfig;

/// mergewatch: watch tracked files and check merges before they happen.
#[derive(Parser)]
#[command(name = "mergewatch", version, about)]
struct Cli {
    /// Path to the config file.
    #[arg(
        short,
        long,
        global = true,
        default_value = "~/.config/mergewatch/config.toml"
    )]
    config: String,

    /// Log level override: trace, debug, info, warn, error.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file.
    Init {
        /// Where to write it (defaults to --config).
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Poll the remote and prompt on every change.
    Watch {
        /// How to answer the merge prompt.
        #[arg(long, value_enum, default_value_t = Policy::Ask)]
        policy: Policy,
    },

    /// Fetch once, print the problem report and exit.
    Check {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show local and remote hashes of the tracked paths.
    Status,

    /// Take an LFS lock on every tracked path.
    Lock,

    /// Release the LFS locks on every tracked path.
    Unlock {
        /// Break locks held by other users.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Ask interactively.
    Ask,
    /// Always merge.
    Accept,
    /// Never merge, only report.
    Decline,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve config path (expand ~).
    let config_path = setup::expand_tilde(&cli.config);

    if let Commands::Init { output } = &cli.command {
        let level = cli.log_level.as_deref().unwrap_or("info");
        setup::init_tracing(level, None)?;
        let target = output
            .as_deref()
            .map(setup::expand_tilde)
            .unwrap_or(config_path);
        return cmd_init(&target);
    }

    let config = setup::load_config(&config_path)?;
    let level = cli.log_level.as_deref().unwrap_or(&config.watch.log_level);
    let log_file = config
        .watch
        .log_file
        .as_ref()
        .map(|p| setup::expand_tilde(&p.to_string_lossy()));
    let _guard = setup::init_tracing(level, log_file.as_deref())?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Watch { policy } => cmd_watch(&config, policy).await,
        Commands::Check { json } => cmd_check(&config, json),
        Commands::Status => cmd_status(&config),
        Commands::Lock => cmd_lock(&config),
        Commands::Unlock { force } => cmd_unlock(&config, force),
    }
}

/// Write the default config template.
fn cmd_init(path: &Path) -> Result<()> {
    if path.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;

        if !overwrite {
            println!("{}", style::dim("Keeping existing config."));
            return Ok(());
        }
    }

    setup::write_config_template(path)?;
    println!(
        "{}",
        style::success(&format!("Wrote {}", path.display()))
    );
    println!(
        "{}",
        style::dim("Edit [watch].paths and [repository] before running `mergewatch watch`.")
    );
    Ok(())
}

/// Run the polling loop until Ctrl+C or SIGTERM.
async fn cmd_watch(config: &WatchConfig, policy: Policy) -> Result<()> {
    let mut session = setup::build_session(config)?;

    if config.watch.lock_on_start {
        let repo_path = session.provider().repo_path().to_path_buf();
        lock_all(&repo_path, session.paths())?;
    }

    let mut prompt: Box<dyn DecisionPrompt> = match policy {
        Policy::Ask => Box::new(InteractivePrompt),
        Policy::Accept => Box::new(FixedPolicy::new(Decision::Accept)),
        Policy::Decline => Box::new(FixedPolicy::new(Decision::Decline)),
    };

    println!(
        "{}",
        style::header(&format!(
            "Watching {} path(s), Ctrl+C to stop",
            session.paths().len()
        ))
    );

    let shutdown = signals::setup_signal_handlers();
    let interval = Duration::from_secs(config.watch.poll_interval_secs);
    scheduler::run_polling_loop(&mut session, prompt.as_mut(), interval, shutdown).await?;

    info!("watcher stopped");
    Ok(())
}

/// Fetch once and print the problem report.
fn cmd_check(config: &WatchConfig, json: bool) -> Result<()> {
    let session = setup::build_session(config)?;
    let report = session
        .check_for_problems()
        .context("failed to check for problems")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        println!();
        print!("{}", style::render_report(&report));
        println!();
    }
    Ok(())
}

/// Print the tracked-path status table.
fn cmd_status(config: &WatchConfig) -> Result<()> {
    let client = setup::open_client(config)?;
    let session = mergewatch_core::WatchSession::initialize(client, config.watch.paths.clone())
        .context("failed to read tracked paths")?;
    let states = session
        .pending_paths()
        .context("failed to read tracked path hashes")?;

    println!();
    println!(
        "{}",
        style::header(&format!(
            "{} → {}/{}",
            session.provider().repo_path().display(),
            config.repository.remote,
            config.repository.branch
        ))
    );
    println!("{}", style::status_table(&states));
    println!(
        "{}",
        style::dim(&format!(
            "as of last fetch, {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ))
    );
    println!();
    Ok(())
}

fn cmd_lock(config: &WatchConfig) -> Result<()> {
    let repo_path = repo_path(config);
    lock_all(&repo_path, &config.watch.paths)
}

fn cmd_unlock(config: &WatchConfig, force: bool) -> Result<()> {
    let repo_path = repo_path(config);
    lfs::preflight_check().context("git lfs is required for unlocking")?;
    for path in &config.watch.paths {
        lfs::unlock(&repo_path, path, force)
            .with_context(|| format!("failed to unlock {}", path))?;
        println!("{}", style::success(&format!("Unlocked {}", path)));
    }
    Ok(())
}

fn lock_all(repo_path: &Path, paths: &[String]) -> Result<()> {
    lfs::preflight_check().context("git lfs is required for locking")?;
    for path in paths {
        lfs::lock(repo_path, path).with_context(|| format!("failed to lock {}", path))?;
        println!("{}", style::success(&format!("Locked {}", path)));
    }
    Ok(())
}

fn repo_path(config: &WatchConfig) -> PathBuf {
    setup::expand_tilde(&config.repository.path.to_string_lossy())
}
