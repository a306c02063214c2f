//! Polling scheduler for the watch loop.

use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use mergewatch_core::errors::WatchError;
use mergewatch_core::models::MergeOutcome;
use mergewatch_core::{RepositoryProvider, WatchSession};

use crate::decision::DecisionPrompt;
use crate::signals::{is_shutdown_requested, ShutdownFlag};

/// What one polling cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing new on the remote.
    Unchanged,
    /// The user accepted and the merge hand-off ran.
    Merged(MergeOutcome),
    /// The user declined.
    Declined,
    /// The user accepted but commit, pull or push failed.
    HandoffFailed(String),
}

/// Run one fetch / check / prompt / merge cycle.
///
/// Once a change has been shown to the user the watermark advances whatever
/// the answer was, so the same remote state is never presented twice. An
/// error before the prompt leaves the watermark alone and the change is
/// offered again next cycle.
pub fn run_cycle<P, D>(session: &mut WatchSession<P>, prompt: &mut D) -> Result<CycleOutcome>
where
    P: RepositoryProvider,
    D: DecisionPrompt + ?Sized,
{
    session.fetch()?;
    if !session.has_changed()? {
        return Ok(CycleOutcome::Unchanged);
    }

    let pending: Vec<String> = session
        .pending_paths()?
        .into_iter()
        .filter(|state| state.is_pending())
        .map(|state| state.path)
        .collect();
    info!(paths = ?pending, "remote changes detected");

    let report = session.check_for_problems()?;
    let decision = prompt.decide(&report)?;

    let outcome = match session.apply_decision(decision) {
        Ok(merge) => CycleOutcome::Merged(merge),
        Err(WatchError::UserDeclined) => CycleOutcome::Declined,
        Err(e) => {
            error!(error = %e, "merge hand-off failed");
            CycleOutcome::HandoffFailed(e.to_string())
        }
    };

    session.advance()?;
    Ok(outcome)
}

/// Run cycles until the shutdown flag is set.
pub async fn run_polling_loop<P, D>(
    session: &mut WatchSession<P>,
    prompt: &mut D,
    poll_interval: Duration,
    shutdown: ShutdownFlag,
) -> Result<()>
where
    P: RepositoryProvider,
    D: DecisionPrompt + ?Sized,
{
    info!(
        interval_secs = poll_interval.as_secs(),
        paths = session.paths().len(),
        "starting polling loop"
    );

    loop {
        if is_shutdown_requested(&shutdown) {
            info!("shutdown requested, exiting polling loop");
            break;
        }

        match run_cycle(session, prompt) {
            Ok(CycleOutcome::Unchanged) => {}
            Ok(CycleOutcome::Merged(merge)) => info!(%merge, "cycle completed"),
            Ok(CycleOutcome::Declined) => info!("merge declined, waiting for the next remote change"),
            Ok(CycleOutcome::HandoffFailed(detail)) => {
                warn!(detail = %detail, "cycle completed without merging")
            }
            Err(e) => {
                error!(error = %e, "watch cycle failed");
            }
        }

        // Sleep with early exit on shutdown
        let sleep_step = Duration::from_secs(1).min(poll_interval);
        let mut slept = Duration::ZERO;
        while slept < poll_interval {
            if is_shutdown_requested(&shutdown) {
                info!("shutdown requested during sleep, exiting");
                return Ok(());
            }
            tokio::time::sleep(sleep_step).await;
            slept += sleep_step;
        }
    }

    Ok(())
}
