//! Graceful shutdown signal handling for the watch loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info};

/// Shared shutdown flag checked by the scheduler loop.
pub type ShutdownFlag = Arc<AtomicBool>;

/// A flag nothing has set yet.
pub fn new_flag() -> ShutdownFlag {
    Arc::new(AtomicBool::new(false))
}

/// Create a new shutdown flag and register OS signal handlers.
///
/// On SIGTERM or SIGINT (Ctrl+C), the flag is set to `true`.
pub fn setup_signal_handlers() -> ShutdownFlag {
    let flag = new_flag();
    let flag_clone = flag.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to register SIGTERM handler, listening for Ctrl+C only");
                    if let Err(e) = ctrl_c.await {
                        error!(error = %e, "failed to listen for Ctrl+C");
                        return;
                    }
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = ctrl_c.await {
                error!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("received Ctrl+C, initiating shutdown");
        }

        request_shutdown(&flag_clone);
    });

    flag
}

/// Set the flag.
pub fn request_shutdown(flag: &ShutdownFlag) {
    flag.store(true, Ordering::SeqCst);
}

/// Check whether the shutdown flag has been set.
pub fn is_shutdown_requested(flag: &ShutdownFlag) -> bool {
    flag.load(Ordering::SeqCst)
}
