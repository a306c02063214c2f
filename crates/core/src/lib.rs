//! mergewatch core library.
//!
//! This crate provides the foundational components for watching files that
//! diverge between a local branch and its remote: configuration, the hash
//! watermark, three-way line conflict and duplicate-ID detection, problem
//! reports, the git2-backed repository collaborator and LFS locking.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod git;
pub mod lfs;
pub mod models;
pub mod report;
pub mod session;
pub mod watermark;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-exports for convenience.
pub use config::WatchConfig;
pub use errors::CoreError;
pub use git::{GitClient, RepositoryProvider};
pub use report::ProblemReport;
pub use session::WatchSession;
