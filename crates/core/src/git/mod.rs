//! Git access for mergewatch.

pub mod client;
pub mod provider;

pub use client::{Credentials, GitClient};
pub use provider::RepositoryProvider;
