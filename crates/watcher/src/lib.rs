//! mergewatch daemon library.
//!
//! The polling loop, the decision prompt and the terminal output used by the
//! `mergewatch` binary.

pub mod decision;
pub mod scheduler;
pub mod setup;
pub mod signals;
pub mod style;
