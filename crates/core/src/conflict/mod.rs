//! Three-way conflict analysis.
//!
//! Both detectors are pure functions over diffs already computed against a
//! shared merge base:
//! 1. **Line conflicts** -- positions in the base changed on both sides.
//! 2. **Duplicate IDs** -- records inserted on one side whose semantic ID
//!    already exists on the other side.

pub mod detector;
pub mod duplicates;

pub use detector::LineConflictDetector;
pub use duplicates::DuplicateIdDetector;
