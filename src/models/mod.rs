//! Shared types used across all modules.
//!
//! This module defines the normalized change descriptors and pull request
//! coordinates. Provider adapters map their native shapes into these types
//! and the CLI consumes them without knowing which provider produced them.

pub mod change;
pub mod pull_request;

pub use change::{ChangeKind, FileChangeDescriptor};
pub use pull_request::PullRequestCoordinates;
