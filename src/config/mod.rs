//! Configuration loading and layering.
//!
//! Handles `.pullscope.toml` loading, environment variable resolution
//! (including Azure Pipelines and GitHub Actions predefined variables),
//! and CLI flag merging with proper priority ordering.

pub mod loader;

pub use loader::{Config, ConfigError, HostingSettings, PullRequestSettings, ReviewSettings};
