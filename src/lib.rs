//! pullscope: pull request change extraction for review (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod config;
pub mod constants;
pub mod diff;
pub mod env;
pub mod filter;
pub mod hosting;
pub mod logging;
pub mod models;
pub mod prompt;
