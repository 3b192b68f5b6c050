//! Diff rendering: reduced unified diffs and whole-file-as-added output.
//!
//! The line-level diff itself is computed by `git diff --no-index` on a
//! pair of scratch files; this module only invokes it and trims the output
//! down to hunk headers and changed lines.

pub mod git;
pub mod render;

use thiserror::Error;

pub use git::DiffRenderer;
pub use render::{reduce_diff_output, render_added};

/// Errors from the diff renderer.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("failed to prepare scratch file: {0}")]
    ScratchFile(#[from] std::io::Error),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("diff tool failed (exit {status}): {stderr}")]
    ToolFailed { status: String, stderr: String },

    #[error("diff tool timed out after {0:?}")]
    TimedOut(std::time::Duration),
}
