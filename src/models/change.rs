//! Change kinds and per-file change descriptors.

use serde::{Deserialize, Serialize};

use crate::constants::CONTENT_UNAVAILABLE;

/// Normalized kind of change for a single file.
///
/// Each provider has its own vocabulary (bit flags on Azure DevOps, status
/// strings on GitHub); adapters map into this set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Edit,
    Delete,
    Rename,
    Unknown,
}

/// One changed file, reduced to the text handed to the review stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeDescriptor {
    /// Repository-relative path, with the provider's native separators.
    pub path: String,
    /// Normalized change kind.
    #[serde(rename = "changeType")]
    pub change_type: ChangeKind,
    /// Reduced diff, full file body, or [`CONTENT_UNAVAILABLE`].
    pub content: String,
    /// Why the content could not be produced, when it could not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileChangeDescriptor {
    pub fn new(
        path: impl Into<String>,
        change_type: ChangeKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            change_type,
            content: content.into(),
            error: None,
        }
    }

    /// Descriptor for a file whose content fetch or diff failed.
    pub fn unavailable(
        path: impl Into<String>,
        change_type: ChangeKind,
        error: impl std::fmt::Display,
    ) -> Self {
        Self {
            path: path.into(),
            change_type,
            content: CONTENT_UNAVAILABLE.to_string(),
            error: Some(error.to_string()),
        }
    }

    /// Returns `true` if this file's content could not be produced.
    pub fn is_unavailable(&self) -> bool {
        self.error.is_some()
    }
}
