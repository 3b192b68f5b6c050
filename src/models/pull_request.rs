//! Pull request coordinates.

use serde::{Deserialize, Serialize};

/// Identifies one pull request on a hosting provider.
///
/// `repository_id` is provider-shaped: a repository GUID or name on
/// Azure DevOps, an `owner/repo` string on GitHub. Only the adapter
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestCoordinates {
    pub project_name: String,
    pub repository_id: String,
    pub pull_request_id: u64,
}

impl PullRequestCoordinates {
    pub fn new(
        project_name: impl Into<String>,
        repository_id: impl Into<String>,
        pull_request_id: u64,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            repository_id: repository_id.into(),
            pull_request_id,
        }
    }
}
