//! GitHub adapter.
//!
//! `repository_id` is `owner/repo`; `project_name` is ignored. Reduced diffs
//! come from the `patch` GitHub attaches to each changed file, and full
//! content is read at the head commit of the pull request.

pub mod client;

use std::sync::Arc;

use async_trait::async_trait;

use client::{GithubApi, GithubRestClient, PROVIDER, PullRequestFile};

use super::{HostingError, HostingService, ServiceOptions};
use crate::diff::reduce_diff_output;
use crate::filter::FilterConfig;
use crate::models::{ChangeKind, FileChangeDescriptor, PullRequestCoordinates};

const PERMISSION_HINT: &str =
    "ensure the token has 'pull-requests: write' permission on the repository";

pub struct GithubService {
    api: Arc<dyn GithubApi>,
    options: ServiceOptions,
}

impl GithubService {
    /// Build an adapter for github.com or, given a non-github.com URL, an
    /// Enterprise API base.
    pub fn new(
        access_token: &str,
        organization_url: Option<&str>,
        options: ServiceOptions,
    ) -> Result<Self, HostingError> {
        if access_token.trim().is_empty() {
            return Err(HostingError::Configuration(
                "an access token is required for GitHub".into(),
            ));
        }
        let api = GithubRestClient::new(access_token, organization_url, &options)?;
        Ok(Self::with_api(Arc::new(api), options))
    }

    pub fn with_api(api: Arc<dyn GithubApi>, options: ServiceOptions) -> Self {
        Self { api, options }
    }
}

/// Split `owner/repo` into its owner and the (possibly nested) repository name.
pub fn parse_owner_repo(repository_id: &str) -> Result<(String, String), HostingError> {
    let mut parts = repository_id.trim().splitn(2, '/');
    let owner = parts.next().unwrap_or_default();
    let repo = parts.next().unwrap_or_default();
    if owner.is_empty() || repo.is_empty() {
        return Err(HostingError::Configuration(format!(
            "invalid repository '{repository_id}': expected 'owner/repo'"
        )));
    }
    Ok((owner.to_string(), repo.to_string()))
}

/// Map a GitHub file status to a [`ChangeKind`].
///
/// A rename that also carries a patch modified the file and counts as an edit.
pub fn change_kind(status: &str, has_patch: bool) -> ChangeKind {
    match status {
        "added" => ChangeKind::Add,
        "modified" | "changed" => ChangeKind::Edit,
        "removed" => ChangeKind::Delete,
        "renamed" if has_patch => ChangeKind::Edit,
        "renamed" => ChangeKind::Rename,
        "copied" => ChangeKind::Add,
        _ => ChangeKind::Unknown,
    }
}

struct FileTask {
    path: String,
    kind: ChangeKind,
    patch: Option<String>,
}

impl FileTask {
    fn from_file(file: PullRequestFile) -> Option<Self> {
        let path = file.filename.filter(|p| !p.is_empty())?;
        let patch = file.patch.filter(|p| !p.is_empty());
        let kind = change_kind(file.status.as_deref().unwrap_or_default(), patch.is_some());
        Some(Self { path, kind, patch })
    }
}

#[derive(Clone)]
struct FileContext {
    api: Arc<dyn GithubApi>,
    owner: String,
    repo: String,
    head_sha: Option<String>,
    throttle_mode: bool,
}

impl FileContext {
    async fn content_at_head(&self, path: &str) -> Result<String, HostingError> {
        let Some(sha) = self.head_sha.as_deref() else {
            return Ok(String::new());
        };
        self.api
            .get_content(&self.owner, &self.repo, path, sha)
            .await?
            .into_text()
    }

    async fn content_for(&self, task: &FileTask) -> Result<String, HostingError> {
        if !matches!(task.kind, ChangeKind::Add | ChangeKind::Edit) {
            return Ok(String::new());
        }
        if self.throttle_mode {
            if let Some(patch) = task.patch.as_deref() {
                return Ok(reduce_diff_output(patch));
            }
        }
        self.content_at_head(&task.path).await
    }
}

#[async_trait]
impl HostingService for GithubService {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn get_changes(
        &self,
        pr: &PullRequestCoordinates,
        filter: &FilterConfig,
        throttle_mode: bool,
    ) -> Result<Option<Vec<FileChangeDescriptor>>, HostingError> {
        let filter = filter.with_default_binaries();
        super::log_request_start(PROVIDER, pr, &filter, throttle_mode);

        let (owner, repo) = parse_owner_repo(&pr.repository_id)?;
        let number = pr.pull_request_id;

        let details = self.api.get_pull_request(&owner, &repo, number).await?;
        let head_sha = details.head_sha().map(str::to_string);
        if head_sha.is_none() {
            tracing::warn!(
                pull_request = number,
                "pull request has no head commit; full content unavailable"
            );
        }

        let files = self.api.list_pull_request_files(&owner, &repo, number).await?;
        if files.is_empty() {
            super::log_no_changes();
            return Ok(None);
        }

        let total = files.len();
        let tasks: Vec<FileTask> = files
            .into_iter()
            .filter_map(FileTask::from_file)
            .filter(|t| t.kind != ChangeKind::Delete && filter.includes(&t.path))
            .collect();

        let paths: Vec<&str> = tasks.iter().map(|t| t.path.as_str()).collect();
        super::log_filter_result(total, &paths);
        if tasks.is_empty() {
            super::log_no_changes();
            return Ok(None);
        }

        let ctx = FileContext {
            api: Arc::clone(&self.api),
            owner,
            repo,
            head_sha,
            throttle_mode,
        };

        let descriptors = super::fan_out(tasks, self.options.max_concurrent, |task| {
            let ctx = ctx.clone();
            async move {
                let result = ctx.content_for(&task).await;
                super::settle(task.path, task.kind, result)
            }
        })
        .await?;

        super::log_complete(descriptors.len(), throttle_mode);
        Ok(Some(descriptors))
    }

    async fn add_comment(
        &self,
        pr: &PullRequestCoordinates,
        content: &str,
        header: Option<&str>,
    ) -> Result<u64, HostingError> {
        let (owner, repo) = parse_owner_repo(&pr.repository_id)?;
        let body = super::compose_comment_body(content, header);

        let created = self
            .api
            .create_issue_comment(&owner, &repo, pr.pull_request_id, &body)
            .await
            .map_err(|e| match e.status() {
                Some(status @ (401 | 403)) => HostingError::PermissionDenied {
                    provider: PROVIDER,
                    status,
                    hint: PERMISSION_HINT,
                },
                _ => HostingError::CommentPost(e.to_string()),
            })?;

        let id = created.id.ok_or_else(|| {
            HostingError::CommentPost("response did not include a comment id".into())
        })?;
        tracing::info!(comment = id, pull_request = pr.pull_request_id, "comment posted");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_repo_parsing() {
        assert_eq!(
            parse_owner_repo("octo/widgets").unwrap(),
            ("octo".to_string(), "widgets".to_string())
        );
        assert_eq!(
            parse_owner_repo("octo/group/widgets").unwrap(),
            ("octo".to_string(), "group/widgets".to_string())
        );
        assert!(matches!(
            parse_owner_repo("widgets"),
            Err(HostingError::Configuration(_))
        ));
        assert!(parse_owner_repo("octo/").is_err());
        assert!(parse_owner_repo("/widgets").is_err());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(change_kind("added", true), ChangeKind::Add);
        assert_eq!(change_kind("modified", true), ChangeKind::Edit);
        assert_eq!(change_kind("removed", false), ChangeKind::Delete);
        assert_eq!(change_kind("renamed", false), ChangeKind::Rename);
        assert_eq!(change_kind("renamed", true), ChangeKind::Edit);
        assert_eq!(change_kind("unchanged", false), ChangeKind::Unknown);
    }
}
