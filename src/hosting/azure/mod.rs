//! Azure DevOps adapter.
//!
//! Resolves the latest iteration of a pull request, keeps the change entries
//! that survive the filter, and fetches each file's content (or a reduced
//! diff against the original blob) concurrently.

pub mod client;

use std::sync::Arc;

use async_trait::async_trait;

use client::{AzureReposApi, AzureRestClient, ChangeEntry, NewCommentThread, PROVIDER};

use super::{HostingError, HostingService, ServiceOptions};
use crate::diff::{DiffRenderer, render_added};
use crate::filter::FilterConfig;
use crate::models::{ChangeKind, FileChangeDescriptor, PullRequestCoordinates};

/// Page size when listing iteration changes.
const CHANGES_PAGE_SIZE: u32 = 100;

const PERMISSION_HINT: &str = "ensure the build service account has \
     'Contribute to pull requests' permission on the repository";

pub struct AzureDevOpsService {
    api: Arc<dyn AzureReposApi>,
    options: ServiceOptions,
}

impl AzureDevOpsService {
    /// Build an adapter talking to the REST API at `organization_url`.
    pub fn new(
        access_token: &str,
        organization_url: Option<&str>,
        options: ServiceOptions,
    ) -> Result<Self, HostingError> {
        if access_token.trim().is_empty() {
            return Err(HostingError::Configuration(
                "an access token is required for Azure DevOps".into(),
            ));
        }
        let organization_url = organization_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                HostingError::Configuration(
                    "an organization URL is required for Azure DevOps".into(),
                )
            })?;
        let api = AzureRestClient::new(access_token, organization_url, &options)?;
        Ok(Self::with_api(Arc::new(api), options))
    }

    /// Build an adapter over an arbitrary API implementation.
    pub fn with_api(api: Arc<dyn AzureReposApi>, options: ServiceOptions) -> Self {
        Self { api, options }
    }

    /// Change entries of the latest iteration, or `None` when there are none.
    async fn latest_iteration_changes(
        &self,
        pr: &PullRequestCoordinates,
    ) -> Result<Option<Vec<ChangeEntry>>, HostingError> {
        let project = pr.project_name.as_str();
        let repo = pr.repository_id.as_str();
        let id = pr.pull_request_id;

        let details = self.api.get_pull_request(project, repo, id).await?;
        let has_commit = |c: &Option<client::GitCommitRef>| {
            c.as_ref()
                .and_then(|c| c.commit_id.as_deref())
                .is_some_and(|s| !s.is_empty())
        };
        if !has_commit(&details.last_merge_source_commit)
            || !has_commit(&details.last_merge_target_commit)
        {
            return Err(HostingError::Resolution {
                pull_request_id: id,
                reason: "unable to get pull request information (missing merge commits)".into(),
            });
        }

        let iterations = self.api.list_iterations(project, repo, id).await?;
        let Some(iteration_id) = iterations.last().and_then(|it| it.id) else {
            return Ok(None);
        };
        tracing::debug!(
            iteration = iteration_id,
            count = iterations.len(),
            "using latest iteration"
        );

        let mut entries = Vec::new();
        let mut skip = 0;
        loop {
            let page = self
                .api
                .iteration_changes(project, repo, id, iteration_id, CHANGES_PAGE_SIZE, skip)
                .await?;
            entries.extend(page.change_entries);
            match page.next_skip {
                Some(next) if next > skip => skip = next,
                _ => break,
            }
        }

        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(entries))
    }
}

/// One file to resolve, detached from the API response so it can move into a task.
struct FileTask {
    path: String,
    kind: ChangeKind,
    object_id: Option<String>,
    original_object_id: Option<String>,
}

impl FileTask {
    fn from_entry(entry: ChangeEntry) -> Option<Self> {
        let kind = entry.change_type.kind();
        let item = entry.item?;
        let path = item.path.filter(|p| !p.is_empty())?;
        Some(Self {
            path,
            kind,
            object_id: item.object_id,
            original_object_id: item.original_object_id,
        })
    }
}

/// Shared per-call context for file tasks.
#[derive(Clone)]
struct FileContext {
    api: Arc<dyn AzureReposApi>,
    diff: DiffRenderer,
    project: String,
    repository_id: String,
    throttle_mode: bool,
}

impl FileContext {
    async fn blob_text(&self, object_id: &str) -> Result<String, HostingError> {
        let bytes = self
            .api
            .blob_content(&self.project, &self.repository_id, object_id)
            .await?;
        Ok(bytes
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default())
    }

    async fn content_for(&self, task: &FileTask) -> Result<String, HostingError> {
        if !matches!(task.kind, ChangeKind::Add | ChangeKind::Edit) {
            return Ok(String::new());
        }

        let object_id = task
            .object_id
            .as_deref()
            .ok_or_else(|| HostingError::Decode("change entry has no object id".into()))?;
        let current = self.blob_text(object_id).await?;

        if !self.throttle_mode {
            return Ok(current);
        }

        match (task.kind, task.original_object_id.as_deref()) {
            (ChangeKind::Add, _) => Ok(render_added(&current)),
            (ChangeKind::Edit, Some(original_id)) => {
                let original = self.blob_text(original_id).await?;
                Ok(self.diff.render_diff(&current, &original).await?)
            }
            _ => Ok(current),
        }
    }
}

#[async_trait]
impl HostingService for AzureDevOpsService {
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

        let Some(entries) = self.latest_iteration_changes(pr).await? else {
            super::log_no_changes();
            return Ok(None);
        };

        let total = entries.len();
        let tasks: Vec<FileTask> = entries
            .into_iter()
            .filter_map(FileTask::from_entry)
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
            diff: self.options.diff.clone(),
            project: pr.project_name.clone(),
            repository_id: pr.repository_id.clone(),
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
        let thread = NewCommentThread::text(super::compose_comment_body(content, header));
        let created = self
            .api
            .create_thread(&pr.project_name, &pr.repository_id, pr.pull_request_id, &thread)
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
            HostingError::CommentPost("response did not include a thread id".into())
        })?;
        tracing::info!(thread = id, pull_request = pr.pull_request_id, "comment posted");
        Ok(id)
    }
}
