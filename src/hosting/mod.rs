//! Hosting-provider adapters behind one contract.
//!
//! [`HostingService`] is the capability every provider offers: resolve the
//! changed files of a pull request into normalized descriptors, and post a
//! review comment. Two adapters implement it (Azure DevOps and GitHub);
//! callers obtain them through [`registry::HostingRegistry`].

pub mod azure;
pub mod github;
pub mod http;
pub mod registry;
pub mod retry;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::diff::{DiffError, DiffRenderer};
use crate::filter::FilterConfig;
use crate::models::{ChangeKind, FileChangeDescriptor, PullRequestCoordinates};

pub use registry::{HostingConfig, HostingRegistry, ProviderFamily, detect_provider};
pub use retry::RetryPolicy;

/// Errors from hosting-provider operations.
#[derive(Error, Debug)]
pub enum HostingError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot resolve pull request {pull_request_id}: {reason}")]
    Resolution { pull_request_id: u64, reason: String },

    #[error("{provider} denied the comment (HTTP {status}): {hint}")]
    PermissionDenied {
        provider: &'static str,
        status: u16,
        hint: &'static str,
    },

    #[error("failed to create comment: {0}")]
    CommentPost(String),

    #[error("unsupported hosting provider: {0}")]
    UnsupportedProvider(String),

    #[error("hosting service '{0}' is not registered")]
    NotRegistered(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API returned HTTP {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("file task aborted: {0}")]
    TaskFailed(String),
}

impl HostingError {
    /// HTTP status carried by an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            HostingError::Api { status, .. } | HostingError::PermissionDenied { status, .. } => {
                Some(*status)
            }
            HostingError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            HostingError::Api { status, .. } => *status == 429 || *status >= 500,
            HostingError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` for 401/403 responses.
    pub fn is_permission_error(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// The uniform contract every hosting provider adapter implements.
#[async_trait]
pub trait HostingService: Send + Sync {
    /// Human-readable provider name used in logs and errors.
    fn provider_name(&self) -> &'static str;

    /// Resolve the pull request's changed files into descriptors.
    ///
    /// Returns `Ok(None)` when there is nothing to review: no iterations,
    /// no changed files, or every file filtered out. When `throttle_mode`
    /// is set only reduced diffs are produced; otherwise full file bodies.
    async fn get_changes(
        &self,
        pr: &PullRequestCoordinates,
        filter: &FilterConfig,
        throttle_mode: bool,
    ) -> Result<Option<Vec<FileChangeDescriptor>>, HostingError>;

    /// Post a single top-level comment and return its identifier.
    async fn add_comment(
        &self,
        pr: &PullRequestCoordinates,
        content: &str,
        header: Option<&str>,
    ) -> Result<u64, HostingError>;
}

/// Tunables shared by both adapters.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Upper bound on concurrent file tasks. `None` launches every file at once.
    pub max_concurrent: Option<usize>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub diff: DiffRenderer,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_concurrent: None,
            retry: RetryPolicy::default(),
            request_timeout: http::DEFAULT_REQUEST_TIMEOUT,
            diff: DiffRenderer::default(),
        }
    }
}

/// Compose the posted comment body: `# {header}\n{content}` when a header is given.
pub fn compose_comment_body(content: &str, header: Option<&str>) -> String {
    match header.filter(|h| !h.trim().is_empty()) {
        Some(h) => format!("# {h}\n{content}"),
        None => content.to_string(),
    }
}

/// Run one task per file and collect the resulting descriptors.
///
/// Tasks are spawned on a [`JoinSet`] and gathered in completion order.
/// Each task is expected to convert its own failure into a descriptor; a
/// task that panics aborts the batch with [`HostingError::TaskFailed`].
pub(crate) async fn fan_out<T, F, Fut>(
    items: Vec<T>,
    max_concurrent: Option<usize>,
    task: F,
) -> Result<Vec<FileChangeDescriptor>, HostingError>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = FileChangeDescriptor> + Send + 'static,
{
    let semaphore = max_concurrent.map(|n| Arc::new(Semaphore::new(n.max(1))));
    let mut join_set = JoinSet::new();

    for item in items {
        let work = task(item);
        let sem = semaphore.clone();
        join_set.spawn(async move {
            let _permit = match sem {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            work.await
        });
    }

    let mut descriptors = Vec::with_capacity(join_set.len());
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) => {
                join_set.abort_all();
                return Err(HostingError::TaskFailed(e.to_string()));
            }
        }
    }

    Ok(descriptors)
}

/// Turn a per-file result into a descriptor, downgrading failure to the sentinel.
pub(crate) fn settle(
    path: String,
    kind: ChangeKind,
    result: Result<String, HostingError>,
) -> FileChangeDescriptor {
    match result {
        Ok(content) => FileChangeDescriptor::new(path, kind, content),
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "failed to get change content");
            FileChangeDescriptor::unavailable(path, kind, e)
        }
    }
}

pub(crate) fn log_request_start(
    provider: &str,
    pr: &PullRequestCoordinates,
    filter: &FilterConfig,
    throttle_mode: bool,
) {
    let mut allow = join_set_for_log(&filter.file_extensions);
    if allow.is_empty() {
        allow = "none (all non-binary files)".to_string();
    }
    tracing::info!(
        provider,
        project = %pr.project_name,
        repository = %pr.repository_id,
        pull_request = pr.pull_request_id,
        "retrieving pull request changes"
    );
    tracing::info!(
        file_extensions = %allow,
        binary_extensions = %join_set_for_log(&filter.binary_extensions),
        mode = if throttle_mode { "diff only" } else { "full content" },
        "change filter"
    );
}

pub(crate) fn log_filter_result(total: usize, paths: &[&str]) {
    tracing::info!(
        total,
        remaining = paths.len(),
        "filtered changed files"
    );
    tracing::debug!(files = %paths.join(", "), "files to be processed");
}

pub(crate) fn log_no_changes() {
    tracing::info!("no matching code changes detected");
}

pub(crate) fn log_complete(count: usize, throttle_mode: bool) {
    if throttle_mode {
        tracing::info!(files = count, "completed diff comparison");
    } else {
        tracing::info!(files = count, "retrieved full content");
    }
}

fn join_set_for_log(set: &std::collections::BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
