//! Azure DevOps Git REST API surface used by the adapter.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use crate::hosting::HostingError;
use crate::hosting::ServiceOptions;
use crate::hosting::http::{self, ApiClient, Auth};
use crate::models::ChangeKind;

pub const PROVIDER: &str = "Azure DevOps";
const API_VERSION: &str = "7.1";

/// The Azure Repos calls the adapter depends on.
///
/// An empty `project` addresses the repository by id alone.
#[async_trait]
pub trait AzureReposApi: Send + Sync {
    async fn get_pull_request(
        &self,
        project: &str,
        repository_id: &str,
        pull_request_id: u64,
    ) -> Result<GitPullRequest, HostingError>;

    async fn list_iterations(
        &self,
        project: &str,
        repository_id: &str,
        pull_request_id: u64,
    ) -> Result<Vec<PullRequestIteration>, HostingError>;

    /// One page of an iteration's change entries.
    async fn iteration_changes(
        &self,
        project: &str,
        repository_id: &str,
        pull_request_id: u64,
        iteration_id: u32,
        top: u32,
        skip: u32,
    ) -> Result<IterationChanges, HostingError>;

    /// Raw blob bytes, or `None` when the service returns no body.
    async fn blob_content(
        &self,
        project: &str,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Option<Vec<u8>>, HostingError>;

    async fn create_thread(
        &self,
        project: &str,
        repository_id: &str,
        pull_request_id: u64,
        thread: &NewCommentThread,
    ) -> Result<CommentThread, HostingError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitPullRequest {
    #[serde(default)]
    pub last_merge_source_commit: Option<GitCommitRef>,
    #[serde(default)]
    pub last_merge_target_commit: Option<GitCommitRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommitRef {
    #[serde(default)]
    pub commit_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestIteration {
    #[serde(default)]
    pub id: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationChanges {
    #[serde(default)]
    pub change_entries: Vec<ChangeEntry>,
    #[serde(default)]
    pub next_skip: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    #[serde(default)]
    pub change_type: ChangeTypeFlags,
    #[serde(default)]
    pub item: Option<ChangeItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub original_object_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// `VersionControlChangeType` bit flags.
///
/// The service sends either the numeric value or a comma-separated list of
/// names (`"rename, edit"`); both forms are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawChangeType")]
pub struct ChangeTypeFlags(pub u32);

impl ChangeTypeFlags {
    pub const ADD: u32 = 1;
    pub const EDIT: u32 = 2;
    pub const RENAME: u32 = 8;
    pub const DELETE: u32 = 16;
    pub const UNDELETE: u32 = 32;
    pub const SOURCE_RENAME: u32 = 1024;
    pub const TARGET_RENAME: u32 = 2048;

    fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// Collapse the flag set to a single [`ChangeKind`].
    ///
    /// Delete dominates, then add, then edit (so a rename with edits is an
    /// edit); a pure rename stays a rename.
    pub fn kind(self) -> ChangeKind {
        if self.has(Self::DELETE) {
            ChangeKind::Delete
        } else if self.has(Self::ADD) || self.has(Self::UNDELETE) {
            ChangeKind::Add
        } else if self.has(Self::EDIT) {
            ChangeKind::Edit
        } else if self.has(Self::RENAME | Self::SOURCE_RENAME | Self::TARGET_RENAME) {
            ChangeKind::Rename
        } else {
            ChangeKind::Unknown
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChangeType {
    Code(u32),
    Names(String),
}

impl From<RawChangeType> for ChangeTypeFlags {
    fn from(raw: RawChangeType) -> Self {
        match raw {
            RawChangeType::Code(code) => Self(code),
            RawChangeType::Names(names) => Self(
                names
                    .split(',')
                    .map(|n| flag_for_name(n.trim()))
                    .fold(0, |acc, f| acc | f),
            ),
        }
    }
}

fn flag_for_name(name: &str) -> u32 {
    match name.to_ascii_lowercase().as_str() {
        "add" => 1,
        "edit" => 2,
        "encoding" => 4,
        "rename" => 8,
        "delete" => 16,
        "undelete" => 32,
        "branch" => 64,
        "merge" => 128,
        "lock" => 256,
        "rollback" => 512,
        "sourcerename" => 1024,
        "targetrename" => 2048,
        "property" => 4096,
        "all" => 8191,
        _ => 0,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentThread {
    #[serde(default)]
    pub id: Option<u64>,
}

/// Body of a `POST .../threads` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCommentThread {
    pub comments: Vec<NewComment>,
    /// `1` = active.
    pub status: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub parent_comment_id: u32,
    pub content: String,
    /// `1` = text.
    pub comment_type: u8,
}

impl NewCommentThread {
    /// An active thread holding one top-level text comment.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            comments: vec![NewComment {
                parent_comment_id: 0,
                content: content.into(),
                comment_type: 1,
            }],
            status: 1,
        }
    }
}

#[derive(Deserialize)]
struct ValueList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// [`AzureReposApi`] over the Azure DevOps REST API.
pub struct AzureRestClient {
    http: ApiClient,
    organization_url: Url,
}

impl AzureRestClient {
    /// Authenticates with the personal access token as a basic-auth password.
    pub fn new(
        access_token: &str,
        organization_url: &str,
        options: &ServiceOptions,
    ) -> Result<Self, HostingError> {
        let organization_url = http::parse_base_url(organization_url)?;
        let http = ApiClient::new(
            PROVIDER,
            Auth::BasicToken(access_token.to_string()),
            HeaderMap::new(),
            options.request_timeout,
            options.retry,
        )?;
        Ok(Self {
            http,
            organization_url,
        })
    }

    fn repo_url(
        &self,
        project: &str,
        repository_id: &str,
        tail: &[&str],
    ) -> Result<Url, HostingError> {
        let project = Some(project).filter(|p| !p.is_empty());
        let segments = project
            .into_iter()
            .chain(["_apis", "git", "repositories", repository_id])
            .chain(tail.iter().copied());
        let mut url = http::join_segments(&self.organization_url, segments)?;
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }
}

#[async_trait]
impl AzureReposApi for AzureRestClient {
    async fn get_pull_request(
        &self,
        project: &str,
        repository_id: &str,
        pull_request_id: u64,
    ) -> Result<GitPullRequest, HostingError> {
        let id = pull_request_id.to_string();
        let url = self.repo_url(project, repository_id, &["pullRequests", &id])?;
        self.http.get_json(url).await
    }

    async fn list_iterations(
        &self,
        project: &str,
        repository_id: &str,
        pull_request_id: u64,
    ) -> Result<Vec<PullRequestIteration>, HostingError> {
        let id = pull_request_id.to_string();
        let url = self.repo_url(project, repository_id, &["pullRequests", &id, "iterations"])?;
        let list: ValueList<PullRequestIteration> = self.http.get_json(url).await?;
        Ok(list.value)
    }

    async fn iteration_changes(
        &self,
        project: &str,
        repository_id: &str,
        pull_request_id: u64,
        iteration_id: u32,
        top: u32,
        skip: u32,
    ) -> Result<IterationChanges, HostingError> {
        let id = pull_request_id.to_string();
        let iteration = iteration_id.to_string();
        let mut url = self.repo_url(
            project,
            repository_id,
            &["pullRequests", &id, "iterations", &iteration, "changes"],
        )?;
        url.query_pairs_mut()
            .append_pair("$top", &top.to_string())
            .append_pair("$skip", &skip.to_string());
        self.http.get_json(url).await
    }

    async fn blob_content(
        &self,
        project: &str,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Option<Vec<u8>>, HostingError> {
        let mut url = self.repo_url(project, repository_id, &["blobs", object_id])?;
        url.query_pairs_mut().append_pair("$format", "octetStream");
        let resp = self
            .http
            .send(Method::GET, url, None, Some("application/octet-stream"))
            .await?;
        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(resp.bytes().await?.to_vec()))
    }

    async fn create_thread(
        &self,
        project: &str,
        repository_id: &str,
        pull_request_id: u64,
        thread: &NewCommentThread,
    ) -> Result<CommentThread, HostingError> {
        let id = pull_request_id.to_string();
        let url = self.repo_url(project, repository_id, &["pullRequests", &id, "threads"])?;
        self.http.post_json(url, thread).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn change_type_accepts_numbers_and_names() {
        let numeric: ChangeEntry = serde_json::from_str(r#"{"changeType": 2}"#).unwrap();
        assert_eq!(numeric.change_type.kind(), ChangeKind::Edit);

        let named: ChangeEntry = serde_json::from_str(r#"{"changeType": "rename, edit"}"#).unwrap();
        assert_eq!(named.change_type.0, 10);
        assert_eq!(named.change_type.kind(), ChangeKind::Edit);

        let missing: ChangeEntry = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.change_type.kind(), ChangeKind::Unknown);
    }

    #[test]
    fn change_type_kind_mapping() {
        assert_eq!(ChangeTypeFlags(1).kind(), ChangeKind::Add);
        assert_eq!(ChangeTypeFlags(16).kind(), ChangeKind::Delete);
        assert_eq!(ChangeTypeFlags(8).kind(), ChangeKind::Rename);
        assert_eq!(ChangeTypeFlags(1024).kind(), ChangeKind::Rename);
        assert_eq!(ChangeTypeFlags(8 | 16).kind(), ChangeKind::Delete);
        assert_eq!(ChangeTypeFlags(4).kind(), ChangeKind::Unknown);
    }

    #[test]
    fn iteration_changes_deserialize() {
        let json = r#"{
            "changeEntries": [
                {"changeType": "edit", "item": {"objectId": "b2", "originalObjectId": "b1", "path": "/src/a.ts"}},
                {"changeType": "delete", "item": {"path": "/old.ts"}}
            ],
            "nextSkip": 100,
            "nextTop": 100
        }"#;
        let changes: IterationChanges = serde_json::from_str(json).unwrap();
        assert_eq!(changes.change_entries.len(), 2);
        let item = changes.change_entries[0].item.as_ref().unwrap();
        assert_eq!(item.path.as_deref(), Some("/src/a.ts"));
        assert_eq!(item.original_object_id.as_deref(), Some("b1"));
        assert_eq!(changes.next_skip, Some(100));
    }

    #[test]
    fn new_thread_wire_shape() {
        let thread = NewCommentThread::text("# Header\nbody");
        let value = serde_json::to_value(&thread).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "comments": [{"parentCommentId": 0, "content": "# Header\nbody", "commentType": 1}],
                "status": 1
            })
        );
    }

    #[test]
    fn repo_url_with_and_without_project() {
        let client = AzureRestClient::new(
            "pat",
            "https://dev.azure.com/contoso",
            &ServiceOptions::default(),
        )
        .unwrap();

        let url = client.repo_url("Web App", "repo-1", &["pullRequests", "7"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/Web%20App/_apis/git/repositories/repo-1/pullRequests/7?api-version=7.1"
        );

        let url = client.repo_url("", "repo-1", &["blobs", "abc"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/_apis/git/repositories/repo-1/blobs/abc?api-version=7.1"
        );
    }
}
