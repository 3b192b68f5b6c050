//! Integration tests for the GitHub adapter against an in-memory GitHub API.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use pretty_assertions::assert_eq;

use pullscope::constants::CONTENT_UNAVAILABLE;
use pullscope::filter::FilterConfig;
use pullscope::hosting::github::GithubService;
use pullscope::hosting::github::client::{
    ContentResponse, FileContent, GithubApi, IssueComment, PullRequest, PullRequestFile,
    PullRequestHead,
};
use pullscope::hosting::{HostingError, HostingService, ServiceOptions};
use pullscope::models::{ChangeKind, FileChangeDescriptor, PullRequestCoordinates};

const HEAD: &str = "4f2c9e1";

#[derive(Default)]
struct MockGithub {
    files: Vec<PullRequestFile>,
    contents: HashMap<String, ContentResponse>,
    failing_paths: HashSet<String>,
    content_refs: Mutex<Vec<String>>,
    comment_error: Option<u16>,
    comment_id: Option<u64>,
    posted: Mutex<Vec<(String, String, u64, String)>>,
}

impl MockGithub {
    fn with_files(files: Vec<PullRequestFile>) -> Self {
        Self {
            files,
            comment_id: Some(1234),
            ..Self::default()
        }
    }

    fn content(mut self, path: &str, text: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(text);
        // GitHub wraps base64 content at 60 columns.
        let wrapped = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        self.contents.insert(
            path.to_string(),
            ContentResponse::File(FileContent {
                content: Some(wrapped),
                encoding: Some("base64".into()),
            }),
        );
        self
    }
}

#[async_trait]
impl GithubApi for MockGithub {
    async fn get_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<PullRequest, HostingError> {
        Ok(PullRequest {
            head: Some(PullRequestHead {
                sha: Some(HEAD.into()),
            }),
        })
    }

    async fn list_pull_request_files(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<PullRequestFile>, HostingError> {
        Ok(self.files.clone())
    }

    async fn get_content(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<ContentResponse, HostingError> {
        self.content_refs.lock().unwrap().push(git_ref.to_string());
        if self.failing_paths.contains(path) {
            return Err(HostingError::Api {
                provider: "GitHub",
                status: 404,
                body: r#"{"message":"Not Found"}"#.into(),
            });
        }
        Ok(self
            .contents
            .get(path)
            .cloned()
            .unwrap_or(ContentResponse::File(FileContent::default())))
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, HostingError> {
        if let Some(status) = self.comment_error {
            return Err(HostingError::Api {
                provider: "GitHub",
                status,
                body: r#"{"message":"Resource not accessible by integration"}"#.into(),
            });
        }
        self.posted
            .lock()
            .unwrap()
            .push((owner.into(), repo.into(), number, body.into()));
        Ok(IssueComment { id: self.comment_id })
    }
}

fn file(name: &str, status: &str, patch: Option<&str>) -> PullRequestFile {
    PullRequestFile {
        filename: Some(name.into()),
        status: Some(status.into()),
        patch: patch.map(str::to_string),
    }
}

fn service(api: MockGithub) -> (GithubService, Arc<MockGithub>) {
    let api = Arc::new(api);
    (GithubService::with_api(api.clone(), ServiceOptions::default()), api)
}

fn pr() -> PullRequestCoordinates {
    PullRequestCoordinates::new("", "octo/widgets", 42)
}

fn no_filter() -> FilterConfig {
    FilterConfig::new(Vec::<String>::new(), Vec::<String>::new())
}

fn sorted(mut changes: Vec<FileChangeDescriptor>) -> Vec<FileChangeDescriptor> {
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}

#[tokio::test]
async fn throttle_mode_reduces_patches() {
    let api = MockGithub::with_files(vec![
        file("README.md", "modified", Some("@@ -1 +1 @@\n-old\n+new")),
        file(
            "src/app.ts",
            "modified",
            Some("@@ -1,3 +1,3 @@\n const a = 1;\n-const b = 2;\n+const b = 20;\n const c = 3;"),
        ),
        file("assets/logo.png", "modified", None),
    ]);
    let (svc, _) = service(api);

    let changes = svc.get_changes(&pr(), &no_filter(), true).await.unwrap().unwrap();

    assert_eq!(
        changes,
        vec![FileChangeDescriptor::new(
            "src/app.ts",
            ChangeKind::Edit,
            "@@ -1,3 +1,3 @@\n-const b = 2;\n+const b = 20;"
        )]
    );
}

#[tokio::test]
async fn missing_patch_falls_back_to_content_at_head() {
    let api = MockGithub::with_files(vec![file("src/big.ts", "modified", None)])
        .content("src/big.ts", "export const huge = true;\n".repeat(40).as_str());
    let (svc, api) = service(api);

    let changes = svc.get_changes(&pr(), &no_filter(), true).await.unwrap().unwrap();

    assert_eq!(changes[0].content, "export const huge = true;\n".repeat(40));
    assert_eq!(*api.content_refs.lock().unwrap(), vec![HEAD.to_string()]);
}

#[tokio::test]
async fn full_content_mode_ignores_patches() {
    let api = MockGithub::with_files(vec![file(
        "src/lib.rs",
        "added",
        Some("@@ -0,0 +1 @@\n+pub fn f() {}"),
    )])
    .content("src/lib.rs", "pub fn f() {}\n");
    let (svc, _) = service(api);

    let changes = svc.get_changes(&pr(), &no_filter(), false).await.unwrap().unwrap();
    assert_eq!(
        changes,
        vec![FileChangeDescriptor::new("src/lib.rs", ChangeKind::Add, "pub fn f() {}\n")]
    );
}

#[tokio::test]
async fn removed_files_are_excluded() {
    let api = MockGithub::with_files(vec![
        file("src/gone.ts", "removed", Some("@@ -1 +0,0 @@\n-x")),
        file("src/kept.ts", "added", Some("@@ -0,0 +1 @@\n+y")),
    ]);
    let (svc, _) = service(api);

    let changes = svc.get_changes(&pr(), &no_filter(), true).await.unwrap().unwrap();
    let paths: Vec<_> = changes.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["src/kept.ts"]);
}

#[tokio::test]
async fn no_changed_files_means_nothing_to_review() {
    let (svc, _) = service(MockGithub::with_files(vec![]));
    assert!(svc.get_changes(&pr(), &no_filter(), true).await.unwrap().is_none());

    let (svc, _) = service(MockGithub::with_files(vec![file("notes.txt", "added", None)]));
    assert!(svc.get_changes(&pr(), &no_filter(), true).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_content_fetch_is_isolated() {
    let mut api = MockGithub::with_files(vec![
        file("a.ts", "modified", None),
        file("b.ts", "modified", None),
    ])
    .content("a.ts", "fine");
    api.failing_paths.insert("b.ts".into());
    let (svc, _) = service(api);

    let changes = sorted(svc.get_changes(&pr(), &no_filter(), false).await.unwrap().unwrap());
    assert_eq!(changes[0].content, "fine");
    assert_eq!(changes[1].content, CONTENT_UNAVAILABLE);
    assert!(changes[1].is_unavailable());
    assert!(changes[1].error.as_deref().unwrap().contains("404"));
}

#[tokio::test]
async fn directory_content_is_empty() {
    let mut api = MockGithub::with_files(vec![file("vendor/lib", "added", None)]);
    api.contents.insert(
        "vendor/lib".into(),
        ContentResponse::Directory(vec![serde_json::json!({"name": "mod.rs"})]),
    );
    let (svc, _) = service(api);

    let changes = svc.get_changes(&pr(), &no_filter(), false).await.unwrap().unwrap();
    assert_eq!(changes[0].content, "");
    assert!(changes[0].error.is_none());
}

#[tokio::test]
async fn renames_map_by_patch_presence() {
    let api = MockGithub::with_files(vec![
        file("src/moved.ts", "renamed", None),
        file("src/reworked.ts", "renamed", Some("@@ -1 +1 @@\n-a\n+b")),
    ]);
    let (svc, _) = service(api);

    let changes = sorted(svc.get_changes(&pr(), &no_filter(), true).await.unwrap().unwrap());
    assert_eq!(
        changes,
        vec![
            FileChangeDescriptor::new("src/moved.ts", ChangeKind::Rename, ""),
            FileChangeDescriptor::new("src/reworked.ts", ChangeKind::Edit, "@@ -1 +1 @@\n-a\n+b"),
        ]
    );
}

#[tokio::test]
async fn malformed_repository_is_a_configuration_error() {
    let (svc, _) = service(MockGithub::with_files(vec![]));
    let bad = PullRequestCoordinates::new("", "widgets", 42);

    let err = svc.get_changes(&bad, &no_filter(), true).await.unwrap_err();
    assert!(matches!(err, HostingError::Configuration(_)), "got: {err}");

    let err = svc.add_comment(&bad, "x", None).await.unwrap_err();
    assert!(matches!(err, HostingError::Configuration(_)), "got: {err}");
}

#[tokio::test]
async fn comment_is_posted_on_the_pull_request() {
    let (svc, api) = service(MockGithub::with_files(vec![]));

    let id = svc
        .add_comment(&pr(), "Looks good overall.", Some("AI Code Review"))
        .await
        .unwrap();

    assert_eq!(id, 1234);
    let posted = api.posted.lock().unwrap();
    assert_eq!(
        posted[0],
        (
            "octo".to_string(),
            "widgets".to_string(),
            42,
            "# AI Code Review\nLooks good overall.".to_string()
        )
    );
}

#[tokio::test]
async fn unauthorized_comment_surfaces_permission_hint() {
    let mut api = MockGithub::with_files(vec![]);
    api.comment_error = Some(401);
    let (svc, _) = service(api);

    let err = svc.add_comment(&pr(), "x", None).await.unwrap_err();
    assert!(matches!(err, HostingError::PermissionDenied { status: 401, .. }));
    assert!(err.to_string().contains("pull-requests: write"));
}

#[tokio::test]
async fn comment_without_id_is_an_error() {
    let mut api = MockGithub::with_files(vec![]);
    api.comment_id = None;
    let (svc, _) = service(api);

    let err = svc.add_comment(&pr(), "x", None).await.unwrap_err();
    assert!(matches!(err, HostingError::CommentPost(_)), "got: {err}");
}
