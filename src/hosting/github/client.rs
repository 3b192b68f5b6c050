//! GitHub REST API surface used by the adapter.

use std::future::Future;
use std::sync::LazyLock;

use async_trait::async_trait;
use base64::Engine;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use crate::hosting::HostingError;
use crate::hosting::ServiceOptions;
use crate::hosting::http::{self, ApiClient, Auth};

pub const PROVIDER: &str = "GitHub";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: &str = "100";

static NEXT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).unwrap());

/// The GitHub calls the adapter depends on.
#[async_trait]
pub trait GithubApi: Send + Sync {
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, HostingError>;

    /// Every changed file of the pull request, across all pages.
    async fn list_pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<PullRequestFile>, HostingError>;

    async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<ContentResponse, HostingError>;

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, HostingError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub head: Option<PullRequestHead>,
}

impl PullRequest {
    pub fn head_sha(&self) -> Option<&str> {
        self.head
            .as_ref()
            .and_then(|h| h.sha.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestHead {
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub patch: Option<String>,
}

/// Response of the contents endpoint: a file object or a directory listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentResponse {
    Directory(Vec<serde_json::Value>),
    File(FileContent),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileContent {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ContentResponse {
    /// Decoded file text. Directories and empty files decode to `""`.
    pub fn into_text(self) -> Result<String, HostingError> {
        let file = match self {
            ContentResponse::Directory(_) => return Ok(String::new()),
            ContentResponse::File(file) => file,
        };
        let Some(content) = file.content.filter(|c| !c.is_empty()) else {
            return Ok(String::new());
        };
        match file.encoding.as_deref() {
            None | Some("base64") => {
                let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map_err(|e| HostingError::Decode(format!("invalid base64 content: {e}")))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some(_) => Ok(content),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Serialize)]
struct NewIssueComment<'a> {
    body: &'a str,
}

/// Resolve the API base URL from a configured organization URL.
///
/// Anything whose host is `github.com` (or a subdomain of it) maps to the
/// public API; other hosts are treated as an Enterprise API base and used
/// as given, minus trailing slashes.
pub fn api_base_url(organization_url: Option<&str>) -> String {
    let Some(raw) = organization_url.map(str::trim).filter(|u| !u.is_empty()) else {
        return DEFAULT_API_URL.to_string();
    };
    let trimmed = raw.trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
            if host.ends_with("github.com") {
                DEFAULT_API_URL.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Extract the `rel="next"` target from a `Link` header.
pub fn parse_next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    NEXT_LINK
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Fetch `first` and every page its `rel="next"` links lead to.
///
/// `fetch` returns one page of items plus the next page URL, if any. A next
/// link pointing back at the page just fetched ends the walk.
pub(crate) async fn collect_pages<T, F, Fut>(
    first: Url,
    mut fetch: F,
) -> Result<Vec<T>, HostingError>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<Url>), HostingError>>,
{
    let mut items = Vec::new();
    let mut next = Some(first);
    let mut pages = 0usize;
    while let Some(url) = next.take() {
        let (page, link) = fetch(url.clone()).await?;
        pages += 1;
        items.extend(page);
        next = link.filter(|l| *l != url);
    }
    tracing::trace!(pages, "walked paginated listing");
    Ok(items)
}

/// [`GithubApi`] over the GitHub REST API.
pub struct GithubRestClient {
    http: ApiClient,
    base_url: Url,
}

impl GithubRestClient {
    pub fn new(
        token: &str,
        organization_url: Option<&str>,
        options: &ServiceOptions,
    ) -> Result<Self, HostingError> {
        let base_url = http::parse_base_url(&api_base_url(organization_url))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static("2022-11-28"),
        );
        let http = ApiClient::new(
            PROVIDER,
            Auth::Bearer(token.to_string()),
            headers,
            options.request_timeout,
            options.retry,
        )?;
        Ok(Self { http, base_url })
    }

    fn repo_url(&self, owner: &str, repo: &str, tail: &[&str]) -> Result<Url, HostingError> {
        // `repo` may itself contain slashes; each part becomes its own segment.
        let segments = ["repos", owner]
            .into_iter()
            .chain(repo.split('/'))
            .chain(tail.iter().copied());
        http::join_segments(&self.base_url, segments)
    }
}

#[async_trait]
impl GithubApi for GithubRestClient {
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, HostingError> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["pulls", &number])?;
        self.http.get_json(url).await
    }

    async fn list_pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<PullRequestFile>, HostingError> {
        let number = number.to_string();
        let mut url = self.repo_url(owner, repo, &["pulls", &number, "files"])?;
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);

        let files = collect_pages(url, |url| async move {
            let resp = self.http.send(Method::GET, url, None, None).await?;
            let next = parse_next_link(resp.headers()).and_then(|link| Url::parse(&link).ok());
            let page: Vec<PullRequestFile> = http::decode_json(resp).await?;
            Ok((page, next))
        })
        .await?;
        tracing::debug!(files = files.len(), "listed pull request files");
        Ok(files)
    }

    async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<ContentResponse, HostingError> {
        let url = self.repo_url(owner, repo, &["contents"])?;
        let mut url = http::join_segments(&url, path.split('/').filter(|s| !s.is_empty()))?;
        url.query_pairs_mut().append_pair("ref", git_ref);
        self.http.get_json(url).await
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, HostingError> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["issues", &number, "comments"])?;
        self.http.post_json(url, &NewIssueComment { body }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn api_base_url_defaults_and_enterprise() {
        assert_eq!(api_base_url(None), DEFAULT_API_URL);
        assert_eq!(api_base_url(Some("  ")), DEFAULT_API_URL);
        assert_eq!(api_base_url(Some("https://github.com/")), DEFAULT_API_URL);
        assert_eq!(api_base_url(Some("https://api.github.com")), DEFAULT_API_URL);
        assert_eq!(
            api_base_url(Some("https://ghe.corp.example/api/v3///")),
            "https://ghe.corp.example/api/v3"
        );
        assert_eq!(api_base_url(Some("not a url/")), "not a url");
    }

    #[test]
    fn next_link_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::LINK,
            HeaderValue::from_static(
                r#"<https://api.github.com/repositories/1/pulls/2/files?per_page=100&page=2>; rel="next", <https://api.github.com/repositories/1/pulls/2/files?per_page=100&page=5>; rel="last""#,
            ),
        );
        assert_eq!(
            parse_next_link(&headers).as_deref(),
            Some("https://api.github.com/repositories/1/pulls/2/files?per_page=100&page=2")
        );
    }

    #[test]
    fn no_next_link_on_last_page() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::LINK,
            HeaderValue::from_static(r#"<https://api.github.com/x?page=1>; rel="prev""#),
        );
        assert_eq!(parse_next_link(&headers), None);
        assert_eq!(parse_next_link(&HeaderMap::new()), None);
    }

    #[test]
    fn content_decodes_wrapped_base64() {
        let json = r#"{"type":"file","encoding":"base64","content":"aGVsbG8g\nd29ybGQ=\n"}"#;
        let content: ContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(content.into_text().unwrap(), "hello world");
    }

    #[test]
    fn directory_listing_is_empty_text() {
        let content: ContentResponse = serde_json::from_str(r#"[{"name":"a.rs"}]"#).unwrap();
        assert_eq!(content.into_text().unwrap(), "");
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let content = ContentResponse::File(FileContent {
            content: Some("!!!".into()),
            encoding: Some("base64".into()),
        });
        assert!(matches!(content.into_text(), Err(HostingError::Decode(_))));
    }

    #[test]
    fn repo_url_splits_nested_repo_names() {
        let client = GithubRestClient::new(
            "t",
            Some("https://ghe.corp.example/api/v3"),
            &ServiceOptions::default(),
        )
        .unwrap();
        let url = client.repo_url("org", "group/app", &["pulls", "3"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.corp.example/api/v3/repos/org/group/app/pulls/3"
        );
    }

    fn page_url(page: u32) -> Url {
        Url::parse(&format!(
            "https://api.github.com/repos/o/r/pulls/1/files?per_page=100&page={page}"
        ))
        .unwrap()
    }

    /// Serve three pages, each linking to the next through a `Link` header.
    fn linked_page(url: &Url) -> (Vec<PullRequestFile>, Option<Url>) {
        let page: u32 = url
            .query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(1);
        let mut headers = HeaderMap::new();
        if page < 3 {
            let link = format!(
                r#"<{}>; rel="next", <{}>; rel="last""#,
                page_url(page + 1),
                page_url(3)
            );
            headers.insert(reqwest::header::LINK, HeaderValue::from_str(&link).unwrap());
        }
        let files = (0..2)
            .map(|i| PullRequestFile {
                filename: Some(format!("p{page}/f{i}.rs")),
                status: Some("modified".into()),
                patch: None,
            })
            .collect();
        let next = parse_next_link(&headers).map(|l| Url::parse(&l).unwrap());
        (files, next)
    }

    #[tokio::test]
    async fn collect_pages_follows_next_links_to_the_end() {
        let mut requested = Vec::new();
        let files = collect_pages(page_url(1), |url| {
            requested.push(url.clone());
            let page = linked_page(&url);
            async move { Ok(page) }
        })
        .await
        .unwrap();

        let names: Vec<_> = files.iter().filter_map(|f| f.filename.as_deref()).collect();
        assert_eq!(
            names,
            vec!["p1/f0.rs", "p1/f1.rs", "p2/f0.rs", "p2/f1.rs", "p3/f0.rs", "p3/f1.rs"]
        );
        assert_eq!(requested, vec![page_url(1), page_url(2), page_url(3)]);
    }

    #[tokio::test]
    async fn collect_pages_single_page() {
        let files = collect_pages(page_url(1), |_| async { Ok((vec![1, 2, 3], None)) })
            .await
            .unwrap();
        assert_eq!(files, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn collect_pages_stops_on_self_link() {
        let mut calls = 0;
        let files = collect_pages(page_url(1), |url| {
            calls += 1;
            async move { Ok((vec![calls], Some(url))) }
        })
        .await
        .unwrap();
        assert_eq!(files, vec![1]);
    }

    #[tokio::test]
    async fn collect_pages_propagates_page_errors() {
        let result: Result<Vec<u32>, _> = collect_pages(page_url(1), |url| async move {
            if url == page_url(2) {
                return Err(HostingError::Api {
                    provider: PROVIDER,
                    status: 502,
                    body: "Bad Gateway".into(),
                });
            }
            Ok((vec![1], Some(page_url(2))))
        })
        .await;
        assert!(matches!(result, Err(HostingError::Api { status: 502, .. })));
    }
}
