//! Authenticated JSON-over-HTTP plumbing shared by the REST clients.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::HostingError;
use super::retry::{RetryPolicy, with_retry};
use crate::constants::USER_AGENT;

/// Default upper bound for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How requests are authenticated.
#[derive(Clone)]
pub(crate) enum Auth {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// Basic auth with an empty user name and the token as password.
    BasicToken(String),
}

/// A `reqwest::Client` bound to one provider's credentials and retry policy.
pub(crate) struct ApiClient {
    client: reqwest::Client,
    auth: Auth,
    retry: RetryPolicy,
    provider: &'static str,
}

impl ApiClient {
    pub fn new(
        provider: &'static str,
        auth: Auth,
        default_headers: HeaderMap,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, HostingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(default_headers)
            .build()?;
        Ok(Self {
            client,
            auth,
            retry,
            provider,
        })
    }

    /// Send a request, retrying transient failures, and fail on non-2xx.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
        accept: Option<&'static str>,
    ) -> Result<Response, HostingError> {
        let label = format!("{method} {}", url.path());
        with_retry(&self.retry, &label, || {
            let mut req = self.client.request(method.clone(), url.clone());
            req = match &self.auth {
                Auth::Bearer(token) => req.bearer_auth(token),
                Auth::BasicToken(token) => req.basic_auth("", Some(token)),
            };
            if let Some(accept) = accept {
                req = req.header(ACCEPT, HeaderValue::from_static(accept));
            }
            if let Some(body) = &body {
                req = req.json(body);
            }
            async move {
                let resp = req.send().await?;
                check_status(self.provider, resp).await
            }
        })
        .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, HostingError> {
        let resp = self.send(Method::GET, url, None, None).await?;
        decode_json(resp).await
    }

    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, HostingError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| HostingError::Decode(format!("cannot encode request body: {e}")))?;
        let resp = self.send(Method::POST, url, Some(body), None).await?;
        decode_json(resp).await
    }
}

/// Map a non-success response to [`HostingError::Api`], keeping the body text.
async fn check_status(provider: &'static str, resp: Response) -> Result<Response, HostingError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(HostingError::Api {
        provider,
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

/// Read the full body and deserialize it as JSON.
pub(crate) async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, HostingError> {
    let url = resp.url().path().to_string();
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| HostingError::Decode(format!("{url}: {e}")))
}

/// Parse a base URL, rejecting anything that cannot carry path segments.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, HostingError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| HostingError::Configuration(format!("invalid URL '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(HostingError::Configuration(format!(
            "URL '{raw}' cannot be used as an API base"
        )));
    }
    Ok(url)
}

/// Append path segments to `base`, percent-encoding each one.
pub(crate) fn join_segments<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, HostingError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| HostingError::Configuration(format!("URL '{base}' cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
