use std::sync::Arc;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::errors::ApiError;
use super::retry::RetryPolicy;
use crate::infrastructure::auth::TokenProvider;

/// Page size requested from list endpoints
pub const PAGE_SIZE: u32 = 100;

/// Configuration for the platform HTTP client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the API, ending in `/`
    pub base_url: String,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

/// Build the shared HTTP client with the per-request timeout applied.
pub fn build_http_client(timeout: Duration) -> Result<ReqwestClient, ApiError> {
    ReqwestClient::builder()
        .timeout(timeout)
        .user_agent(concat!("resim-cli/", env!("CARGO_PKG_VERSION")))
        .tcp_nodelay(true)
        .build()
        .map_err(ApiError::Network)
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Page<T> {
    #[serde(default)]
    items: Vec<T>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// HTTP client for the platform API
///
/// Every platform request goes through here:
/// - bearer token injection, with a single refresh after a 401
/// - retry with jittered exponential backoff for transient failures
/// - error classification into `ApiError`
/// - token-based pagination
///
/// Pre-signed download and upload locations are fetched without credentials.
pub struct ApiClient {
    http: ReqwestClient,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Client for `config.base_url`. A missing trailing slash is added.
    pub fn new(
        http: ReqwestClient,
        config: ApiClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ApiError> {
        let mut base = config.base_url;
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| ApiError::InvalidRequest(format!("{base}: {e}")))?;
        debug!(base_url = %base_url, "initializing platform client");
        Ok(Self {
            http,
            base_url,
            tokens,
            retry: config.retry,
        })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("{path}: {e}")))
    }

    /// GET `path` with `query` and decode the JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let bytes = self.execute(Method::GET, path, query, None).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send `body` as JSON and decode the JSON response.
    pub async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let bytes = self.execute(method, path, &[], Some(&body)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request whose response body is ignored.
    pub async fn send_unit(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(), ApiError> {
        self.execute(method, path, &[], body).await.map(drop)
    }

    /// Follow `nextPageToken` until exhausted, collecting every page's `items`.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut params: Vec<(&str, String)> = query.to_vec();
            params.push(("pageSize", PAGE_SIZE.to_string()));
            if let Some(token) = &token {
                params.push(("pageToken", token.clone()));
            }
            let bytes = self.execute(Method::GET, path, &params, None).await?;
            let page: Page<T> = serde_json::from_slice(&bytes)?;
            items.extend(page.items);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => return Ok(items),
            }
        }
    }

    /// POST a GraphQL operation to `<base>/graphql`.
    pub async fn graphql<V, T>(&self, query: &str, variables: V) -> Result<T, ApiError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(GraphQlRequest { query, variables })?;
        let bytes = self
            .execute(Method::POST, "graphql", &[], Some(&body))
            .await?;
        let response: GraphQlResponse<T> = serde_json::from_slice(&bytes)?;
        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(ApiError::GraphQl(messages.join("; ")));
        }
        response
            .data
            .ok_or_else(|| ApiError::GraphQl("response carried no data".to_string()))
    }

    /// Fetch a pre-signed location. No credentials are attached.
    #[instrument(skip(self, location))]
    pub async fn download(&self, location: &str) -> Result<Vec<u8>, ApiError> {
        let url =
            Url::parse(location).map_err(|e| ApiError::InvalidRequest(format!("{location}: {e}")))?;
        self.retry
            .execute(|| self.attempt(Method::GET, url.clone(), &[], None, None))
            .await
    }

    /// PUT raw bytes to a pre-signed location. No credentials are attached.
    pub async fn upload(&self, location: &str, content: Vec<u8>) -> Result<(), ApiError> {
        let url =
            Url::parse(location).map_err(|e| ApiError::InvalidRequest(format!("{location}: {e}")))?;
        self.retry
            .execute(|| {
                let request = self.http.put(url.clone()).body(content.clone());
                async move {
                    let response = request.send().await.map_err(classify_transport)?;
                    check_status(response).await.map(drop)
                }
            })
            .await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.url(path)?;
        let token = self.tokens.token().await?;
        // The replay after a refresh shares the attempt and time budget.
        let mut budget = self.retry.budget();
        let result = self
            .retry
            .execute_within(&mut budget, || {
                self.attempt(method.clone(), url.clone(), query, body, Some(&token))
            })
            .await;
        match result {
            Err(ApiError::Unauthorized(reason)) => {
                warn!(reason = %reason, attempts = budget.attempts(), "access token rejected, refreshing");
                let token = self.tokens.refresh().await?;
                self.retry
                    .execute_within(&mut budget, || {
                        self.attempt(method.clone(), url.clone(), query, body, Some(&token))
                    })
                    .await
            }
            other => other,
        }
    }

    /// One HTTP exchange (called by retry logic)
    async fn attempt(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Vec<u8>, ApiError> {
        debug!(method = %method, url = %url, "request");
        let mut request = self.http.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(classify_transport)?;
        check_status(response).await
    }
}

fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(err)
    }
}

/// Return the body of a successful response, or the classified error.
async fn check_status(response: Response) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    debug!(status = %status, "response");
    if status.is_success() {
        return Ok(response.bytes().await.map_err(classify_transport)?.to_vec());
    }
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_string());
    Err(ApiError::from_status(status, body, retry_after))
}
