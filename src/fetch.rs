//! Transport boundary: fetching JSON and binary payloads from the content API.
//!
//! The [`Fetcher`] trait decouples the cache and query logic from any HTTP
//! stack. [`HttpFetcher`] is the production implementation on `reqwest`;
//! [`StaticFetcher`] serves canned responses from memory and counts calls,
//! which is what tests and demos use.
//!
//! # Error translation
//!
//! Non-2xx responses become [`Error::Http`]. The message is the first of
//! these found in a JSON body: `message`, `detail` (string), `error`
//! (string), `detail.message`; otherwise the status line, e.g.
//! `"HTTP 404 Not Found"`.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Endpoint paths, relative to the API base URL.
pub mod endpoints {
    /// Listing of every item in a collection for one locale.
    pub fn collection_items(project_id: &str, slug: &str, locale: &str) -> String {
        format!(
            "projects/{}/collections/{}/items?locale={}",
            project_id, slug, locale
        )
    }

    /// A single item of a collection for one locale.
    pub fn collection_item(project_id: &str, slug: &str, item_id: &str, locale: &str) -> String {
        format!(
            "projects/{}/collections/{}/items/{}?locale={}",
            project_id, slug, item_id, locale
        )
    }

    /// Binary content of an asset.
    pub fn asset(project_id: &str, asset_id: &str) -> String {
        format!("projects/{}/assets/{}", project_id, asset_id)
    }
}

/// A raw binary response. Returned for every status; interpreting non-2xx
/// statuses is up to the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinaryResponse {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl BinaryResponse {
    /// A 200 response carrying `body` as `content_type`.
    pub fn ok(body: impl Into<Vec<u8>>, content_type: &str) -> Self {
        BinaryResponse {
            status: 200,
            headers: HashMap::new(),
            body: body.into(),
        }
        .with_header("content-type", content_type)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Trait for transport implementations.
///
/// Implementations carry their own timeout; a timed-out request fails with
/// [`Error::Timeout`] for that call only.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `path` and decode the body as JSON.
    ///
    /// # Errors
    /// `Error::Http` for non-2xx statuses, `Error::Timeout`/`Error::Network`
    /// for transport failures, `Error::DeserializationError` for bodies that
    /// are not JSON.
    async fn get_json(&self, path: &str) -> Result<Value>;

    /// GET `path` with `query` appended and return the raw response.
    ///
    /// # Errors
    /// Only transport failures; non-2xx statuses are returned as responses.
    async fn get_binary(&self, path: &str, query: &[(String, String)]) -> Result<BinaryResponse>;
}

/// GET `path` and decode the JSON body as `T`.
///
/// # Errors
/// Transport errors from [`Fetcher::get_json`], or
/// `Error::DeserializationError` when the body does not match `T`.
pub async fn fetch_as<T: DeserializeOwned>(fetcher: &dyn Fetcher, path: &str) -> Result<T> {
    let value = fetcher.get_json(path).await?;
    serde_json::from_value(value).map_err(|e| {
        Error::DeserializationError(format!("unexpected response shape for {}: {}", path, e))
    })
}

/// Best human-readable message in a JSON error body.
pub fn error_message(body: &Value) -> Option<String> {
    let as_text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

    as_text(body.get("message"))
        .or_else(|| as_text(body.get("detail")))
        .or_else(|| as_text(body.get("error")))
        .or_else(|| as_text(body.get("detail").and_then(|d| d.get("message"))))
}

/// `"HTTP <code> <reason>"`.
pub fn status_line(status: u16) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status");
    format!("HTTP {} {}", status, reason)
}

/// Translate a non-2xx response into an [`Error::Http`].
///
/// With `raw_text_fallback`, a non-JSON (or message-less) body's text is used
/// before falling back to the status line.
pub fn http_error(status: u16, body: &[u8], raw_text_fallback: bool) -> Error {
    let details: Option<Value> = serde_json::from_slice(body).ok();
    let text = String::from_utf8_lossy(body).trim().to_string();

    let message = details
        .as_ref()
        .and_then(error_message)
        .or_else(|| (raw_text_fallback && !text.is_empty()).then(|| text.clone()))
        .unwrap_or_else(|| status_line(status));

    Error::Http {
        status,
        message,
        details,
    }
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// `reqwest`-backed fetcher rooted at an API base URL.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFetcher {
    /// # Errors
    /// `Error::ConfigError` when `base_url` does not parse or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::ConfigError(format!("invalid base URL {}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Ok(HttpFetcher { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::invalid(format!("invalid request path {}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.url(path, &[])?;
        debug!("» GET {}", url);

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            return Err(http_error(status.as_u16(), &body, false));
        }

        serde_json::from_slice(&body).map_err(|e| {
            Error::DeserializationError(format!("malformed response body for {}: {}", path, e))
        })
    }

    async fn get_binary(&self, path: &str, query: &[(String, String)]) -> Result<BinaryResponse> {
        let url = self.url(path, query)?;
        debug!("» GET (binary) {}", url);

        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await?.to_vec();

        Ok(BinaryResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// Canned response served by [`StaticFetcher`].
#[derive(Clone, Debug)]
pub enum StaticResponse {
    Json(Value),
    Binary(BinaryResponse),
    Error(Error),
}

/// In-memory fetcher for tests and demos.
///
/// Routes are matched on the exact path (query included) first, then on the
/// path without its query string. Unrouted paths answer 404. Every request
/// is recorded so tests can assert on network traffic.
///
/// # Example
///
/// ```
/// use content_kit::fetch::{Fetcher, StaticFetcher};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> content_kit::Result<()> {
/// let fetcher = StaticFetcher::new().with_json("projects/p/ping", json!({"ok": true}));
/// let body = fetcher.get_json("projects/p/ping").await?;
/// assert_eq!(body["ok"], true);
/// assert_eq!(fetcher.call_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct StaticFetcher {
    routes: Mutex<HashMap<String, StaticResponse>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, path: &str, body: Value) -> Self {
        self.route(path, StaticResponse::Json(body));
        self
    }

    pub fn with_binary(self, path: &str, response: BinaryResponse) -> Self {
        self.route(path, StaticResponse::Binary(response));
        self
    }

    pub fn with_error(self, path: &str, error: Error) -> Self {
        self.route(path, StaticResponse::Error(error));
        self
    }

    /// Add or replace a route.
    pub fn route(&self, path: &str, response: StaticResponse) {
        lock(&self.routes).insert(path.to_string(), response);
    }

    /// Total number of requests served.
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Number of requests whose path (query included) equals `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        lock(&self.requests).iter().filter(|r| *r == path).count()
    }

    /// Every request served, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    fn respond(&self, path: &str, recorded: String) -> Result<StaticResponse> {
        lock(&self.requests).push(recorded);

        let routes = lock(&self.routes);
        let bare = path.split('?').next().unwrap_or(path);
        routes
            .get(path)
            .or_else(|| routes.get(bare))
            .cloned()
            .ok_or_else(|| Error::Http {
                status: 404,
                message: status_line(404),
                details: None,
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn get_json(&self, path: &str) -> Result<Value> {
        match self.respond(path, path.to_string())? {
            StaticResponse::Json(body) => Ok(body),
            StaticResponse::Error(e) => Err(e),
            StaticResponse::Binary(resp) if !resp.is_success() => {
                Err(http_error(resp.status, &resp.body, false))
            }
            StaticResponse::Binary(resp) => serde_json::from_slice(&resp.body).map_err(|e| {
                Error::DeserializationError(format!("malformed response body for {}: {}", path, e))
            }),
        }
    }

    async fn get_binary(&self, path: &str, query: &[(String, String)]) -> Result<BinaryResponse> {
        let recorded = if query.is_empty() {
            path.to_string()
        } else {
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}?{}", path, pairs.join("&"))
        };

        match self.respond(path, recorded)? {
            StaticResponse::Binary(resp) => Ok(resp),
            StaticResponse::Json(body) => Ok(BinaryResponse::ok(
                serde_json::to_vec(&body)?,
                "application/json",
            )),
            StaticResponse::Error(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_precedence() {
        assert_eq!(
            error_message(&json!({"message": "m", "detail": "d"})).as_deref(),
            Some("m")
        );
        assert_eq!(
            error_message(&json!({"detail": "d", "error": "e"})).as_deref(),
            Some("d")
        );
        assert_eq!(error_message(&json!({"error": "e"})).as_deref(), Some("e"));
        assert_eq!(
            error_message(&json!({"detail": {"message": "nested"}})).as_deref(),
            Some("nested")
        );
        assert_eq!(error_message(&json!({"unrelated": 1})), None);
    }

    #[test]
    fn test_http_error_falls_back_to_status_line() {
        let err = http_error(503, b"", false);
        assert_eq!(err.to_string(), "HTTP 503: HTTP 503 Service Unavailable");

        let err = http_error(500, b"<html>oops</html>", false);
        assert!(matches!(err, Error::Http { ref message, .. } if message == "HTTP 500 Internal Server Error"));
    }

    #[test]
    fn test_http_error_raw_text_fallback() {
        let err = http_error(502, b"upstream exploded", true);
        assert!(matches!(err, Error::Http { ref message, .. } if message == "upstream exploded"));

        let err = http_error(404, br#"{"detail": "no such asset"}"#, true);
        match err {
            Error::Http {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such asset");
                assert!(details.is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            endpoints::collection_items("p", "blog_posts", "en-US"),
            "projects/p/collections/blog_posts/items?locale=en-US"
        );
        assert_eq!(
            endpoints::collection_item("p", "blog_posts", "p1", "en-US"),
            "projects/p/collections/blog_posts/items/p1?locale=en-US"
        );
        assert_eq!(endpoints::asset("p", "abc"), "projects/p/assets/abc");
    }

    #[test]
    fn test_binary_response_headers_case_insensitive() {
        let resp = BinaryResponse::ok(vec![1, 2], "image/png").with_header("Content-Length", "2");
        assert_eq!(resp.header("content-type"), Some("image/png"));
        assert_eq!(resp.header("CONTENT-LENGTH"), Some("2"));
        assert!(resp.is_success());
        assert!(!resp.clone().with_status(404).is_success());
    }

    #[test]
    fn test_http_fetcher_url_building() {
        let fetcher = HttpFetcher::new("https://cms.example.com/api/", Duration::from_secs(1))
            .expect("Failed to build fetcher");
        let url = fetcher
            .url(
                "projects/p/assets/a1",
                &[("width".to_string(), "300".to_string())],
            )
            .expect("Failed to build url");
        assert_eq!(
            url.as_str(),
            "https://cms.example.com/api/projects/p/assets/a1?width=300"
        );
    }

    #[test]
    fn test_http_fetcher_rejects_bad_base_url() {
        let err = HttpFetcher::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_static_fetcher_routes_and_counts() {
        let fetcher = StaticFetcher::new()
            .with_json("a?locale=en-US", json!(["en"]))
            .with_json("a", json!(["any"]));

        assert_eq!(fetcher.get_json("a?locale=en-US").await.ok(), Some(json!(["en"])));
        assert_eq!(fetcher.get_json("a?locale=fr-FR").await.ok(), Some(json!(["any"])));
        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(fetcher.calls_to("a?locale=fr-FR"), 1);
    }

    #[tokio::test]
    async fn test_static_fetcher_unrouted_is_404() {
        let fetcher = StaticFetcher::new();
        let err = fetcher.get_json("nowhere").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_as_shape_mismatch() {
        let fetcher = StaticFetcher::new().with_json("n", json!(5));
        let result: Result<Vec<String>> = fetch_as(&fetcher, "n").await;
        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }
}
