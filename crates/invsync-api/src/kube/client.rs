// Hub list/watch HTTP client
//
// Wraps `reqwest::Client` with collection URL construction, paginated
// listing, and newline-delimited JSON watch streams. The reflector drives
// this client; nothing here retries on its own.

use std::time::Duration;

use futures_core::Stream;
use futures_util::StreamExt;
use tracing::{debug, trace};
use url::Url;

use super::types::{Listing, ObjectList, Resource, WatchEvent};
use crate::error::Error;
use crate::transport::{TransportConfig, error_from_response};

/// Page size requested from the hub on list calls.
const LIST_PAGE_SIZE: u32 = 500;

/// Server-side watch timeout. The stream ends cleanly after this and is
/// re-established from the last seen resource version.
const WATCH_TIMEOUT_SECS: u64 = 290;

/// Extra client-side allowance on top of the server-side watch timeout.
const WATCH_GRACE_SECS: u64 = 30;

/// HTTP client for the hub's list/watch API.
#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
    base_url: Url,
    namespace: Option<String>,
}

impl HubClient {
    /// Create a hub client from a `TransportConfig`.
    ///
    /// `namespace` scopes namespaced resources; `None` lists across all
    /// namespaces.
    pub fn new(
        base_url: Url,
        namespace: Option<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, namespace))
    }

    /// Create a hub client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, namespace: Option<String>) -> Self {
        Self {
            http,
            base_url,
            namespace,
        }
    }

    /// The hub base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/apis/{group}/{version}[/namespaces/{ns}]/{plural}`
    pub(crate) fn collection_url<K: Resource>(&self) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let scope = match (&self.namespace, K::NAMESPACED) {
            (Some(ns), true) => format!("/namespaces/{ns}"),
            _ => String::new(),
        };
        let full = format!("{base}/{}{scope}/{}", K::api_prefix(), K::PLURAL);
        Ok(Url::parse(&full)?)
    }

    // ── List ─────────────────────────────────────────────────────────

    /// List every object of kind `K`, following continuation tokens.
    ///
    /// The returned resource version is the one reported by the final page
    /// and is the version a subsequent watch must start from.
    pub async fn list<K: Resource>(&self) -> Result<Listing<K>, Error> {
        let url = self.collection_url::<K>()?;
        let mut items = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(url.clone())
                .query(&[("limit", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &continue_token {
                request = request.query(&[("continue", token)]);
            }

            debug!(kind = K::KIND, "LIST {}", url);
            let resp = request.send().await.map_err(Error::Transport)?;
            if !resp.status().is_success() {
                return Err(error_from_response(resp).await);
            }

            let body = resp.text().await.map_err(Error::Transport)?;
            let page: ObjectList<K> = serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body: body.clone(),
                }
            })?;

            items.extend(page.items);
            match page.metadata.continue_token.filter(|t| !t.is_empty()) {
                Some(token) => continue_token = Some(token),
                None => {
                    return Ok(Listing {
                        items,
                        resource_version: page.metadata.resource_version.unwrap_or_default(),
                    });
                }
            }
        }
    }

    // ── Watch ────────────────────────────────────────────────────────

    /// Open a watch on kind `K` starting after `resource_version`.
    ///
    /// The stream yields one [`WatchEvent`] per line of the response body
    /// and ends when the hub closes the connection. HTTP 410 on the
    /// initial request surfaces as [`Error::Gone`].
    pub async fn watch<K: Resource>(
        &self,
        resource_version: &str,
    ) -> Result<impl Stream<Item = Result<WatchEvent<K>, Error>> + Send + 'static, Error> {
        let url = self.collection_url::<K>()?;
        debug!(kind = K::KIND, resource_version, "WATCH {}", url);

        let resp = self
            .http
            .get(url)
            .query(&[
                ("watch", "true"),
                ("allowWatchBookmarks", "true"),
                ("resourceVersion", resource_version),
            ])
            .query(&[("timeoutSeconds", WATCH_TIMEOUT_SECS)])
            .timeout(Duration::from_secs(WATCH_TIMEOUT_SECS + WATCH_GRACE_SECS))
            .send()
            .await
            .map_err(Error::Transport)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        Ok(async_stream::try_stream! {
            let mut body = std::pin::pin!(resp.bytes_stream());
            let mut buf: Vec<u8> = Vec::new();

            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(Error::Transport)?;
                buf.extend_from_slice(&chunk);

                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    if let Some(event) = parse_watch_line::<K>(&line)? {
                        yield event;
                    }
                }
            }

            if let Some(event) = parse_watch_line::<K>(&buf)? {
                yield event;
            }
        })
    }
}

/// Decode one watch frame; blank lines yield `None`.
fn parse_watch_line<K: Resource>(line: &[u8]) -> Result<Option<WatchEvent<K>>, Error> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    trace!(kind = K::KIND, "watch frame: {text}");
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text.to_owned(),
        })
}
