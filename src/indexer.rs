//! Union GraphQL indexer: maps a submission transaction to its packet hash.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{error::IndexerError, shutdown};

const TRANSFERS_QUERY: &str = r#"
  query ($submission_tx_hash: String!) {
    v2_transfers(args: {p_transaction_hash: $submission_tx_hash}) {
      packet_hash
    }
  }
"#;

/// Looks up the packet hash of a submitted transaction, once.
#[async_trait(?Send)]
pub trait PacketIndexer {
    /// `Ok(None)` while the indexer has not seen the transfer yet.
    async fn packet_hash(&self, tx_hash: &str) -> Result<Option<String>, IndexerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub retries: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            retries: 50,
            interval: Duration::from_millis(5000),
        }
    }
}

/// Prefixes `0x` when missing.
pub fn normalize_tx_hash(tx_hash: &str) -> String {
    if tx_hash.starts_with("0x") {
        tx_hash.to_string()
    } else {
        format!("0x{tx_hash}")
    }
}

/// Polls until a packet hash shows up, the retries run out or the run is
/// cancelled. Lookup errors are logged and retried; they never surface.
pub async fn poll_packet_hash<I: PacketIndexer + ?Sized>(
    indexer: &I,
    tx_hash: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> Option<String> {
    let tx_hash = normalize_tx_hash(tx_hash);

    for attempt in 1..=settings.retries {
        match shutdown::guard(indexer.packet_hash(&tx_hash), cancel).await {
            Err(_) => return None,
            Ok(Ok(Some(packet_hash))) => return Some(packet_hash),
            Ok(Ok(None)) => {}
            Ok(Err(err)) => tracing::warn!(%tx_hash, attempt, "packet error: {err}"),
        }
        if attempt < settings.retries && shutdown::pause(settings.interval, cancel).await.is_err() {
            return None;
        }
    }

    tracing::debug!(%tx_hash, retries = settings.retries, "no packet hash indexed");
    None
}

#[derive(Debug, Deserialize)]
struct Response {
    data: Option<Data>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Data {
    /// Null or missing until the indexer has seen the transaction.
    #[serde(default)]
    v2_transfers: Option<Vec<Transfer>>,
}

#[derive(Debug, Deserialize)]
struct Transfer {
    packet_hash: Option<String>,
}

pub struct GraphQlIndexer {
    client: reqwest::Client,
    endpoint: Url,
}

impl GraphQlIndexer {
    pub fn new(endpoint: Url) -> Result<Self, IndexerError> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/graphql-response+json, application/json"),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://app-union.build"));
    headers.insert(REFERER, HeaderValue::from_static("https://app.union.build/"));
    headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
    headers
}

#[async_trait(?Send)]
impl PacketIndexer for GraphQlIndexer {
    async fn packet_hash(&self, tx_hash: &str) -> Result<Option<String>, IndexerError> {
        let body = json!({
            "query": TRANSFERS_QUERY,
            "variables": { "submission_tx_hash": tx_hash },
        });
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(IndexerError::Status(resp.status()));
        }

        let resp: Response = resp.json().await?;
        if let (None, Some(errors)) = (&resp.data, &resp.errors) {
            return Err(IndexerError::GraphQl(errors.to_string()));
        }
        Ok(resp
            .data
            .and_then(|d| d.v2_transfers)
            .and_then(|transfers| transfers.into_iter().next())
            .and_then(|t| t.packet_hash)
            .filter(|h| !h.is_empty()))
    }
}
