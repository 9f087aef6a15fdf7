//! Elasticsearch document indexing

use super::meilisearch::{http_client, parse_base_url};
use super::{Hook, HookKind};
use crate::core::error::{LoggerError, Result};
use crate::core::log_entry::LogEntry;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const COMPONENT: &str = "elasticsearch";

/// Client for one or more Elasticsearch nodes
///
/// Requests go to the first address that answers; the rest are fallbacks.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    http: reqwest::Client,
    addresses: Vec<Url>,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchClient {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when `addresses` is empty or any
    /// address is not an http(s) URL
    pub fn new<S: AsRef<str>>(
        addresses: &[S],
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if addresses.is_empty() {
            return Err(LoggerError::config(COMPONENT, "no addresses configured"));
        }
        let addresses = addresses
            .iter()
            .map(|a| parse_base_url(COMPONENT, a.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            http: http_client(COMPONENT, timeout)?,
            addresses,
            username: (!username.is_empty()).then(|| username.to_string()),
            password: (!password.is_empty()).then(|| password.to_string()),
        })
    }

    pub fn addresses(&self) -> &[Url] {
        &self.addresses
    }

    fn document_url(address: &Url, index: &str, id: &str) -> Result<Url> {
        let mut url = address.clone();
        url.path_segments_mut()
            .map_err(|_| LoggerError::hook(COMPONENT, "address cannot be a base URL"))?
            .pop_if_empty()
            .extend([index, "_doc", id]);
        Ok(url)
    }

    /// Store `document` under `index/_doc/id`
    pub async fn index_document(&self, index: &str, id: &str, document: &Value) -> Result<()> {
        let mut last_error = None;

        for address in &self.addresses {
            let mut request = self
                .http
                .put(Self::document_url(address, index, id)?)
                .json(document);
            if let Some(ref username) = self.username {
                request = request.basic_auth(username, self.password.as_deref());
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_error = Some(LoggerError::hook(
                        COMPONENT,
                        format!("{} returned status {}: {}", address, status, body),
                    ));
                }
                Err(e) => {
                    last_error = Some(LoggerError::hook(
                        COMPONENT,
                        format!("{}: {}", address, e),
                    ));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LoggerError::hook(COMPONENT, "no addresses configured")))
    }
}

/// Document id: the entry timestamp in RFC 3339 with nanoseconds
pub fn elasticsearch_document_id(entry: &LogEntry) -> String {
    entry
        .timestamp
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub struct ElasticsearchHook {
    client: Option<Arc<ElasticsearchClient>>,
    index: String,
}

impl ElasticsearchHook {
    pub fn new(client: Arc<ElasticsearchClient>, index: impl Into<String>) -> Self {
        Self {
            client: Some(client),
            index: index.into(),
        }
    }

    /// A hook with no backend; firing it does nothing
    pub fn unconfigured() -> Self {
        Self {
            client: None,
            index: String::new(),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

#[async_trait]
impl Hook for ElasticsearchHook {
    fn kind(&self) -> HookKind {
        HookKind::Elasticsearch
    }

    async fn fire(&self, entry: &LogEntry) -> Result<()> {
        let Some(ref client) = self.client else {
            return Ok(());
        };
        let document = Value::Object(entry.document());
        client
            .index_document(&self.index, &elasticsearch_document_id(entry), &document)
            .await
    }
}
