//! Meilisearch document indexing

use super::{Hook, HookKind};
use crate::core::error::{LoggerError, Result};
use crate::core::log_entry::LogEntry;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

const COMPONENT: &str = "meilisearch";

pub(crate) fn parse_base_url(component: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| LoggerError::config(component, format!("invalid URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(LoggerError::config(
            component,
            format!("URL '{}' must be an http(s) base URL", raw),
        ));
    }
    Ok(url)
}

pub(crate) fn http_client(component: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LoggerError::config(component, format!("HTTP client: {}", e)))
}

/// Client for a Meilisearch instance
#[derive(Debug, Clone)]
pub struct MeilisearchClient {
    http: reqwest::Client,
    host: Url,
    api_key: Option<String>,
}

impl MeilisearchClient {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `host` is not an http(s) URL
    pub fn new(host: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(COMPONENT, timeout)?,
            host: parse_base_url(COMPONENT, host)?,
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
        })
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    fn documents_url(&self, index: &str) -> Result<Url> {
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|_| LoggerError::hook(COMPONENT, "host cannot be a base URL"))?
            .pop_if_empty()
            .extend(["indexes", index, "documents"]);
        url.query_pairs_mut().append_pair("primaryKey", "id");
        Ok(url)
    }

    /// Add documents to `index`; Meilisearch queues them as a task
    pub async fn index_documents(&self, index: &str, documents: &[Value]) -> Result<()> {
        let mut request = self.http.post(self.documents_url(index)?).json(documents);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LoggerError::hook(COMPONENT, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoggerError::hook(
                COMPONENT,
                format!("status {}: {}", status, body),
            ));
        }
        Ok(())
    }
}

/// Indexer document: the entry's fields, message and level, an RFC 3339
/// `timestamp` and a random `id` primary key.
pub fn meilisearch_document(entry: &LogEntry) -> Value {
    let mut doc = entry.document();
    doc.insert(
        "timestamp".to_string(),
        Value::String(entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    doc.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    Value::Object(doc)
}

pub struct MeilisearchHook {
    client: Option<Arc<MeilisearchClient>>,
    index: String,
}

impl MeilisearchHook {
    pub fn new(client: Arc<MeilisearchClient>, index: impl Into<String>) -> Self {
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
impl Hook for MeilisearchHook {
    fn kind(&self) -> HookKind {
        HookKind::Meilisearch
    }

    async fn fire(&self, entry: &LogEntry) -> Result<()> {
        let Some(ref client) = self.client else {
            return Ok(());
        };
        client
            .index_documents(&self.index, &[meilisearch_document(entry)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fields, LogLevel};

    #[test]
    fn test_rejects_invalid_host() {
        let err = MeilisearchClient::new("not a url", "", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = MeilisearchClient::new("localhost:7700", "", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_documents_url() {
        let client =
            MeilisearchClient::new("http://127.0.0.1:7700/", "key", Duration::from_secs(1))
                .unwrap();
        let url = client.documents_url("app-logs").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:7700/indexes/app-logs/documents?primaryKey=id"
        );
    }

    #[test]
    fn test_document_shape() {
        let entry = LogEntry::new(LogLevel::Info, "hello".to_string())
            .with_fields(Fields::new().with_field("trace_id", "abc"));

        let first = meilisearch_document(&entry);
        let second = meilisearch_document(&entry);

        assert_eq!(first["trace_id"], "abc");
        assert_eq!(first["message"], "hello");
        assert_eq!(first["level"], "info");
        assert!(first["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_ne!(first["id"], second["id"]);
    }

    #[tokio::test]
    async fn test_unconfigured_hook_is_noop() {
        let hook = MeilisearchHook::unconfigured();
        let entry = LogEntry::new(LogLevel::Error, "ignored".to_string());
        assert!(hook.fire(&entry).await.is_ok());
        assert_eq!(hook.kind(), HookKind::Meilisearch);
    }
}
