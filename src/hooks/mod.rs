//! Post-write hooks forwarding entries to remote indexers
//!
//! Hooks run on the dispatcher's worker thread after the sink write has
//! completed. Their failures are counted and, at debug level, reported on
//! stderr; they never reach the caller of an emission method.

pub mod dispatcher;
#[cfg(feature = "remote-index")]
pub mod elasticsearch;
#[cfg(feature = "remote-index")]
pub mod meilisearch;
pub mod registry;

use crate::core::{LogEntry, LogLevel, Result};
use async_trait::async_trait;
use std::fmt;

pub use dispatcher::{HookDispatcher, DEFAULT_HOOK_QUEUE_CAPACITY, DEFAULT_HOOK_TIMEOUT};
#[cfg(feature = "remote-index")]
pub use elasticsearch::{elasticsearch_document_id, ElasticsearchClient, ElasticsearchHook};
#[cfg(feature = "remote-index")]
pub use meilisearch::{meilisearch_document, MeilisearchClient, MeilisearchHook};
pub use registry::HookRegistry;

/// Identity of a hook, used by the registry to keep one hook per kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookKind {
    Meilisearch,
    Elasticsearch,
    Custom(String),
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Meilisearch => write!(f, "meilisearch"),
            HookKind::Elasticsearch => write!(f, "elasticsearch"),
            HookKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Best-effort delivery of a log entry to an external service
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use trace_logger::core::{LogEntry, Result};
/// use trace_logger::hooks::{Hook, HookKind};
///
/// struct Counter(std::sync::atomic::AtomicUsize);
///
/// #[async_trait]
/// impl Hook for Counter {
///     fn kind(&self) -> HookKind {
///         HookKind::Custom("counter".to_string())
///     }
///
///     async fn fire(&self, _entry: &LogEntry) -> Result<()> {
///         self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Hook: Send + Sync {
    fn kind(&self) -> HookKind;

    /// Levels this hook receives; all levels by default
    fn levels(&self) -> &[LogLevel] {
        &LogLevel::ALL
    }

    async fn fire(&self, entry: &LogEntry) -> Result<()>;
}
