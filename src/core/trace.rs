//! Request-scoped trace context
//!
//! A [`TraceContext`] is an immutable chain of key/value bindings that travels
//! alongside a request. Adding a value derives a new context; the receiver is
//! never modified, so a context can be shared freely across threads.
//!
//! ```
//! use trace_logger::core::trace::{get_or_create_trace_id, TraceContext};
//!
//! let root = TraceContext::background();
//! let (ctx, id) = get_or_create_trace_id(&root);
//! assert!(root.trace_id().is_none());
//! assert_eq!(ctx.trace_id(), Some(id.as_str()));
//!
//! // Subsequent lookups reuse the bound identifier
//! let (_, again) = get_or_create_trace_id(&ctx);
//! assert_eq!(again, id);
//! ```

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub const TRACE_ID_KEY: &str = "trace_id";
pub const VERSION_KEY: &str = "version";
pub const SPAN_TITLE_KEY: &str = "title";
pub const SPAN_FUNCTION_KEY: &str = "function";

struct Binding {
    key: String,
    value: String,
    parent: Option<Arc<Binding>>,
}

impl Drop for Binding {
    // Unlink iteratively so long chains don't recurse once per binding
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            parent = match Arc::try_unwrap(node) {
                Ok(mut binding) => binding.parent.take(),
                Err(_) => None,
            };
        }
    }
}

#[derive(Clone, Default)]
pub struct TraceContext {
    head: Option<Arc<Binding>>,
}

impl TraceContext {
    /// The empty root context
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context carrying `key = value`
    #[must_use]
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            head: Some(Arc::new(Binding {
                key: key.into(),
                value: value.into(),
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up the nearest binding for `key`
    pub fn value(&self, key: &str) -> Option<&str> {
        let mut node = self.head.as_deref();
        while let Some(binding) = node {
            if binding.key == key {
                return Some(&binding.value);
            }
            node = binding.parent.as_deref();
        }
        None
    }

    #[must_use]
    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> Self {
        self.with_value(TRACE_ID_KEY, trace_id)
    }

    /// The bound trace identifier; an empty identifier counts as absent
    pub fn trace_id(&self) -> Option<&str> {
        self.value(TRACE_ID_KEY).filter(|id| !id.is_empty())
    }

    /// Derive a context describing the current span
    #[must_use]
    pub fn with_span(&self, title: impl Into<String>, function: impl Into<String>) -> Self {
        self.with_value(SPAN_TITLE_KEY, title)
            .with_value(SPAN_FUNCTION_KEY, function)
    }
}

impl fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        let mut node = self.head.as_deref();
        while let Some(binding) = node {
            map.entry(&binding.key, &binding.value);
            node = binding.parent.as_deref();
        }
        map.finish()
    }
}

/// Generate a fresh trace identifier
pub fn new_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Return the context's trace id, generating and binding one if absent.
///
/// When `ctx` already carries an id the returned context is a clone of `ctx`
/// and the id is returned unchanged.
pub fn get_or_create_trace_id(ctx: &TraceContext) -> (TraceContext, String) {
    match ctx.trace_id() {
        Some(id) => (ctx.clone(), id.to_string()),
        None => {
            let id = new_trace_id();
            (ctx.with_trace_id(id.clone()), id)
        }
    }
}
