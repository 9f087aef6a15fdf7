//! Set of installed hooks

use super::{Hook, HookKind};
use parking_lot::RwLock;
use std::sync::Arc;

/// Installed hooks, shared between the logger and its dispatcher
///
/// `register_if_absent` keeps at most one hook per [`HookKind`];
/// `register` appends unconditionally for callers that want duplicates.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Arc<RwLock<Vec<Arc<dyn Hook>>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `hook` unless one of the same kind is present.
    ///
    /// Returns `true` when the hook was installed. The check and the insert
    /// happen under one write lock.
    pub fn register_if_absent(&self, hook: Arc<dyn Hook>) -> bool {
        let kind = hook.kind();
        let mut hooks = self.hooks.write();
        if hooks.iter().any(|h| h.kind() == kind) {
            return false;
        }
        hooks.push(hook);
        true
    }

    pub fn register(&self, hook: Arc<dyn Hook>) {
        self.hooks.write().push(hook);
    }

    pub fn contains(&self, kind: &HookKind) -> bool {
        self.hooks.read().iter().any(|h| &h.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    pub fn kinds(&self) -> Vec<HookKind> {
        self.hooks.read().iter().map(|h| h.kind()).collect()
    }

    /// Copy of the current hook list; the lock is released on return
    pub fn snapshot(&self) -> Vec<Arc<dyn Hook>> {
        self.hooks.read().clone()
    }
}
