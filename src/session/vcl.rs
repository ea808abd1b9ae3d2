//! Last inlined VCL, shared by every session in the process.
//!
//! `vcl.inline` records a name and its content here and `vcl.use` forwards
//! the content when the name matches. Sessions racing on this slot see
//! last-writer-wins semantics; nothing orders an `inline` on one connection
//! against a `use` on another.

use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
struct InlineVcl {
    name: String,
    content: String,
}

/// Process-wide holder for the most recent `vcl.inline`.
#[derive(Debug, Default)]
pub struct InlineVclSlot {
    inner: Mutex<Option<InlineVcl>>,
}

impl InlineVclSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored configuration.
    pub fn record(&self, name: impl Into<String>, content: impl Into<String>) {
        *self.lock() = Some(InlineVcl {
            name: name.into(),
            content: content.into(),
        });
    }

    /// Content of the stored configuration if it is named `name`.
    pub fn content_for(&self, name: &str) -> Option<String> {
        self.lock()
            .as_ref()
            .filter(|vcl| vcl.name == name)
            .map(|vcl| vcl.content.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<InlineVcl>> {
        // The guarded value is replaced whole, so a poisoned lock still holds
        // a consistent pair.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
