//! Registry of attached content sources.
//!
//! Holds the session's file and URL sources in memory. Files are keyed by
//! name, URLs by address; adding a duplicate key replaces the existing
//! entry, and removing an absent key is a no-op. The registry performs no
//! I/O — the ingestion coordinator is its sole writer on the success path.

use crate::models::{Source, SourceKind};

/// In-memory set of attached sources.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Insert a file source. An existing source with the same name is
    /// replaced.
    pub fn add_file(&mut self, source: Source) {
        self.upsert(source);
    }

    /// Insert a URL source. An existing source with the same address is
    /// replaced.
    pub fn add_url(&mut self, source: Source) {
        self.upsert(source);
    }

    fn upsert(&mut self, source: Source) {
        self.sources.retain(|s| s.key() != source.key());
        self.sources.push(source);
    }

    /// Remove a file source by name, returning the removed entry.
    /// Removing an unknown name is a no-op, not an error.
    pub fn remove_file(&mut self, name: &str) -> Option<Source> {
        self.take(name)
    }

    /// Remove a URL source by address. Idempotent like [`remove_file`].
    ///
    /// [`remove_file`]: SourceRegistry::remove_file
    pub fn remove_url(&mut self, address: &str) -> Option<Source> {
        self.take(address)
    }

    fn take(&mut self, key: &str) -> Option<Source> {
        let idx = self.sources.iter().position(|s| s.key() == key)?;
        Some(self.sources.remove(idx))
    }

    pub fn find(&self, key: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.key() == key)
    }

    /// All sources of the given kind, in insertion order.
    pub fn by_kind(&self, kind: SourceKind) -> Vec<&Source> {
        self.sources.iter().filter(|s| s.kind() == kind).collect()
    }

    /// All sources in insertion order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}
