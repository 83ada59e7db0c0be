//! Priority resolution of provider entries.
//!
//! Provided entries are folded together with default entries (provided
//! first) into an id-keyed map. For each id the entry with the strictly
//! greater priority wins; on equal priority the first-seen entry is kept.
//! Since default providers are appended after explicit ones, they never
//! override an explicit registration at equal priority.

use std::collections::HashMap;

use crate::error::{Error, Result};

// =============================================================================
// Provider Entry
// =============================================================================

/// One registered handler factory with its resolution priority.
#[derive(Clone)]
pub struct ProviderEntry<F> {
    /// Handler id referenced from config.
    pub id: String,
    /// Resolution priority; higher wins, ties keep the earliest entry.
    pub priority: i32,
    /// The handler factory.
    pub factory: F,
}

impl<F> ProviderEntry<F> {
    /// Entry with the default priority (0).
    pub fn new(id: impl Into<String>, factory: F) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            factory,
        }
    }

    /// Entry with an explicit priority.
    pub fn with_priority(id: impl Into<String>, priority: i32, factory: F) -> Self {
        Self {
            id: id.into(),
            priority,
            factory,
        }
    }
}

// =============================================================================
// Provider Registry
// =============================================================================

/// Immutable id-to-factory lookup table for one handler kind.
pub struct ProviderRegistry<F> {
    kind: &'static str,
    entries: HashMap<String, F>,
}

impl<F: Clone> ProviderRegistry<F> {
    /// Fold provided and default entries into the resolved table.
    pub fn resolve(
        kind: &'static str,
        provided: Vec<ProviderEntry<F>>,
        defaults: Vec<ProviderEntry<F>>,
    ) -> Self {
        let mut winners: HashMap<String, ProviderEntry<F>> = HashMap::new();

        for entry in provided.into_iter().chain(defaults) {
            match winners.get(&entry.id) {
                // strictly greater priority replaces; equal keeps first-seen
                Some(current) if entry.priority <= current.priority => {}
                _ => {
                    winners.insert(entry.id.clone(), entry);
                }
            }
        }

        Self {
            kind,
            entries: winners
                .into_iter()
                .map(|(id, entry)| (id, entry.factory))
                .collect(),
        }
    }

    /// Look up a factory by id.
    pub fn get(&self, id: &str) -> Result<F> {
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ProviderNotFound {
                kind: self.kind,
                id: id.to_string(),
            })
    }

    /// Whether an id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
