//! The site index: every page each generator produced.

use std::{collections::HashSet, sync::Arc};

use quire_core::Page;
use serde::Serialize;

/// Index built during the indexing phase.
///
/// Append-only: pages are added under the key of the generator that produced
/// them and keys keep their first insertion order.
#[derive(Debug, Default)]
pub struct GlobalIndex {
    entries: Vec<(String, Vec<Page>)>,
}

impl GlobalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `pages` under `key`.
    pub fn add(&mut self, key: &str, pages: Vec<Page>) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => existing.extend(pages),
            None => self.entries.push((key.to_string(), pages)),
        }
    }

    /// Pages indexed under `key` so far.
    pub fn pages(&self, key: &str) -> &[Page] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, pages)| pages.as_slice())
            .unwrap_or(&[])
    }

    /// Every page indexed so far, in insertion order.
    pub fn all_pages(&self) -> impl Iterator<Item = &Page> {
        self.entries.iter().flat_map(|(_, pages)| pages.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, pages)| pages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freeze the index for the generation phase.
    pub fn freeze(self) -> Arc<FrozenIndex> {
        let urls = self
            .entries
            .iter()
            .flat_map(|(_, pages)| pages.iter().map(|p| p.url().to_string()))
            .collect();
        Arc::new(FrozenIndex {
            entries: self.entries,
            urls,
        })
    }
}

/// Read-only snapshot of the index shared by every generator during generation.
#[derive(Debug, Default)]
pub struct FrozenIndex {
    entries: Vec<(String, Vec<Page>)>,
    urls: HashSet<String>,
}

impl FrozenIndex {
    /// Generator keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn pages(&self, key: &str) -> &[Page] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, pages)| pages.as_slice())
            .unwrap_or(&[])
    }

    pub fn all_pages(&self) -> impl Iterator<Item = &Page> {
        self.entries.iter().flat_map(|(_, pages)| pages.iter())
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn find_by_url(&self, url: &str) -> Option<&Page> {
        if !self.contains_url(url) {
            return None;
        }
        self.all_pages().find(|p| p.url() == url)
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, pages)| pages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pages grouped for listing, built from the frozen index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub id: String,
    pub generator: String,
    pub pages: Vec<Page>,
}

impl Collection {
    pub fn new(id: impl Into<String>, generator: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: id.into(),
            generator: generator.into(),
            pages,
        }
    }
}
