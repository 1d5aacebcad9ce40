// Charon Language Server
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cache of analyzed documents.
//!
//! Each open document maps to the arena its last analysis pass populated
//! and the AST root living in that arena. The cache owns the arenas: an
//! entry handed back by [`put`](DocumentCache::put) or
//! [`remove`](DocumentCache::remove) carries its arena out of the cache and
//! the caller is responsible for freeing it.
//!
//! # Thread Safety
//!
//! Backed by `DashMap`, so lookups never block behind an analysis pass.
//! Replacement is an atomic swap per URI.

use charon_frontend::{ArenaHandle, AstHandle};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Instant;
use tower_lsp::lsp_types::Url;
use tracing::debug;

/// Result of one analysis pass, owned by the cache.
#[derive(Debug)]
pub struct CachedDocument {
    /// Arena holding the AST. Freed once the entry is replaced or removed.
    arena: ArenaHandle,
    ast: AstHandle,
    /// Document version supplied by the editor, if any.
    pub version: Option<i32>,
    /// Number of diagnostics published for this analysis.
    pub diagnostic_count: usize,
    /// Byte length of the analyzed text.
    pub text_length: usize,
    pub analyzed_at: Instant,
}

impl CachedDocument {
    pub fn new(arena: ArenaHandle, ast: AstHandle, version: Option<i32>) -> Self {
        Self {
            arena,
            ast,
            version,
            diagnostic_count: 0,
            text_length: 0,
            analyzed_at: Instant::now(),
        }
    }

    pub fn with_diagnostic_count(mut self, count: usize) -> Self {
        self.diagnostic_count = count;
        self
    }

    pub fn with_text_length(mut self, length: usize) -> Self {
        self.text_length = length;
        self
    }

    pub fn ast(&self) -> AstHandle {
        self.ast
    }

    pub fn arena(&self) -> &ArenaHandle {
        &self.arena
    }

    /// Give up the entry, returning the arena that must now be freed.
    pub fn into_arena(self) -> ArenaHandle {
        self.arena
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            ast: self.ast,
            version: self.version,
            diagnostic_count: self.diagnostic_count,
            text_length: self.text_length,
            analyzed_at: self.analyzed_at,
        }
    }
}

/// Copyable view of a cache entry. Does not keep the arena alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub ast: AstHandle,
    pub version: Option<i32>,
    pub diagnostic_count: usize,
    pub text_length: usize,
    pub analyzed_at: Instant,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    /// Entries installed for a URI that had none.
    pub inserts: u64,
    /// Entries installed over an existing one.
    pub replacements: u64,
    /// Entries removed on close or shutdown.
    pub removals: u64,
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Current number of cached documents.
    pub current_size: usize,
}

/// URI to analysis result map.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: DashMap<Url, CachedDocument>,
    stats: Mutex<CacheStatistics>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `entry` for `uri`, returning the entry it replaced.
    ///
    /// The returned entry's arena is no longer reachable from the cache and
    /// must be freed by the caller.
    pub fn put(&self, uri: Url, entry: CachedDocument) -> Option<CachedDocument> {
        debug!(
            "Caching analysis of {} (version {:?}, {} diagnostics)",
            uri, entry.version, entry.diagnostic_count
        );
        let previous = self.documents.insert(uri, entry);

        let mut stats = self.stats.lock();
        if previous.is_some() {
            stats.replacements += 1;
        } else {
            stats.inserts += 1;
        }
        previous
    }

    pub fn get(&self, uri: &Url) -> Option<DocumentSnapshot> {
        let snapshot = self.documents.get(uri).map(|entry| entry.snapshot());

        let mut stats = self.stats.lock();
        if snapshot.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        snapshot
    }

    /// Detach the entry for `uri`. The caller frees its arena.
    pub fn remove(&self, uri: &Url) -> Option<CachedDocument> {
        let removed = self.documents.remove(uri).map(|(_, entry)| entry);
        if removed.is_some() {
            self.stats.lock().removals += 1;
        }
        removed
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn uris(&self) -> Vec<Url> {
        self.documents.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Detach every entry.
    pub fn drain(&self) -> Vec<(Url, CachedDocument)> {
        // Removing while iterating a DashMap deadlocks, so collect keys first
        self.uris()
            .into_iter()
            .filter_map(|uri| self.remove(&uri).map(|entry| (uri, entry)))
            .collect()
    }

    pub fn statistics(&self) -> CacheStatistics {
        let mut stats = self.stats.lock().clone();
        stats.current_size = self.documents.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///test/{}.charon", name)).unwrap()
    }

    fn entry(id: usize, version: Option<i32>) -> CachedDocument {
        let raw = NonZeroUsize::new(id).unwrap();
        CachedDocument::new(ArenaHandle::from_raw(raw), AstHandle::from_raw(raw), version)
    }

    #[test]
    fn test_put_and_get() {
        let cache = DocumentCache::new();
        assert!(cache.put(uri("a"), entry(1, Some(1)).with_diagnostic_count(2)).is_none());

        let snapshot = cache.get(&uri("a")).unwrap();
        assert_eq!(snapshot.version, Some(1));
        assert_eq!(snapshot.diagnostic_count, 2);
        assert_eq!(snapshot.ast.as_raw().get(), 1);
        assert!(cache.contains(&uri("a")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_returns_replaced_entry() {
        let cache = DocumentCache::new();
        cache.put(uri("a"), entry(1, Some(1)));
        let old = cache.put(uri("a"), entry(2, Some(2))).unwrap();

        assert_eq!(old.into_arena().as_raw().get(), 1);
        assert_eq!(cache.get(&uri("a")).unwrap().ast.as_raw().get(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove() {
        let cache = DocumentCache::new();
        cache.put(uri("a"), entry(1, None));
        assert!(cache.remove(&uri("a")).is_some());
        assert!(cache.remove(&uri("a")).is_none());
        assert!(cache.is_empty());
        assert!(cache.get(&uri("a")).is_none());
    }

    #[test]
    fn test_drain_takes_everything() {
        let cache = DocumentCache::new();
        for id in 1..=5 {
            cache.put(uri(&id.to_string()), entry(id, None));
        }

        let mut drained: Vec<usize> = cache
            .drain()
            .into_iter()
            .map(|(_, entry)| entry.into_arena().as_raw().get())
            .collect();
        drained.sort_unstable();

        assert_eq!(drained, vec![1, 2, 3, 4, 5]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_statistics() {
        let cache = DocumentCache::new();
        cache.put(uri("a"), entry(1, None));
        cache.put(uri("a"), entry(2, None));
        cache.put(uri("b"), entry(3, None));
        cache.get(&uri("a"));
        cache.get(&uri("missing"));
        cache.remove(&uri("b"));

        let stats = cache.statistics();
        assert_eq!(stats.inserts, 2);
        assert_eq!(stats.replacements, 1);
        assert_eq!(stats.removals, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.current_size, 1);
    }

    #[test]
    fn test_uris() {
        let cache = DocumentCache::new();
        cache.put(uri("a"), entry(1, None));
        cache.put(uri("b"), entry(2, None));
        let mut uris = cache.uris();
        uris.sort();
        assert_eq!(uris, vec![uri("a"), uri("b")]);
    }
}
