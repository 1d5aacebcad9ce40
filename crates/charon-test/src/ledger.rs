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

//! Allocation ledger shared between a [`FakeFrontEnd`](crate::FakeFrontEnd)
//! and the test that drives it.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::ThreadId;

/// Which arena an AST was parsed into, and from what text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstRecord {
    pub arena: usize,
    pub text: String,
}

/// Counters copied out of the ledger at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub arenas_created: u64,
    pub arenas_freed: u64,
    pub live_arenas: usize,
    pub double_frees: u64,
    pub sources_created: u64,
    pub live_sources: usize,
    pub contexts_opened: u64,
    pub parses: u64,
    /// Tokenizer or parser calls made while no live arena was active.
    pub allocation_violations: u64,
    /// Nested `begin` or unmatched `end` calls.
    pub context_violations: u64,
    /// Calls made inside a context from a thread other than the one that opened it.
    pub thread_violations: u64,
    /// Messages requested for diagnostics outside the context that produced them.
    pub stale_diagnostic_reads: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    counters: LedgerSnapshot,
    live_arenas: HashSet<usize>,
    live_sources: HashSet<usize>,
    asts: HashMap<usize, AstRecord>,
    context_thread: Option<ThreadId>,
}

/// Shared record of everything the fake front end allocates.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock();
        let mut snapshot = state.counters.clone();
        snapshot.live_arenas = state.live_arenas.len();
        snapshot.live_sources = state.live_sources.len();
        snapshot
    }

    pub fn is_arena_live(&self, arena: usize) -> bool {
        self.state.lock().live_arenas.contains(&arena)
    }

    pub fn ast_record(&self, ast: usize) -> Option<AstRecord> {
        self.state.lock().asts.get(&ast).cloned()
    }

    /// True when the AST exists and its arena has not been freed.
    pub fn is_ast_live(&self, ast: usize) -> bool {
        let state = self.state.lock();
        state
            .asts
            .get(&ast)
            .map_or(false, |record| state.live_arenas.contains(&record.arena))
    }

    /// Panic unless no contract violation has been recorded.
    pub fn assert_clean(&self) {
        let snapshot = self.snapshot();
        assert_eq!(snapshot.double_frees, 0, "double frees: {:?}", snapshot);
        assert_eq!(snapshot.allocation_violations, 0, "allocation violations: {:?}", snapshot);
        assert_eq!(snapshot.context_violations, 0, "context violations: {:?}", snapshot);
        assert_eq!(snapshot.thread_violations, 0, "thread violations: {:?}", snapshot);
        assert_eq!(snapshot.stale_diagnostic_reads, 0, "stale diagnostic reads: {:?}", snapshot);
        assert_eq!(snapshot.live_sources, 0, "leaked sources: {:?}", snapshot);
    }

    // ==================== Recording (used by FakeFrontEnd) ====================

    pub(crate) fn context_opened(&self) {
        let mut state = self.state.lock();
        if state.context_thread.is_some() {
            state.counters.context_violations += 1;
        }
        state.counters.contexts_opened += 1;
        state.context_thread = Some(std::thread::current().id());
    }

    pub(crate) fn context_closed(&self) {
        let mut state = self.state.lock();
        self.check_thread(&mut state);
        if state.context_thread.take().is_none() {
            state.counters.context_violations += 1;
        }
    }

    pub(crate) fn arena_created(&self, arena: usize) {
        let mut state = self.state.lock();
        state.counters.arenas_created += 1;
        state.live_arenas.insert(arena);
    }

    pub(crate) fn arena_freed(&self, arena: usize) {
        let mut state = self.state.lock();
        self.check_thread(&mut state);
        if state.live_arenas.remove(&arena) {
            state.counters.arenas_freed += 1;
        } else {
            state.counters.double_frees += 1;
        }
    }

    pub(crate) fn source_created(&self, source: usize) {
        let mut state = self.state.lock();
        self.check_thread(&mut state);
        state.counters.sources_created += 1;
        state.live_sources.insert(source);
    }

    pub(crate) fn source_freed(&self, source: usize) {
        self.state.lock().live_sources.remove(&source);
    }

    /// Record an allocation into `active`; returns false if it is not a live arena.
    pub(crate) fn allocation(&self, active: Option<usize>) -> bool {
        let mut state = self.state.lock();
        self.check_thread(&mut state);
        let ok = active.map_or(false, |arena| state.live_arenas.contains(&arena));
        if !ok {
            state.counters.allocation_violations += 1;
        }
        ok
    }

    pub(crate) fn ast_parsed(&self, ast: usize, arena: usize, text: &str) {
        let mut state = self.state.lock();
        state.counters.parses += 1;
        state.asts.insert(
            ast,
            AstRecord {
                arena,
                text: text.to_string(),
            },
        );
    }

    pub(crate) fn stale_diagnostic_read(&self) {
        self.state.lock().counters.stale_diagnostic_reads += 1;
    }

    fn check_thread(&self, state: &mut LedgerState) {
        if let Some(owner) = state.context_thread {
            if owner != std::thread::current().id() {
                state.counters.thread_violations += 1;
            }
        }
    }
}
