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

//! Deterministic in-process front end.

use crate::ledger::Ledger;
use charon_frontend::{
    ArenaHandle, AstHandle, DiagnosticHandle, DiagnosticItem, FrontEnd, FrontEndError,
    SourceHandle, SourceLocation, TokenizerHandle,
};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// A diagnostic produced by a [`DiagnosticRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeDiagnostic {
    pub offset: usize,
    pub length: usize,
    pub message: String,
}

impl FakeDiagnostic {
    pub fn new(offset: usize, length: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            message: message.into(),
        }
    }
}

/// Maps the text being parsed to the diagnostics the parse reports.
pub type DiagnosticRule = Arc<dyn Fn(&str) -> Vec<FakeDiagnostic> + Send + Sync>;

/// The rule used unless a test installs its own.
///
/// Every `?` byte is an unexpected symbol of length 1, and a `"` without a
/// closing quote reports an unterminated string running to the end of the text.
pub fn default_rule(text: &str) -> Vec<FakeDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut open_quote = None;

    for (offset, byte) in text.bytes().enumerate() {
        match byte {
            b'?' => diagnostics.push(FakeDiagnostic::new(offset, 1, "unexpected symbol '?'")),
            b'"' => {
                open_quote = match open_quote {
                    Some(_) => None,
                    None => Some(offset),
                }
            }
            _ => {}
        }
    }

    if let Some(start) = open_quote {
        diagnostics.push(FakeDiagnostic::new(
            start,
            text.len() - start,
            "unterminated string",
        ));
    }

    diagnostics
}

/// Front end that parses nothing but honours the whole resource contract.
///
/// Handles are unique increasing integers. Every call is recorded in the
/// shared [`Ledger`].
pub struct FakeFrontEnd {
    ledger: Ledger,
    rule: DiagnosticRule,
    next_id: usize,
    active_arena: Option<usize>,
    sources: HashMap<usize, String>,
    tokenizers: HashMap<usize, usize>,
    /// Messages of the diagnostics reported in the current context.
    diagnostics: Vec<(DiagnosticItem, String)>,
    fail_next_arena: bool,
    fail_next_parse: bool,
    parse_delay: Option<Duration>,
}

impl Default for FakeFrontEnd {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FakeFrontEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeFrontEnd")
            .field("ledger", &self.ledger.snapshot())
            .field("active_arena", &self.active_arena)
            .finish_non_exhaustive()
    }
}

impl FakeFrontEnd {
    pub fn new() -> Self {
        Self {
            ledger: Ledger::new(),
            rule: Arc::new(default_rule),
            next_id: 0,
            active_arena: None,
            sources: HashMap::new(),
            tokenizers: HashMap::new(),
            diagnostics: Vec::new(),
            fail_next_arena: false,
            fail_next_parse: false,
            parse_delay: None,
        }
    }

    /// Replace the diagnostic rule.
    pub fn with_rule<R>(mut self, rule: R) -> Self
    where
        R: Fn(&str) -> Vec<FakeDiagnostic> + Send + Sync + 'static,
    {
        self.rule = Arc::new(rule);
        self
    }

    /// Sleep inside every parse, to widen race windows in concurrency tests.
    pub fn with_parse_delay(mut self, delay: Duration) -> Self {
        self.parse_delay = Some(delay);
        self
    }

    /// Make the next `create_arena` call fail with `AllocationFailed`.
    pub fn fail_next_arena(&mut self) {
        self.fail_next_arena = true;
    }

    /// Make the next `parse_root` call fail with `AllocationFailed`, as a
    /// front end does when the AST cannot be allocated.
    pub fn fail_next_parse(&mut self) {
        self.fail_next_parse = true;
    }

    /// A handle onto the ledger; stays valid after the fake is moved.
    pub fn ledger(&self) -> Ledger {
        self.ledger.clone()
    }

    fn next_raw(&mut self) -> NonZeroUsize {
        self.next_id += 1;
        NonZeroUsize::new(self.next_id).unwrap_or(NonZeroUsize::MIN)
    }
}

impl FrontEnd for FakeFrontEnd {
    fn begin_analysis_context(&mut self) {
        self.ledger.context_opened();
        self.diagnostics.clear();
    }

    fn end_analysis_context(&mut self) {
        self.ledger.context_closed();
        self.diagnostics.clear();
    }

    fn create_arena(&mut self) -> Result<ArenaHandle, FrontEndError> {
        if std::mem::take(&mut self.fail_next_arena) {
            return Err(FrontEndError::AllocationFailed { what: "arena" });
        }
        let raw = self.next_raw();
        self.ledger.arena_created(raw.get());
        Ok(ArenaHandle::from_raw(raw))
    }

    fn free_arena(&mut self, arena: ArenaHandle) {
        let raw = arena.as_raw().get();
        if self.active_arena == Some(raw) {
            self.active_arena = None;
        }
        self.ledger.arena_freed(raw);
    }

    fn set_active_arena(&mut self, arena: &ArenaHandle) {
        self.active_arena = Some(arena.as_raw().get());
    }

    fn make_source(&mut self, _name: &str, text: &str) -> Result<SourceHandle, FrontEndError> {
        if let Some(position) = text.find('\0') {
            return Err(FrontEndError::InvalidInput {
                reason: format!("document text contains a NUL byte at offset {}", position),
            });
        }
        let raw = self.next_raw();
        self.sources.insert(raw.get(), text.to_string());
        self.ledger.source_created(raw.get());
        Ok(SourceHandle::from_raw(raw))
    }

    fn free_source(&mut self, source: SourceHandle) {
        let raw = source.as_raw().get();
        self.sources.remove(&raw);
        self.ledger.source_freed(raw);
    }

    fn init_tokenizer(&mut self, source: &SourceHandle) -> Result<TokenizerHandle, FrontEndError> {
        self.ledger.allocation(self.active_arena);
        let raw = self.next_raw();
        self.tokenizers.insert(raw.get(), source.as_raw().get());
        Ok(TokenizerHandle::from_raw(raw))
    }

    fn parse_root(&mut self, tokenizer: TokenizerHandle) -> Result<AstHandle, FrontEndError> {
        self.ledger.allocation(self.active_arena);
        if std::mem::take(&mut self.fail_next_parse) {
            self.tokenizers.remove(&tokenizer.as_raw().get());
            return Err(FrontEndError::AllocationFailed { what: "ast" });
        }
        if let Some(delay) = self.parse_delay {
            std::thread::sleep(delay);
        }

        let text = self
            .tokenizers
            .remove(&tokenizer.as_raw().get())
            .and_then(|source| self.sources.get(&source))
            .cloned()
            .unwrap_or_default();

        for diagnostic in (self.rule)(&text) {
            let handle = DiagnosticHandle::from_raw(self.next_raw());
            let item = DiagnosticItem::new(
                handle,
                SourceLocation::new(diagnostic.offset, diagnostic.length),
            );
            self.diagnostics.push((item, diagnostic.message));
        }

        let raw = self.next_raw();
        self.ledger
            .ast_parsed(raw.get(), self.active_arena.unwrap_or(0), &text);
        Ok(AstHandle::from_raw(raw))
    }

    fn collect_diagnostics(&mut self) -> Vec<DiagnosticItem> {
        self.diagnostics.iter().map(|(item, _)| *item).collect()
    }

    fn format_diagnostic_message(&mut self, item: &DiagnosticItem) -> String {
        match self
            .diagnostics
            .iter()
            .find(|(known, _)| known.handle == item.handle)
        {
            Some((_, message)) => message.clone(),
            None => {
                self.ledger.stale_diagnostic_read();
                String::new()
            }
        }
    }
}
