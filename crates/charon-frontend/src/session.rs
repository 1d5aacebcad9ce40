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

//! Scoped access to the front end's global analysis state.
//!
//! The front end keeps its active arena and diagnostic list in process-wide
//! globals. [`AnalysisSession`] turns that implicit state into an explicit
//! value: whoever holds `&mut AnalysisSession` is the only party allowed to
//! touch the front end, and every pass goes through an [`AnalysisPass`]
//! guard whose `Drop` closes the context and releases what the pass
//! created, on every exit path.

use crate::diagnostic::DiagnosticItem;
use crate::error::FrontEndError;
use crate::handle::{ArenaHandle, AstHandle, SourceHandle, TokenizerHandle};
use crate::FrontEnd;
use std::num::NonZeroUsize;
use tracing::{debug, trace, warn};

/// Owner of a front end and the global state behind it.
///
/// Wrap it in a mutex to share between threads; the mutex is then the
/// critical section for arena activation and diagnostic collection.
pub struct AnalysisSession<F: FrontEnd> {
    frontend: F,
    passes_started: u64,
}

impl<F: FrontEnd> AnalysisSession<F> {
    pub fn new(frontend: F) -> Self {
        Self {
            frontend,
            passes_started: 0,
        }
    }

    /// Open the analysis context and return the guard that closes it.
    ///
    /// The returned pass borrows the session mutably, so passes cannot nest.
    pub fn begin_pass(&mut self) -> AnalysisPass<'_, F> {
        self.passes_started += 1;
        let serial = self.passes_started;
        debug!("Opening analysis context for pass #{}", serial);
        self.frontend.begin_analysis_context();

        AnalysisPass {
            frontend: &mut self.frontend,
            serial,
            sources: Vec::new(),
            pending_arena: None,
            active_arena: None,
        }
    }

    /// Free an arena outside of a pass (document close, shutdown).
    pub fn release_arena(&mut self, arena: ArenaHandle) {
        trace!("Releasing {:?}", arena);
        self.frontend.free_arena(arena);
    }

    /// Number of passes opened so far.
    pub fn passes_started(&self) -> u64 {
        self.passes_started
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn into_inner(self) -> F {
        self.frontend
    }
}

/// Identifies a source created within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceId(usize);

/// One open analysis context.
///
/// Dropping the pass closes the analysis context, frees every source it
/// created, and frees the pass arena unless it was taken with
/// [`commit_arena`](AnalysisPass::commit_arena).
pub struct AnalysisPass<'s, F: FrontEnd> {
    frontend: &'s mut F,
    serial: u64,
    sources: Vec<SourceHandle>,
    /// Arena created by this pass and not yet handed to an owner.
    pending_arena: Option<ArenaHandle>,
    /// Address of the arena currently active in the front end.
    active_arena: Option<NonZeroUsize>,
}

impl<'s, F: FrontEnd> AnalysisPass<'s, F> {
    /// Sequence number of this pass within its session.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Wrap `text` in a source object owned by this pass.
    pub fn make_source(&mut self, name: &str, text: &str) -> Result<SourceId, FrontEndError> {
        let source = self.frontend.make_source(name, text)?;
        trace!("Pass #{}: created {:?} for {} ({} bytes)", self.serial, source, name, text.len());
        self.sources.push(source);
        Ok(SourceId(self.sources.len() - 1))
    }

    /// Create a fresh arena and make it the active one.
    ///
    /// An arena from an earlier call that was never committed is freed first.
    pub fn fresh_arena(&mut self) -> Result<(), FrontEndError> {
        if let Some(stale) = self.pending_arena.take() {
            warn!("Pass #{}: replacing uncommitted {:?}", self.serial, stale);
            self.drop_arena(stale);
        }

        let arena = self.frontend.create_arena()?;
        self.frontend.set_active_arena(&arena);
        trace!("Pass #{}: activated {:?}", self.serial, arena);
        self.active_arena = Some(arena.as_raw());
        self.pending_arena = Some(arena);
        Ok(())
    }

    /// Start tokenizing a source of this pass.
    pub fn init_tokenizer(&mut self, source: SourceId) -> Result<TokenizerHandle, FrontEndError> {
        self.require_active_arena()?;
        let handle = self
            .sources
            .get(source.0)
            .ok_or(FrontEndError::UnknownSource(source.0))?;
        self.frontend.init_tokenizer(handle)
    }

    /// Parse a whole module into the active arena.
    pub fn parse_root(&mut self, tokenizer: TokenizerHandle) -> Result<AstHandle, FrontEndError> {
        self.require_active_arena()?;
        self.frontend.parse_root(tokenizer)
    }

    /// Diagnostics reported so far in this pass.
    pub fn collect_diagnostics(&mut self) -> Vec<DiagnosticItem> {
        self.frontend.collect_diagnostics()
    }

    pub fn format_message(&mut self, item: &DiagnosticItem) -> String {
        self.frontend.format_diagnostic_message(item)
    }

    /// Take ownership of the pass arena.
    ///
    /// After this call the pass no longer frees the arena; the caller must
    /// eventually release it through [`free_arena`](AnalysisPass::free_arena)
    /// or [`AnalysisSession::release_arena`].
    pub fn commit_arena(&mut self) -> Result<ArenaHandle, FrontEndError> {
        self.pending_arena.take().ok_or(FrontEndError::NoActiveArena)
    }

    /// Free an arena owned by the caller, typically one superseded by this pass.
    pub fn free_arena(&mut self, arena: ArenaHandle) {
        trace!("Pass #{}: freeing superseded {:?}", self.serial, arena);
        self.drop_arena(arena);
    }

    fn drop_arena(&mut self, arena: ArenaHandle) {
        if self.active_arena == Some(arena.as_raw()) {
            self.active_arena = None;
        }
        self.frontend.free_arena(arena);
    }

    fn require_active_arena(&self) -> Result<(), FrontEndError> {
        match self.active_arena {
            Some(_) => Ok(()),
            None => Err(FrontEndError::NoActiveArena),
        }
    }
}

impl<'s, F: FrontEnd> Drop for AnalysisPass<'s, F> {
    fn drop(&mut self) {
        self.frontend.end_analysis_context();

        // Diagnostics may point into the sources, so they go after the context
        for source in self.sources.drain(..).rev() {
            self.frontend.free_source(source);
        }

        if let Some(arena) = self.pending_arena.take() {
            debug!("Pass #{}: freeing uncommitted {:?}", self.serial, arena);
            self.frontend.free_arena(arena);
        }

        debug!("Closed analysis context for pass #{}", self.serial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::SourceLocation;
    use crate::handle::DiagnosticHandle;

    /// Minimal front end that logs every call.
    #[derive(Default)]
    struct LoggingFrontEnd {
        next: usize,
        calls: Vec<String>,
        fail_arena: bool,
        fail_parse: bool,
    }

    impl LoggingFrontEnd {
        fn next_raw(&mut self) -> NonZeroUsize {
            self.next += 1;
            NonZeroUsize::new(self.next).unwrap()
        }
    }

    impl FrontEnd for LoggingFrontEnd {
        fn begin_analysis_context(&mut self) {
            self.calls.push("begin".into());
        }

        fn end_analysis_context(&mut self) {
            self.calls.push("end".into());
        }

        fn create_arena(&mut self) -> Result<ArenaHandle, FrontEndError> {
            if self.fail_arena {
                return Err(FrontEndError::AllocationFailed { what: "arena" });
            }
            let raw = self.next_raw();
            self.calls.push(format!("create_arena {}", raw));
            Ok(ArenaHandle::from_raw(raw))
        }

        fn free_arena(&mut self, arena: ArenaHandle) {
            self.calls.push(format!("free_arena {}", arena.as_raw()));
        }

        fn set_active_arena(&mut self, arena: &ArenaHandle) {
            self.calls.push(format!("activate {}", arena.as_raw()));
        }

        fn make_source(&mut self, _name: &str, _text: &str) -> Result<SourceHandle, FrontEndError> {
            let raw = self.next_raw();
            self.calls.push(format!("make_source {}", raw));
            Ok(SourceHandle::from_raw(raw))
        }

        fn free_source(&mut self, source: SourceHandle) {
            self.calls.push(format!("free_source {}", source.as_raw()));
        }

        fn init_tokenizer(
            &mut self,
            _source: &SourceHandle,
        ) -> Result<TokenizerHandle, FrontEndError> {
            Ok(TokenizerHandle::from_raw(self.next_raw()))
        }

        fn parse_root(&mut self, _tokenizer: TokenizerHandle) -> Result<AstHandle, FrontEndError> {
            if self.fail_parse {
                return Err(FrontEndError::AllocationFailed { what: "ast" });
            }
            self.calls.push("parse".into());
            Ok(AstHandle::from_raw(self.next_raw()))
        }

        fn collect_diagnostics(&mut self) -> Vec<DiagnosticItem> {
            vec![DiagnosticItem::new(
                DiagnosticHandle::from_raw(NonZeroUsize::new(99).unwrap()),
                SourceLocation::new(0, 1),
            )]
        }

        fn format_diagnostic_message(&mut self, _item: &DiagnosticItem) -> String {
            "unexpected symbol".to_string()
        }
    }

    #[test]
    fn test_pass_brackets_context_and_frees_source() {
        let mut session = AnalysisSession::new(LoggingFrontEnd::default());
        let arena = {
            let mut pass = session.begin_pass();
            let source = pass.make_source("file:///a.charon", "x").unwrap();
            pass.fresh_arena().unwrap();
            let tokenizer = pass.init_tokenizer(source).unwrap();
            pass.parse_root(tokenizer).unwrap();
            pass.commit_arena().unwrap()
        };

        let calls = &session.frontend().calls;
        assert_eq!(calls.first().map(String::as_str), Some("begin"));
        assert!(calls.contains(&"end".to_string()));
        assert!(calls.contains(&"free_source 1".to_string()));
        // committed arena survives the pass
        assert!(!calls.iter().any(|c| c.starts_with("free_arena")));

        session.release_arena(arena);
        assert_eq!(
            session.frontend().calls.last().map(String::as_str),
            Some("free_arena 2")
        );
    }

    #[test]
    fn test_uncommitted_arena_is_freed_on_drop() {
        let mut session = AnalysisSession::new(LoggingFrontEnd::default());
        {
            let mut pass = session.begin_pass();
            pass.fresh_arena().unwrap();
        }
        assert!(session.frontend().calls.contains(&"free_arena 1".to_string()));
    }

    #[test]
    fn test_parse_requires_active_arena() {
        let mut session = AnalysisSession::new(LoggingFrontEnd::default());
        let mut pass = session.begin_pass();
        let source = pass.make_source("file:///a.charon", "x").unwrap();
        assert_eq!(pass.init_tokenizer(source), Err(FrontEndError::NoActiveArena));
        let tokenizer = TokenizerHandle::from_raw(NonZeroUsize::new(7).unwrap());
        assert_eq!(pass.parse_root(tokenizer), Err(FrontEndError::NoActiveArena));
    }

    #[test]
    fn test_commit_without_arena_fails() {
        let mut session = AnalysisSession::new(LoggingFrontEnd::default());
        let mut pass = session.begin_pass();
        assert_eq!(pass.commit_arena(), Err(FrontEndError::NoActiveArena));
    }

    #[test]
    fn test_arena_allocation_failure_still_closes_context() {
        let mut session = AnalysisSession::new(LoggingFrontEnd {
            fail_arena: true,
            ..Default::default()
        });
        {
            let mut pass = session.begin_pass();
            assert!(pass.fresh_arena().is_err());
        }
        assert_eq!(session.frontend().calls, vec!["begin", "end"]);
    }

    #[test]
    fn test_parse_failure_frees_uncommitted_arena() {
        let mut session = AnalysisSession::new(LoggingFrontEnd {
            fail_parse: true,
            ..Default::default()
        });
        {
            let mut pass = session.begin_pass();
            let source = pass.make_source("file:///a.charon", "x").unwrap();
            pass.fresh_arena().unwrap();
            let tokenizer = pass.init_tokenizer(source).unwrap();
            assert_eq!(
                pass.parse_root(tokenizer),
                Err(FrontEndError::AllocationFailed { what: "ast" })
            );
        }

        let calls = &session.frontend().calls;
        assert!(!calls.contains(&"parse".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("free_arena 2"));
    }

    #[test]
    fn test_freeing_active_arena_deactivates_it() {
        let mut session = AnalysisSession::new(LoggingFrontEnd::default());
        let mut pass = session.begin_pass();
        let source = pass.make_source("file:///a.charon", "x").unwrap();
        pass.fresh_arena().unwrap();
        let arena = pass.commit_arena().unwrap();
        pass.free_arena(arena);
        assert_eq!(pass.init_tokenizer(source), Err(FrontEndError::NoActiveArena));
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let mut session = AnalysisSession::new(LoggingFrontEnd::default());
        let mut pass = session.begin_pass();
        pass.fresh_arena().unwrap();
        assert_eq!(
            pass.init_tokenizer(SourceId(3)),
            Err(FrontEndError::UnknownSource(3))
        );
    }

    #[test]
    fn test_pass_serials_increase() {
        let mut session = AnalysisSession::new(LoggingFrontEnd::default());
        assert_eq!(session.begin_pass().serial(), 1);
        assert_eq!(session.begin_pass().serial(), 2);
        assert_eq!(session.passes_started(), 2);
    }
}
