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

//! Document processing: one full analysis pass per document version.
//!
//! # Pass Structure
//!
//! Every call to [`DocumentProcessor::process`] runs the same sequence under
//! the session lock:
//!
//! 1. Open the analysis context.
//! 2. Wrap the text in a source owned by the pass.
//! 3. Create and activate a fresh arena.
//! 4. Tokenize and parse into that arena.
//! 5. Collect diagnostics and translate their byte spans into LSP ranges.
//! 6. Install the new arena and AST in the cache; free the arena it replaces.
//! 7. Close the context and release the source.
//!
//! There is no incremental re-parse. Every edit reanalyzes the full text.
//!
//! # Thread Safety
//!
//! The front end's state is process-wide, so at most one pass runs at a
//! time. The session mutex is that critical section, and cache updates that
//! free arenas happen inside it.

use crate::config::ServerConfig;
use crate::constants::DIAGNOSTIC_SOURCE;
use crate::document_cache::{CacheStatistics, CachedDocument, DocumentCache, DocumentSnapshot};
use crate::error::AnalysisError;
use crate::position::{LineIndex, PositionEncoding};
use charon_frontend::{AnalysisSession, FrontEnd, FrontEndError};
use parking_lot::{Mutex, RwLock};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Url};
use tracing::{debug, warn};

/// What a pass produced for the protocol layer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Diagnostics to publish for the analyzed version.
    Published {
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    },
    /// A newer version is already cached; nothing was analyzed.
    Stale,
}

impl AnalysisOutcome {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            AnalysisOutcome::Published { diagnostics, .. } => diagnostics,
            AnalysisOutcome::Stale => &[],
        }
    }
}

/// Runs analysis passes and owns their results.
pub struct DocumentProcessor<F: FrontEnd> {
    session: Mutex<AnalysisSession<F>>,
    cache: DocumentCache,
    max_document_size: RwLock<usize>,
    position_encoding: RwLock<PositionEncoding>,
}

impl<F: FrontEnd> DocumentProcessor<F> {
    /// Create a processor with the default limits (64 MB, UTF-16 columns).
    pub fn new(frontend: F) -> Self {
        Self::with_config(frontend, &ServerConfig::default())
    }

    pub fn with_config(frontend: F, config: &ServerConfig) -> Self {
        Self {
            session: Mutex::new(AnalysisSession::new(frontend)),
            cache: DocumentCache::new(),
            max_document_size: RwLock::new(config.max_document_size),
            position_encoding: RwLock::new(config.position_encoding),
        }
    }

    /// Apply every runtime-adjustable setting from `config`.
    pub fn apply_config(&self, config: &ServerConfig) {
        self.set_max_document_size(config.max_document_size);
        self.set_position_encoding(config.position_encoding);
    }

    /// Analyze `text` as the current content of `uri`.
    ///
    /// # Returns
    ///
    /// - `Published`: the diagnostics for this version. The cache now holds
    ///   the AST from this exact call.
    /// - `Stale`: the cache already holds a newer version; nothing changed.
    ///
    /// # Error Handling
    ///
    /// - Oversized text: `DocumentTooLarge`, checked before touching the front end
    /// - Text the front end cannot accept (NUL byte): a single diagnostic
    ///   covering the whole document; the previous cache entry is kept
    /// - Allocation or contract failures: `Fatal`; the session must stop
    pub fn process(
        &self,
        uri: &Url,
        text: &str,
        version: Option<i32>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let limit = self.max_document_size();
        if text.len() > limit {
            warn!(
                "Document size limit exceeded for {}: {} bytes > {} bytes maximum (skipped)",
                uri,
                text.len(),
                limit
            );
            return Err(AnalysisError::DocumentTooLarge {
                size: text.len(),
                limit,
            });
        }

        let encoding = self.position_encoding();
        let mut session = self.session.lock();

        if let (Some(requested), Some(cached)) =
            (version, self.cache.get(uri).and_then(|snapshot| snapshot.version))
        {
            if cached > requested {
                debug!(
                    "Skipping stale analysis of {}: version {} < cached {}",
                    uri, requested, cached
                );
                return Ok(AnalysisOutcome::Stale);
            }
        }

        debug!(
            "Analyzing {} ({} bytes, version {:?})",
            uri,
            text.len(),
            version
        );
        let mut pass = session.begin_pass();

        let source = match pass.make_source(uri.as_str(), text) {
            Ok(source) => source,
            Err(err @ FrontEndError::InvalidInput { .. }) => {
                warn!("Cannot analyze {}: {}", uri, err);
                return Ok(AnalysisOutcome::Published {
                    diagnostics: vec![whole_document_diagnostic(text, &err, encoding)],
                    version,
                });
            }
            Err(err) => return Err(err.into()),
        };

        pass.fresh_arena()?;
        let tokenizer = pass.init_tokenizer(source)?;
        let ast = pass.parse_root(tokenizer)?;

        let items = pass.collect_diagnostics();
        let index = LineIndex::new(text);
        let diagnostics: Vec<Diagnostic> = items
            .iter()
            .map(|item| Diagnostic {
                range: index.range(item.location, encoding),
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: pass.format_message(item),
                ..Default::default()
            })
            .collect();
        debug!("Analysis of {} found {} diagnostics", uri, diagnostics.len());

        let entry = CachedDocument::new(pass.commit_arena()?, ast, version)
            .with_diagnostic_count(diagnostics.len())
            .with_text_length(text.len());
        if let Some(previous) = self.cache.put(uri.clone(), entry) {
            pass.free_arena(previous.into_arena());
        }

        Ok(AnalysisOutcome::Published {
            diagnostics,
            version,
        })
    }

    /// Forget `uri` and free its arena. Returns false for unknown documents.
    pub fn close(&self, uri: &Url) -> bool {
        let mut session = self.session.lock();
        match self.cache.remove(uri) {
            Some(entry) => {
                debug!("Releasing analysis of {}", uri);
                session.release_arena(entry.into_arena());
                true
            }
            None => {
                debug!("Close for unknown document {} ignored", uri);
                false
            }
        }
    }

    /// Free every cached arena. Returns how many documents were released.
    pub fn shutdown(&self) -> usize {
        let mut session = self.session.lock();
        let entries = self.cache.drain();
        let count = entries.len();
        for (uri, entry) in entries {
            debug!("Releasing analysis of {} on shutdown", uri);
            session.release_arena(entry.into_arena());
        }
        count
    }

    pub fn snapshot(&self, uri: &Url) -> Option<DocumentSnapshot> {
        self.cache.get(uri)
    }

    pub fn open_documents(&self) -> Vec<Url> {
        self.cache.uris()
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    /// Number of analysis passes started so far.
    pub fn passes_started(&self) -> u64 {
        self.session.lock().passes_started()
    }

    pub fn position_encoding(&self) -> PositionEncoding {
        *self.position_encoding.read()
    }

    pub fn set_position_encoding(&self, encoding: PositionEncoding) {
        *self.position_encoding.write() = encoding;
        debug!("Position encoding set to {}", encoding);
    }

    pub fn max_document_size(&self) -> usize {
        *self.max_document_size.read()
    }

    pub fn set_max_document_size(&self, new_max: usize) {
        *self.max_document_size.write() = new_max;
        debug!("Max document size updated to: {} bytes", new_max);
    }
}

impl<F: FrontEnd> Drop for DocumentProcessor<F> {
    fn drop(&mut self) {
        let released = self.shutdown();
        if released > 0 {
            debug!("Released {} cached documents on drop", released);
        }
    }
}

/// A diagnostic spanning the whole text.
fn whole_document_diagnostic(
    text: &str,
    err: &FrontEndError,
    encoding: PositionEncoding,
) -> Diagnostic {
    let end = LineIndex::new(text).position(text.len(), encoding);
    Diagnostic {
        range: Range::new(Position::new(0, 0), end),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: err.to_string(),
        ..Default::default()
    }
}

impl<F: FrontEnd + Default> Default for DocumentProcessor<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charon_test::{documents, FakeFrontEnd};

    fn uri(name: &str) -> Url {
        Url::parse(&documents::uri_for(name)).unwrap()
    }

    fn processor() -> (DocumentProcessor<FakeFrontEnd>, charon_test::Ledger) {
        let frontend = FakeFrontEnd::new();
        let ledger = frontend.ledger();
        (DocumentProcessor::new(frontend), ledger)
    }

    #[test]
    fn test_clean_document_has_no_diagnostics() {
        let (processor, ledger) = processor();
        let outcome = processor.process(&uri("clean"), documents::CLEAN, Some(1)).unwrap();
        assert!(outcome.diagnostics().is_empty());
        assert_eq!(ledger.snapshot().live_arenas, 1);
        ledger.assert_clean();
    }

    #[test]
    fn test_diagnostic_translation() {
        let (processor, _ledger) = processor();
        let outcome = processor
            .process(&uri("one"), documents::ONE_ERROR, Some(1))
            .unwrap();

        let diagnostics = outcome.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range, Range::new(Position::new(1, 12), Position::new(1, 13)));
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostics[0].source.as_deref(), Some("charon"));
        assert_eq!(diagnostics[0].message, "unexpected symbol '?'");
    }

    #[test]
    fn test_cache_holds_ast_from_latest_call() {
        let (processor, ledger) = processor();
        let doc = uri("doc");
        processor.process(&doc, "first ?", Some(1)).unwrap();
        processor.process(&doc, "second", Some(2)).unwrap();

        let snapshot = processor.snapshot(&doc).unwrap();
        let record = ledger.ast_record(snapshot.ast.as_raw().get()).unwrap();
        assert_eq!(record.text, "second");
        assert_eq!(snapshot.version, Some(2));
        assert_eq!(snapshot.diagnostic_count, 0);
        assert!(ledger.is_ast_live(snapshot.ast.as_raw().get()));
    }

    #[test]
    fn test_replacement_frees_previous_arena_once() {
        let (processor, ledger) = processor();
        let doc = uri("doc");
        for version in 1..=5 {
            processor.process(&doc, documents::TWO_ERRORS, Some(version)).unwrap();
        }

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.arenas_created, 5);
        assert_eq!(snapshot.arenas_freed, 4);
        assert_eq!(snapshot.live_arenas, 1);
        ledger.assert_clean();
    }

    #[test]
    fn test_stale_version_is_skipped() {
        let (processor, ledger) = processor();
        let doc = uri("doc");
        processor.process(&doc, "new", Some(5)).unwrap();

        let outcome = processor.process(&doc, "old ?", Some(3)).unwrap();
        assert_eq!(outcome, AnalysisOutcome::Stale);
        assert_eq!(ledger.snapshot().arenas_created, 1);
        assert_eq!(processor.snapshot(&doc).unwrap().version, Some(5));
    }

    #[test]
    fn test_same_version_is_reanalyzed() {
        let (processor, _ledger) = processor();
        let doc = uri("doc");
        processor.process(&doc, "a", Some(2)).unwrap();
        let outcome = processor.process(&doc, "a ?", Some(2)).unwrap();
        assert_eq!(outcome.diagnostics().len(), 1);
    }

    #[test]
    fn test_unversioned_documents_are_never_stale() {
        let (processor, _ledger) = processor();
        let doc = uri("doc");
        processor.process(&doc, "a", Some(9)).unwrap();
        let outcome = processor.process(&doc, "b", None).unwrap();
        assert!(matches!(outcome, AnalysisOutcome::Published { version: None, .. }));
    }

    #[test]
    fn test_document_too_large() {
        let (processor, ledger) = processor();
        processor.set_max_document_size(8);
        let err = processor.process(&uri("big"), "0123456789", None).unwrap_err();
        assert_eq!(err, AnalysisError::DocumentTooLarge { size: 10, limit: 8 });
        assert_eq!(ledger.snapshot().contexts_opened, 0);
    }

    #[test]
    fn test_invalid_input_keeps_previous_entry() {
        let (processor, ledger) = processor();
        let doc = uri("doc");
        processor.process(&doc, "good", Some(1)).unwrap();
        let before = processor.snapshot(&doc).unwrap();

        let outcome = processor.process(&doc, "bad\0\nline", Some(2)).unwrap();
        let diagnostics = outcome.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range, Range::new(Position::new(0, 0), Position::new(1, 4)));
        assert!(diagnostics[0].message.contains("NUL"));

        assert_eq!(processor.snapshot(&doc).unwrap().ast, before.ast);
        assert_eq!(ledger.snapshot().live_arenas, 1);
        ledger.assert_clean();
    }

    #[test]
    fn test_allocation_failure_is_fatal() {
        let mut frontend = FakeFrontEnd::new();
        frontend.fail_next_arena();
        let ledger = frontend.ledger();
        let processor = DocumentProcessor::new(frontend);

        let err = processor.process(&uri("doc"), "text", Some(1)).unwrap_err();
        assert!(err.is_fatal());
        assert!(processor.snapshot(&uri("doc")).is_none());
        ledger.assert_clean();
    }

    #[test]
    fn test_parse_failure_is_fatal_and_keeps_previous_entry() {
        let frontend = FakeFrontEnd::new();
        let ledger = frontend.ledger();
        let processor = DocumentProcessor::new(frontend);
        let doc = uri("doc");
        processor.process(&doc, "first", Some(1)).unwrap();
        let before = processor.snapshot(&doc).unwrap();

        processor.session.lock().frontend_mut().fail_next_parse();
        let err = processor.process(&doc, "second", Some(2)).unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(
            err,
            AnalysisError::Fatal(FrontEndError::AllocationFailed { what: "ast" })
        ));
        assert_eq!(processor.snapshot(&doc).unwrap().ast, before.ast);
        assert_eq!(ledger.snapshot().live_arenas, 1);
        ledger.assert_clean();
    }

    #[test]
    fn test_close_frees_arena() {
        let (processor, ledger) = processor();
        let doc = uri("doc");
        processor.process(&doc, "text", Some(1)).unwrap();

        assert!(processor.close(&doc));
        assert!(!processor.close(&doc));
        assert!(processor.snapshot(&doc).is_none());
        assert_eq!(ledger.snapshot().live_arenas, 0);
        ledger.assert_clean();
    }

    #[test]
    fn test_close_unknown_document_is_noop() {
        let (processor, ledger) = processor();
        assert!(!processor.close(&uri("never-opened")));
        assert_eq!(ledger.snapshot(), charon_test::LedgerSnapshot::default());
    }

    #[test]
    fn test_shutdown_and_drop_free_everything() {
        let (processor, ledger) = processor();
        for name in ["a", "b", "c"] {
            processor.process(&uri(name), "x", None).unwrap();
        }
        assert_eq!(processor.open_documents().len(), 3);
        assert_eq!(processor.shutdown(), 3);
        assert_eq!(ledger.snapshot().live_arenas, 0);

        processor.process(&uri("d"), "x", None).unwrap();
        drop(processor);
        assert_eq!(ledger.snapshot().live_arenas, 0);
        ledger.assert_clean();
    }

    #[test]
    fn test_position_encoding_is_applied() {
        let (processor, _ledger) = processor();
        let doc = uri("multibyte");

        // 'é' is two bytes but one UTF-16 unit
        processor.set_position_encoding(PositionEncoding::Utf8);
        let outcome = processor.process(&doc, documents::MULTIBYTE, None).unwrap();
        assert_eq!(outcome.diagnostics()[0].range.start, Position::new(0, 12));

        processor.set_position_encoding(PositionEncoding::Utf16);
        let outcome = processor.process(&doc, documents::MULTIBYTE, None).unwrap();
        assert_eq!(outcome.diagnostics()[0].range.start, Position::new(0, 11));
    }

    #[test]
    fn test_apply_config() {
        let (processor, _ledger) = processor();
        processor.apply_config(&ServerConfig {
            max_document_size: 10,
            position_encoding: PositionEncoding::Utf32,
        });
        assert_eq!(processor.max_document_size(), 10);
        assert_eq!(processor.position_encoding(), PositionEncoding::Utf32);
    }

    #[test]
    fn test_statistics_and_passes() {
        let (processor, _ledger) = processor();
        processor.process(&uri("a"), "x", Some(1)).unwrap();
        processor.process(&uri("a"), "y", Some(2)).unwrap();
        assert_eq!(processor.passes_started(), 2);
        let stats = processor.statistics();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.replacements, 1);
        assert_eq!(stats.current_size, 1);
    }
}
