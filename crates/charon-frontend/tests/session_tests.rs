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

//! Analysis session contract tests against the instrumented front end.

use charon_frontend::{AnalysisSession, FrontEndError};
use charon_test::{documents, FakeDiagnostic, FakeFrontEnd};

// ============================================================================
// Pass Lifecycle
// ============================================================================

#[test]
fn test_full_pass_is_clean() {
    let frontend = FakeFrontEnd::new();
    let ledger = frontend.ledger();
    let mut session = AnalysisSession::new(frontend);

    let (arena, ast) = {
        let mut pass = session.begin_pass();
        let source = pass.make_source("file:///a.charon", documents::TWO_ERRORS).unwrap();
        pass.fresh_arena().unwrap();
        let tokenizer = pass.init_tokenizer(source).unwrap();
        let ast = pass.parse_root(tokenizer).unwrap();

        let items = pass.collect_diagnostics();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].location.offset, 8);
        assert_eq!(items[1].location.offset, documents::TWO_ERRORS.rfind('?').unwrap());

        (pass.commit_arena().unwrap(), ast)
    };

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.contexts_opened, 1);
    assert_eq!(snapshot.live_arenas, 1);
    assert_eq!(snapshot.live_sources, 0);
    assert!(ledger.is_ast_live(ast.as_raw().get()));

    session.release_arena(arena);
    assert!(!ledger.is_ast_live(ast.as_raw().get()));
    ledger.assert_clean();
}

#[test]
fn test_early_return_still_closes_context() {
    fn failing_pass(session: &mut AnalysisSession<FakeFrontEnd>) -> Result<(), FrontEndError> {
        let mut pass = session.begin_pass();
        let _source = pass.make_source("file:///a.charon", "text")?;
        pass.fresh_arena()?;
        pass.make_source("file:///b.charon", "nul\0")?;
        unreachable!("NUL bytes are rejected");
    }

    let frontend = FakeFrontEnd::new();
    let ledger = frontend.ledger();
    let mut session = AnalysisSession::new(frontend);

    let err = failing_pass(&mut session).unwrap_err();
    assert!(!err.is_fatal());

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.live_arenas, 0);
    assert_eq!(snapshot.arenas_freed, 1);
    ledger.assert_clean();
}

#[test]
fn test_unwinding_still_closes_context() {
    let frontend = FakeFrontEnd::new();
    let ledger = frontend.ledger();
    let mut session = AnalysisSession::new(frontend);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut pass = session.begin_pass();
        pass.make_source("file:///a.charon", "text").unwrap();
        pass.fresh_arena().unwrap();
        panic!("analysis aborted");
    }));
    assert!(result.is_err());

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.live_arenas, 0);
    assert_eq!(snapshot.live_sources, 0);
    ledger.assert_clean();
}

#[test]
fn test_superseded_arena_freed_inside_next_pass() {
    let frontend = FakeFrontEnd::new();
    let ledger = frontend.ledger();
    let mut session = AnalysisSession::new(frontend);

    let mut cached = None;
    for text in ["one ?", "two", "three ?"] {
        let mut pass = session.begin_pass();
        let source = pass.make_source("file:///a.charon", text).unwrap();
        pass.fresh_arena().unwrap();
        let tokenizer = pass.init_tokenizer(source).unwrap();
        pass.parse_root(tokenizer).unwrap();
        let arena = pass.commit_arena().unwrap();
        if let Some(previous) = cached.replace(arena) {
            pass.free_arena(previous);
        }
    }

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.arenas_created, 3);
    assert_eq!(snapshot.arenas_freed, 2);
    assert_eq!(snapshot.live_arenas, 1);

    if let Some(arena) = cached {
        session.release_arena(arena);
    }
    ledger.assert_clean();
}

#[test]
fn test_fresh_arena_twice_frees_the_first() {
    let frontend = FakeFrontEnd::new();
    let ledger = frontend.ledger();
    let mut session = AnalysisSession::new(frontend);

    {
        let mut pass = session.begin_pass();
        pass.fresh_arena().unwrap();
        pass.fresh_arena().unwrap();
        assert_eq!(ledger.snapshot().live_arenas, 1);
    }

    assert_eq!(ledger.snapshot().live_arenas, 0);
    ledger.assert_clean();
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_messages_are_owned_strings() {
    let frontend = FakeFrontEnd::new()
        .with_rule(|text| vec![FakeDiagnostic::new(0, text.len(), format!("{} bytes", text.len()))]);
    let ledger = frontend.ledger();
    let mut session = AnalysisSession::new(frontend);

    let messages: Vec<String> = {
        let mut pass = session.begin_pass();
        let source = pass.make_source("file:///a.charon", "abcd").unwrap();
        pass.fresh_arena().unwrap();
        let tokenizer = pass.init_tokenizer(source).unwrap();
        pass.parse_root(tokenizer).unwrap();
        pass.collect_diagnostics()
            .iter()
            .map(|item| pass.format_message(item))
            .collect()
    };

    // Messages outlive the pass that produced them
    assert_eq!(messages, vec!["4 bytes".to_string()]);
    assert_eq!(ledger.snapshot().stale_diagnostic_reads, 0);
}

#[test]
fn test_diagnostics_do_not_leak_between_passes() {
    let mut session = AnalysisSession::new(FakeFrontEnd::new());

    for (text, expected) in [("? ?", 2), ("clean", 0)] {
        let mut pass = session.begin_pass();
        let source = pass.make_source("file:///a.charon", text).unwrap();
        pass.fresh_arena().unwrap();
        let tokenizer = pass.init_tokenizer(source).unwrap();
        pass.parse_root(tokenizer).unwrap();
        assert_eq!(pass.collect_diagnostics().len(), expected, "text {:?}", text);
    }
}
