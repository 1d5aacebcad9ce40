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

//! Charon Test Utilities
//!
//! Shared test support for the Charon language server crates.
//!
//! # Features
//!
//! - **FakeFrontEnd**: deterministic, in-process implementation of the
//!   front-end contract. Diagnostics come from a configurable rule instead
//!   of a real parser.
//! - **Ledger**: records every arena, source and AST the fake hands out, so
//!   tests can assert that arenas are freed exactly once and that no
//!   allocation happened without an active arena.
//! - **Documents**: sample Charon sources with known diagnostics.
//!
//! # Quick Start
//!
//! ```rust
//! use charon_frontend::AnalysisSession;
//! use charon_test::{documents, FakeFrontEnd};
//!
//! let frontend = FakeFrontEnd::new();
//! let ledger = frontend.ledger();
//! let mut session = AnalysisSession::new(frontend);
//!
//! let arena = {
//!     let mut pass = session.begin_pass();
//!     let source = pass.make_source("file:///a.charon", documents::ONE_ERROR).unwrap();
//!     pass.fresh_arena().unwrap();
//!     let tokenizer = pass.init_tokenizer(source).unwrap();
//!     pass.parse_root(tokenizer).unwrap();
//!     assert_eq!(pass.collect_diagnostics().len(), 1);
//!     pass.commit_arena().unwrap()
//! };
//!
//! session.release_arena(arena);
//! ledger.assert_clean();
//! ```

pub mod documents;
pub mod fake;
pub mod ledger;

pub use fake::{default_rule, DiagnosticRule, FakeDiagnostic, FakeFrontEnd};
pub use ledger::{AstRecord, Ledger, LedgerSnapshot};
