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

//! Charon Compiler Front-End Adapter
//!
//! This crate wraps the Charon compiler front end (tokenizer, parser and
//! diagnostic collection) behind a narrow, synchronous interface that the
//! language server drives once per analysis pass.
//!
//! # The contract
//!
//! The front end keeps process-wide state: exactly one memory arena is
//! *active* at any time and receives every allocation made by the tokenizer
//! and parser, and diagnostics accumulate in a global list that is scoped by
//! an *analysis context* bracket. The [`FrontEnd`] trait mirrors that
//! contract one call at a time; none of its methods are safe to call
//! concurrently.
//!
//! Callers should not drive a [`FrontEnd`] directly. [`AnalysisSession`]
//! owns the front end and hands out [`AnalysisPass`] guards which:
//!
//! - open the analysis context on creation and close it on drop,
//! - release every source created during the pass,
//! - free any arena that was not committed to a longer-lived owner,
//! - refuse tokenize/parse calls while no arena is active.
//!
//! # Example
//!
//! ```ignore
//! use charon_frontend::AnalysisSession;
//!
//! let mut session = AnalysisSession::new(frontend);
//! let (arena, ast) = {
//!     let mut pass = session.begin_pass();
//!     let source = pass.make_source("file:///main.charon", "fn main() {}")?;
//!     pass.fresh_arena()?;
//!     let tokenizer = pass.init_tokenizer(source)?;
//!     let ast = pass.parse_root(tokenizer)?;
//!     (pass.commit_arena()?, ast)
//! };
//! // `arena` now owns `ast`; release it once the AST is no longer needed.
//! session.release_arena(arena);
//! ```
//!
//! # Native library
//!
//! With the `native` feature the crate links `libcharon` and exposes
//! `NativeFrontEnd`. Set `CHARON_LIB_DIR` to the directory containing the
//! library when building.

pub mod diagnostic;
pub mod error;
pub mod handle;
#[cfg(feature = "native")]
pub mod native;
pub mod session;

pub use diagnostic::{DiagnosticItem, SourceLocation};
pub use error::FrontEndError;
pub use handle::{ArenaHandle, AstHandle, DiagnosticHandle, SourceHandle, TokenizerHandle};
#[cfg(feature = "native")]
pub use native::NativeFrontEnd;
pub use session::{AnalysisPass, AnalysisSession, SourceId};

/// Synchronous interface to the compiler front end.
///
/// Every method operates on process-wide state owned by the implementation.
/// Implementations are `Send` so that a locked session may be handed to
/// whichever thread runs the next pass, but a single pass must start and
/// finish on the same thread.
pub trait FrontEnd: Send {
    /// Open the analysis context. Must be paired with
    /// [`end_analysis_context`](FrontEnd::end_analysis_context); not reentrant.
    fn begin_analysis_context(&mut self);

    /// Close the analysis context, discarding accumulated diagnostics.
    fn end_analysis_context(&mut self);

    /// Allocate a fresh arena.
    fn create_arena(&mut self) -> Result<ArenaHandle, FrontEndError>;

    /// Free an arena and everything allocated from it.
    fn free_arena(&mut self, arena: ArenaHandle);

    /// Make `arena` the target of all subsequent allocations.
    fn set_active_arena(&mut self, arena: &ArenaHandle);

    /// Wrap document text in a source object.
    fn make_source(&mut self, name: &str, text: &str) -> Result<SourceHandle, FrontEndError>;

    /// Release a source object. It does not need to outlive the arena.
    fn free_source(&mut self, source: SourceHandle);

    /// Create a tokenizer over `source`. Allocates from the active arena.
    fn init_tokenizer(&mut self, source: &SourceHandle) -> Result<TokenizerHandle, FrontEndError>;

    /// Parse a complete module. Allocates from the active arena.
    fn parse_root(&mut self, tokenizer: TokenizerHandle) -> Result<AstHandle, FrontEndError>;

    /// All diagnostics reported since the analysis context was opened.
    fn collect_diagnostics(&mut self) -> Vec<DiagnosticItem>;

    /// Render a diagnostic as a human readable message.
    fn format_diagnostic_message(&mut self, item: &DiagnosticItem) -> String;
}
