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

//! Charon Language Server Protocol (LSP) Implementation
//!
//! This crate connects the Charon compiler front end to LSP-compatible
//! editors (VS Code, Neovim, Emacs, and others). Every time a document is
//! opened or edited, the full text is tokenized and parsed and the
//! resulting syntax diagnostics are published back to the editor.
//!
//! # Features
//!
//! - **Diagnostics**: Parse errors published as `ERROR` diagnostics with
//!   precise ranges
//! - **Full Document Sync**: Every edit triggers a complete reanalysis
//! - **Configurable Columns**: UTF-16 (the LSP default), UTF-8 or UTF-32
//!   character offsets
//! - **Hover / Code Actions**: Advertised; currently answer with nothing
//!
//! # Memory Management
//!
//! Each analysis pass allocates into a fresh arena owned by the document's
//! cache entry. Replacing or closing a document frees its previous arena
//! exactly once, and documents above the configured size limit (64 MB by
//! default) are not analyzed at all.
//!
//! # Usage
//!
//! ## Running the Server
//!
//! ```bash
//! # Run the language server (stdio transport)
//! charon-lsp
//!
//! # With debug logging
//! RUST_LOG=debug charon-lsp
//! ```
//!
//! ## Programmatic Usage
//!
//! Any [`FrontEnd`](charon_frontend::FrontEnd) implementation can drive the
//! server. The binary uses the native library:
//!
//! ```ignore
//! use charon_frontend::NativeFrontEnd;
//! use charon_lsp::CharonLanguageServer;
//! use tower_lsp::Server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let stdin = tokio::io::stdin();
//!     let stdout = tokio::io::stdout();
//!
//!     let (service, socket) = CharonLanguageServer::build_service(NativeFrontEnd::new());
//!     Server::new(stdin, stdout, socket).serve(service).await;
//! }
//! ```
//!
//! # Configuration
//!
//! Clients may pass `initializationOptions`:
//!
//! ```json
//! { "maxDocumentSize": 16777216, "positionEncoding": "utf-8" }
//! ```
//!
//! # Architecture
//!
//! - `backend`: LSP protocol handling, pass ordering and publication
//! - [`processor`]: one analysis pass per document version
//! - [`document_cache`]: URI to arena/AST map
//! - [`position`]: byte span to line/column translation
//! - [`lifecycle`]: server state machine
//! - [`config`]: initialization options
//! - [`utils`]: Safe string handling utilities for UTF-8 safety

mod backend;
pub mod config;
pub mod constants;
pub mod document_cache;
pub mod error;
pub mod lifecycle;
pub mod position;
pub mod processor;
pub mod utils;

pub use backend::{CharonLanguageServer, FatalHandler};
pub use config::ServerConfig;
pub use document_cache::{CacheStatistics, CachedDocument, DocumentCache, DocumentSnapshot};
pub use error::{AnalysisError, ConfigError, LifecycleError};
pub use lifecycle::{Lifecycle, SessionState};
pub use position::{locate, LineIndex, PositionEncoding};
pub use processor::{AnalysisOutcome, DocumentProcessor};

/// LSP server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
