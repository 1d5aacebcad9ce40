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

//! Charon Language Server binary.
//!
//! Speaks LSP over stdio and analyzes documents with the linked `libcharon`.
//! Logs go to stderr; stdout carries the protocol.
//!
//! # Usage
//!
//! ```bash
//! # Run the language server (stdio transport)
//! charon-lsp
//!
//! # With debug logging
//! RUST_LOG=debug charon-lsp
//! ```
//!
//! # Editor Integration
//!
//! ## Neovim (nvim-lspconfig)
//!
//! ```lua
//! require('lspconfig.configs').charon = {
//!   default_config = {
//!     cmd = { 'charon-lsp' },
//!     filetypes = { 'charon' },
//!     root_dir = function() return vim.fn.getcwd() end,
//!   },
//! }
//! require('lspconfig').charon.setup {}
//! ```

use charon_frontend::NativeFrontEnd;
use charon_lsp::constants::DEFAULT_LOG_DIRECTIVES;
use charon_lsp::CharonLanguageServer;
use tower_lsp::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging to stderr
    let filter = DEFAULT_LOG_DIRECTIVES
        .iter()
        .fold(EnvFilter::from_default_env(), |filter, directive| {
            filter.add_directive(directive.parse().expect("valid log directive"))
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Charon Language Server v{}", charon_lsp::VERSION);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = CharonLanguageServer::build_service(NativeFrontEnd::new());

    Server::new(stdin, stdout, socket).serve(service).await;
}
