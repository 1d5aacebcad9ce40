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

//! LSP backend implementation.
//!
//! The backend translates protocol messages into document processor calls
//! and publishes the results. It owns two pieces of coordination:
//!
//! 1. **Pass ordering**: an async mutex held from dispatch of a pass through
//!    publication of its diagnostics, so diagnostics reach the editor in the
//!    order the edits arrived and an older analysis never overwrites a newer
//!    one.
//!
//! 2. **Thread pinning**: every pass runs inside `spawn_blocking`, so the
//!    front end's thread-local context is opened and closed on the same OS
//!    thread and the async runtime is never blocked by parsing.

use crate::config::ServerConfig;
use crate::constants::{BYTES_PER_MEGABYTE, FATAL_EXIT_CODE, SERVER_NAME, SET_TRACE_METHOD};
use crate::document_cache::CacheStatistics;
use crate::error::AnalysisError;
use crate::lifecycle::{Lifecycle, SessionState};
use crate::processor::{AnalysisOutcome, DocumentProcessor};
use charon_frontend::FrontEnd;
use parking_lot::RwLock;
use std::sync::Arc;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, ClientSocket, LanguageServer, LspService};
use tracing::{debug, error, info, warn};

/// Called once the front end has failed unrecoverably.
pub type FatalHandler = Box<dyn Fn(&AnalysisError) + Send + Sync>;

/// Charon Language Server backend.
pub struct CharonLanguageServer<F: FrontEnd + 'static> {
    /// LSP client connection.
    client: Client,
    /// Analysis passes and their cached results.
    processor: Arc<DocumentProcessor<F>>,
    lifecycle: Lifecycle,
    /// Held from dispatch of a pass until its diagnostics are published.
    pass_order: tokio::sync::Mutex<()>,
    /// Last level received through `$/setTrace`.
    trace: RwLock<TraceValue>,
    on_fatal: FatalHandler,
}

impl<F: FrontEnd + 'static> CharonLanguageServer<F> {
    /// Create a language server with default configuration.
    ///
    /// Default settings:
    /// - Max document size: 64 MB
    /// - Position encoding: UTF-16
    pub fn new(client: Client, frontend: F) -> Self {
        Self::with_config(client, frontend, ServerConfig::default())
    }

    /// Create a language server with custom configuration.
    ///
    /// Settings from the client's `initializationOptions` are applied on top
    /// of `config` during `initialize`.
    pub fn with_config(client: Client, frontend: F, config: ServerConfig) -> Self {
        Self {
            client,
            processor: Arc::new(DocumentProcessor::with_config(frontend, &config)),
            lifecycle: Lifecycle::new(),
            pass_order: tokio::sync::Mutex::new(()),
            trace: RwLock::new(TraceValue::Off),
            on_fatal: Box::new(exit_process),
        }
    }

    /// Replace the action taken after a fatal front end failure.
    ///
    /// The default exits the process with a non-zero code.
    pub fn with_fatal_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(&AnalysisError) + Send + Sync + 'static,
    {
        self.on_fatal = Box::new(handler);
        self
    }

    /// Build the tower-lsp service, including the custom `$/setTrace` handler.
    pub fn build_service(frontend: F) -> (LspService<Self>, ClientSocket) {
        LspService::build(move |client| Self::new(client, frontend))
            .custom_method(SET_TRACE_METHOD, Self::set_trace)
            .finish()
    }

    pub fn processor(&self) -> &Arc<DocumentProcessor<F>> {
        &self.processor
    }

    pub fn lifecycle_state(&self) -> SessionState {
        self.lifecycle.state()
    }

    pub fn trace_value(&self) -> TraceValue {
        self.trace.read().clone()
    }

    /// Get current cache statistics.
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.processor.statistics()
    }

    /// Update maximum document size (can be called during runtime).
    pub fn set_max_document_size(&self, new_max: usize) {
        self.processor.set_max_document_size(new_max);
    }

    /// Get current maximum document size.
    pub fn max_document_size(&self) -> usize {
        self.processor.max_document_size()
    }

    /// `$/setTrace` notification.
    pub async fn set_trace(&self, params: SetTraceParams) {
        debug!("Trace level set to {:?}", params.value);
        *self.trace.write() = params.value;
    }

    /// Analyze `text` and publish the result.
    ///
    /// # Error Handling
    ///
    /// - Not initialized: the notification is dropped with a warning
    /// - Oversized document: an error message is shown, analysis skipped
    /// - Stale version: nothing is published
    /// - Fatal front end failure: logged, shown, then the fatal handler runs
    async fn analyze(&self, uri: Url, text: String, version: Option<i32>) {
        if !self.lifecycle.is_initialized() {
            warn!(
                "Ignoring document {} while server is {}",
                uri,
                self.lifecycle.state()
            );
            return;
        }

        let _order = self.pass_order.lock().await;

        let processor = Arc::clone(&self.processor);
        let task_uri = uri.clone();
        let result =
            tokio::task::spawn_blocking(move || processor.process(&task_uri, &text, version))
                .await;

        match result {
            Ok(Ok(AnalysisOutcome::Published {
                diagnostics,
                version,
            })) => {
                debug!("Publishing {} diagnostics for {}", diagnostics.len(), uri);
                self.client
                    .publish_diagnostics(uri, diagnostics, version)
                    .await;
            }
            Ok(Ok(AnalysisOutcome::Stale)) => {
                debug!("Analysis of {} superseded, nothing published", uri);
            }
            Ok(Err(AnalysisError::DocumentTooLarge { size, limit })) => {
                error!(
                    "Document size limit exceeded: {} has {} bytes > {} bytes maximum",
                    uri, size, limit
                );
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!(
                            "Document too large: {} bytes exceeds maximum of {} bytes ({} MB)",
                            size,
                            limit,
                            limit / BYTES_PER_MEGABYTE
                        ),
                    )
                    .await;
            }
            Ok(Err(err)) => self.fatal(&uri, err).await,
            Err(join_error) => {
                error!("Analysis task for {} did not complete: {}", uri, join_error);
            }
        }
    }

    async fn fatal(&self, uri: &Url, err: AnalysisError) {
        error!("Unrecoverable failure while analyzing {}: {}", uri, err);
        self.client
            .show_message(
                MessageType::ERROR,
                format!("Charon language server stopped: {}", err),
            )
            .await;
        self.lifecycle.terminate();
        (self.on_fatal)(&err);
    }
}

fn exit_process(_err: &AnalysisError) {
    std::process::exit(FATAL_EXIT_CODE)
}

#[tower_lsp::async_trait]
impl<F: FrontEnd + 'static> LanguageServer for CharonLanguageServer<F> {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Charon Language Server initializing");

        if let Err(err) = self.lifecycle.initialize() {
            warn!("{}", err);
        }

        let config = match ServerConfig::from_initialization_options(
            params.initialization_options.as_ref(),
        ) {
            Ok(config) => config,
            Err(err) => {
                warn!("{}; using defaults", err);
                ServerConfig::default()
            }
        };

        let offered = params
            .capabilities
            .general
            .as_ref()
            .and_then(|general| general.position_encodings.as_deref());
        debug!(
            "Client position encodings: {:?}",
            offered.map(|kinds| kinds.iter().map(|kind| kind.as_str()).collect::<Vec<_>>())
        );

        let encoding = config.position_encoding.negotiate(offered);
        if encoding != config.position_encoding {
            warn!(
                "Client does not support {} positions, falling back to {}",
                config.position_encoding, encoding
            );
        }
        self.processor.apply_config(&ServerConfig {
            position_encoding: encoding,
            ..config
        });

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                position_encoding: Some(encoding.to_lsp_kind()),
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        ..Default::default()
                    },
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(crate::VERSION.to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("Charon Language Server initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Charon Language Server shutting down");
        if let Err(err) = self.lifecycle.begin_shutdown() {
            warn!("{}", err);
        }

        *self.trace.write() = TraceValue::Off;

        let _order = self.pass_order.lock().await;
        let released = self.processor.shutdown();
        debug!("Released {} cached documents", released);
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        info!(
            "Document opened: {} ({} bytes, version {})",
            document.uri,
            document.text.len(),
            document.version
        );
        self.analyze(document.uri, document.text, Some(document.version))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("Document change event received for: {}", uri);

        let mut full_text = None;
        for change in params.content_changes {
            if change.range.is_some() {
                warn!("Ignoring ranged change for {}; only full sync is supported", uri);
                continue;
            }
            full_text = Some(change.text);
        }

        match full_text {
            Some(text) => {
                self.analyze(uri, text, Some(params.text_document.version))
                    .await
            }
            None => warn!("Document change event for {} had no whole-document content", uri),
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("Document closed: {}", uri);

        if !self.lifecycle.is_initialized() {
            warn!("Ignoring close of {} while server is {}", uri, self.lifecycle.state());
            return;
        }

        let _order = self.pass_order.lock().await;
        self.processor.close(&uri);
        // Clear diagnostics
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        match self.processor.snapshot(uri) {
            Some(snapshot) => debug!(
                "Hover for {} at {}:{} (version {:?}, {} diagnostics)",
                uri,
                position.line,
                position.character,
                snapshot.version,
                snapshot.diagnostic_count
            ),
            None => debug!("Hover for unknown document {}", uri),
        }

        Ok(None)
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        debug!("Code action request for {}", params.text_document.uri);
        Ok(None)
    }
}
