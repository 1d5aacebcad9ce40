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

//! LSP constants and default values.
//!
//! # Organization
//!
//! - **Memory Limits**: Document size constraints
//! - **LSP Protocol**: Identifiers the server reports to the client
//! - **Process**: Exit codes

// ============================================================================
// Memory Limits
// ============================================================================

/// Bytes per megabyte (1024 * 1024).
pub const BYTES_PER_MEGABYTE: usize = 1024 * 1024;

/// Default maximum document size in bytes (64 MB).
///
/// **Rationale**: Every pass copies the full text into a front-end source and
/// parses it into a fresh arena, so the whole document is held at least twice
/// while a pass runs. 64 MB is far beyond any hand-written Charon module and
/// keeps a runaway file from exhausting memory.
///
/// Overridable through the `maxDocumentSize` initialization option.
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 64 * BYTES_PER_MEGABYTE;

// ============================================================================
// LSP Protocol Constants
// ============================================================================

/// Name reported in `InitializeResult::server_info`.
pub const SERVER_NAME: &str = "charon-lsp";

/// Value of the `source` field on every published diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "charon";

/// Method name of the trace-level notification.
pub const SET_TRACE_METHOD: &str = "$/setTrace";

/// Zero-based position start index.
pub const POSITION_ZERO: u32 = 0;

// ============================================================================
// Process
// ============================================================================

/// Exit code used when the front end reports an unrecoverable failure.
pub const FATAL_EXIT_CODE: i32 = 70;

/// Log filter applied when `RUST_LOG` does not override it.
pub const DEFAULT_LOG_DIRECTIVES: [&str; 2] = ["charon_lsp=info", "tower_lsp=info"];
