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

//! Front end backed by the linked `libcharon` C library.
//!
//! Every raw pointer returned by the library is converted into a typed
//! handle at this boundary; a null pointer from an allocating call is
//! reported as [`FrontEndError::AllocationFailed`] instead of being
//! dereferenced later.
//!
//! The library's global context is thread-local. A pass therefore has to
//! start and finish on one OS thread, which the language server guarantees
//! by running each pass inside a single blocking task.

use crate::diagnostic::{DiagnosticItem, SourceLocation};
use crate::error::FrontEndError;
use crate::handle::{ArenaHandle, AstHandle, DiagnosticHandle, SourceHandle, TokenizerHandle};
use crate::FrontEnd;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::num::NonZeroUsize;
use tracing::warn;

/// Diagnostic record as exposed by the context accessors.
#[repr(C)]
struct RawDiagnostic {
    diagnostic: *const c_void,
    offset: usize,
    length: usize,
}

extern "C" {
    fn memory_allocator_make() -> *mut c_void;
    fn memory_allocator_free(allocator: *mut c_void);
    fn memory_active_allocator_set(allocator: *mut c_void);

    fn source_make(name: *const c_char, data: *const c_char, data_length: usize) -> *mut c_void;
    fn source_free(source: *mut c_void);

    fn tokenizer_make(source: *mut c_void) -> *mut c_void;
    fn parser_root(tokenizer: *mut c_void) -> *mut c_void;

    fn context_global_initialize();
    fn context_global_finish();
    fn context_diagnostic_count() -> usize;
    fn context_diagnostic_get(index: usize, out: *mut RawDiagnostic) -> bool;

    fn charon_diag_tostring(diagnostic: *const c_void) -> *mut c_char;

    fn free(ptr: *mut c_void);
}

/// Buffers a source borrows from; kept alive until the source is freed.
struct SourceBuffers {
    _name: CString,
    _text: CString,
}

/// The linked Charon front end.
///
/// Only one value should exist per process since the library state it
/// drives is global.
#[derive(Default)]
pub struct NativeFrontEnd {
    sources: HashMap<NonZeroUsize, SourceBuffers>,
}

impl NativeFrontEnd {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_handle(ptr: *mut c_void, what: &'static str) -> Result<NonZeroUsize, FrontEndError> {
    NonZeroUsize::new(ptr as usize).ok_or(FrontEndError::AllocationFailed { what })
}

fn to_ptr(raw: NonZeroUsize) -> *mut c_void {
    raw.get() as *mut c_void
}

impl FrontEnd for NativeFrontEnd {
    fn begin_analysis_context(&mut self) {
        // SAFETY: no arguments; the library tolerates re-initialization
        // after a finish.
        unsafe { context_global_initialize() }
    }

    fn end_analysis_context(&mut self) {
        // SAFETY: paired with `begin_analysis_context` by `AnalysisPass`.
        unsafe { context_global_finish() }
    }

    fn create_arena(&mut self) -> Result<ArenaHandle, FrontEndError> {
        // SAFETY: allocation call without preconditions.
        let ptr = unsafe { memory_allocator_make() };
        to_handle(ptr, "arena").map(ArenaHandle::from_raw)
    }

    fn free_arena(&mut self, arena: ArenaHandle) {
        // SAFETY: `ArenaHandle` is move-only so the address is freed once.
        unsafe { memory_allocator_free(to_ptr(arena.as_raw())) }
    }

    fn set_active_arena(&mut self, arena: &ArenaHandle) {
        // SAFETY: the handle refers to a live arena while it is borrowed.
        unsafe { memory_active_allocator_set(to_ptr(arena.as_raw())) }
    }

    fn make_source(&mut self, name: &str, text: &str) -> Result<SourceHandle, FrontEndError> {
        let name = CString::new(name).map_err(|_| FrontEndError::InvalidInput {
            reason: "document name contains a NUL byte".to_string(),
        })?;
        let text = CString::new(text).map_err(|e| FrontEndError::InvalidInput {
            reason: format!("document text contains a NUL byte at offset {}", e.nul_position()),
        })?;

        // SAFETY: both buffers are NUL terminated and outlive the source,
        // since they are stored until `free_source`.
        let ptr = unsafe { source_make(name.as_ptr(), text.as_ptr(), text.as_bytes().len()) };
        let raw = to_handle(ptr, "source")?;
        self.sources.insert(
            raw,
            SourceBuffers {
                _name: name,
                _text: text,
            },
        );
        Ok(SourceHandle::from_raw(raw))
    }

    fn free_source(&mut self, source: SourceHandle) {
        let raw = source.as_raw();
        // SAFETY: `SourceHandle` is move-only so the address is freed once.
        unsafe { source_free(to_ptr(raw)) }
        if self.sources.remove(&raw).is_none() {
            warn!("Freed {:?} without tracked buffers", source);
        }
    }

    fn init_tokenizer(&mut self, source: &SourceHandle) -> Result<TokenizerHandle, FrontEndError> {
        // SAFETY: the source is live and an arena is active; the session
        // checks the latter before calling.
        let ptr = unsafe { tokenizer_make(to_ptr(source.as_raw())) };
        to_handle(ptr, "tokenizer").map(TokenizerHandle::from_raw)
    }

    fn parse_root(&mut self, tokenizer: TokenizerHandle) -> Result<AstHandle, FrontEndError> {
        // SAFETY: the tokenizer was created in the currently active arena
        // and is non-null.
        let ptr = unsafe { parser_root(to_ptr(tokenizer.as_raw())) };
        to_handle(ptr, "ast").map(AstHandle::from_raw)
    }

    fn collect_diagnostics(&mut self) -> Vec<DiagnosticItem> {
        // SAFETY: only called between begin and end of the analysis context.
        let count = unsafe { context_diagnostic_count() };
        let mut items = Vec::with_capacity(count);

        for index in 0..count {
            let mut raw = RawDiagnostic {
                diagnostic: std::ptr::null(),
                offset: 0,
                length: 0,
            };
            // SAFETY: `raw` is a valid out-pointer for the duration of the call.
            let found = unsafe { context_diagnostic_get(index, &mut raw) };
            let Some(handle) = NonZeroUsize::new(raw.diagnostic as usize).filter(|_| found) else {
                warn!("Diagnostic #{} could not be read", index);
                continue;
            };
            items.push(DiagnosticItem::new(
                DiagnosticHandle::from_raw(handle),
                SourceLocation::new(raw.offset, raw.length),
            ));
        }

        items
    }

    fn format_diagnostic_message(&mut self, item: &DiagnosticItem) -> String {
        // SAFETY: the diagnostic belongs to the open analysis context.
        let ptr = unsafe { charon_diag_tostring(to_ptr(item.handle.as_raw())) };
        if ptr.is_null() {
            return String::new();
        }

        // SAFETY: the library returns a NUL terminated heap string which the
        // caller owns and must release with `free`.
        let message = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        unsafe { free(ptr.cast()) };
        message
    }
}
