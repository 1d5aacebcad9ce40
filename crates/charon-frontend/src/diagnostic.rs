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

//! Diagnostic records produced by the front end.

use crate::handle::DiagnosticHandle;

/// Byte span of a diagnostic within the source of its analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    /// Byte offset from the start of the source text.
    pub offset: usize,
    /// Length of the span in bytes.
    pub length: usize,
}

impl SourceLocation {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset. Saturates instead of overflowing.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// One diagnostic reported during an analysis pass.
///
/// The front end does not classify severities, so an item carries only its
/// location and a handle used to render the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticItem {
    pub handle: DiagnosticHandle,
    pub location: SourceLocation,
}

impl DiagnosticItem {
    pub fn new(handle: DiagnosticHandle, location: SourceLocation) -> Self {
        Self { handle, location }
    }
}
