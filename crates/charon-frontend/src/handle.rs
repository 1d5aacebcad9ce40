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

//! Opaque handles to front-end objects.
//!
//! Handles wrap the non-zero address (or identifier) of an object owned by
//! the front end. [`ArenaHandle`] and [`SourceHandle`] are move-only: whoever
//! holds one is responsible for releasing it exactly once. Tokenizer, AST and
//! diagnostic handles are plain borrowed references into an arena and may be
//! copied freely, but they are only meaningful while that arena is alive.

use std::fmt;
use std::num::NonZeroUsize;

/// Owned handle to an arena.
#[derive(PartialEq, Eq, Hash)]
pub struct ArenaHandle(NonZeroUsize);

impl ArenaHandle {
    /// Wrap a raw arena address. Only front-end implementations should call this.
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        Self(raw)
    }

    /// Raw arena address.
    pub fn as_raw(&self) -> NonZeroUsize {
        self.0
    }
}

impl fmt::Debug for ArenaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArenaHandle({:#x})", self.0)
    }
}

/// Owned handle to a source object.
#[derive(PartialEq, Eq, Hash)]
pub struct SourceHandle(NonZeroUsize);

impl SourceHandle {
    /// Wrap a raw source address. Only front-end implementations should call this.
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        Self(raw)
    }

    /// Raw source address.
    pub fn as_raw(&self) -> NonZeroUsize {
        self.0
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceHandle({:#x})", self.0)
    }
}

/// Tokenizer state allocated in the active arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenizerHandle(NonZeroUsize);

impl TokenizerHandle {
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> NonZeroUsize {
        self.0
    }
}

impl fmt::Debug for TokenizerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenizerHandle({:#x})", self.0)
    }
}

/// Root node of a parse tree. Valid while its arena is alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstHandle(NonZeroUsize);

impl AstHandle {
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> NonZeroUsize {
        self.0
    }
}

impl fmt::Debug for AstHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AstHandle({:#x})", self.0)
    }
}

/// A diagnostic record in the front end's global diagnostic list.
/// Valid until the analysis context ends.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagnosticHandle(NonZeroUsize);

impl DiagnosticHandle {
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> NonZeroUsize {
        self.0
    }
}

impl fmt::Debug for DiagnosticHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DiagnosticHandle({:#x})", self.0)
    }
}
