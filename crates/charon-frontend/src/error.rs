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

//! Error types for the front-end adapter.

use thiserror::Error;

/// Failures surfaced by the front-end adapter.
///
/// Malformed source code is never an error: it produces a (possibly partial)
/// AST plus diagnostics. These variants cover the cases where the adapter
/// itself cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontEndError {
    /// The front end could not allocate an object. Unrecoverable.
    #[error("front end failed to allocate {what}")]
    AllocationFailed {
        /// What was being allocated (arena, source, ...).
        what: &'static str,
    },

    /// The input cannot be handed to the front end.
    #[error("invalid front end input: {reason}")]
    InvalidInput {
        /// Human-readable explanation.
        reason: String,
    },

    /// An allocating call was attempted with no arena active.
    #[error("no active arena for allocating front end call")]
    NoActiveArena,

    /// A source id that does not belong to the current pass.
    #[error("source #{0} does not belong to this analysis pass")]
    UnknownSource(usize),
}

impl FrontEndError {
    /// Whether the error must terminate the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidInput { .. })
    }
}
