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

//! Error types for the language server.

use crate::lifecycle::SessionState;
use charon_frontend::FrontEndError;
use thiserror::Error;

/// Failure of one analysis pass.
///
/// Syntax problems in the document are never errors; they become
/// diagnostics. Only the two conditions below stop a pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The document exceeds the configured size limit and was not analyzed.
    #[error("document is {size} bytes, exceeding the limit of {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },

    /// The front end failed in a way that leaves its state unusable.
    #[error("fatal front end failure: {0}")]
    Fatal(#[from] FrontEndError),
}

impl AnalysisError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// A protocol message arrived in a state that does not accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition from {from} to {to}")]
pub struct LifecycleError {
    pub from: SessionState,
    pub to: SessionState,
}

/// The client's `initializationOptions` could not be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid initialization options: {0}")]
    Json(#[from] serde_json::Error),
}
