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

//! Server configuration read from the client's `initializationOptions`.
//!
//! ```json
//! {
//!   "maxDocumentSize": 16777216,
//!   "positionEncoding": "utf-8"
//! }
//! ```
//!
//! Every field is optional; missing fields keep their defaults.

use crate::constants::DEFAULT_MAX_DOCUMENT_SIZE;
use crate::error::ConfigError;
use crate::position::PositionEncoding;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Documents larger than this many bytes are not analyzed.
    pub max_document_size: usize,
    /// Unit of the `character` field in published ranges.
    pub position_encoding: PositionEncoding,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            position_encoding: PositionEncoding::default(),
        }
    }
}

impl ServerConfig {
    /// Parse initialization options. `None` and `null` yield the defaults.
    pub fn from_initialization_options(
        options: Option<&serde_json::Value>,
    ) -> Result<Self, ConfigError> {
        match options {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => Ok(Self::deserialize(value)?),
        }
    }
}
