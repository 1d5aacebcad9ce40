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

//! Server lifecycle state machine.
//!
//! ```text
//! Uninitialized --initialize--> Initialized --shutdown--> ShuttingDown
//!                                    |
//!                                    +--fatal front end failure--> Terminated
//! ```
//!
//! tower-lsp handles `exit` itself, so `Terminated` is only reached when a
//! front end failure stops the server. Document notifications are only acted
//! on while `Initialized`.

use crate::error::LifecycleError;
use parking_lot::Mutex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::ShuttingDown => "shutting down",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Current state plus the allowed transitions.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<SessionState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Uninitialized),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == SessionState::Initialized
    }

    /// `Uninitialized -> Initialized`.
    pub fn initialize(&self) -> Result<(), LifecycleError> {
        self.transition(SessionState::Uninitialized, SessionState::Initialized)
    }

    /// `Initialized -> ShuttingDown`.
    pub fn begin_shutdown(&self) -> Result<(), LifecycleError> {
        self.transition(SessionState::Initialized, SessionState::ShuttingDown)
    }

    /// Any state `-> Terminated`. Returns the state that was left.
    pub fn terminate(&self) -> SessionState {
        std::mem::replace(&mut *self.state.lock(), SessionState::Terminated)
    }

    fn transition(&self, from: SessionState, to: SessionState) -> Result<(), LifecycleError> {
        let mut state = self.state.lock();
        if *state != from {
            return Err(LifecycleError { from: *state, to });
        }
        *state = to;
        Ok(())
    }
}
