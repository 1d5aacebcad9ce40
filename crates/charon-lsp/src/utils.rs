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

//! Utility functions for safe string handling in LSP operations.

/// Clamp a byte offset into `s` and round it down to a character boundary.
///
/// # Security
///
/// Offsets reported by the front end are untrusted. This never panics: an
/// offset past the end becomes `s.len()`, and an offset inside a multi-byte
/// character moves back to that character's first byte.
///
/// # Example
///
/// ```
/// use charon_lsp::utils::floor_char_boundary;
///
/// let s = "café!";
/// assert_eq!(floor_char_boundary(s, 4), 3); // inside 'é'
/// assert_eq!(floor_char_boundary(s, 100), s.len());
/// ```
pub fn floor_char_boundary(s: &str, offset: usize) -> usize {
    if offset >= s.len() {
        return s.len();
    }

    let mut pos = offset;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Slice `s` up to `offset`, clamped and rounded down to a character boundary.
///
/// # Example
///
/// ```
/// use charon_lsp::utils::safe_slice_to;
///
/// assert_eq!(safe_slice_to("Hello 世界", 7), "Hello ");
/// ```
pub fn safe_slice_to(s: &str, offset: usize) -> &str {
    &s[..floor_char_boundary(s, offset)]
}

/// Convert a count to an LSP `u32`, saturating on overflow.
pub fn to_lsp_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
