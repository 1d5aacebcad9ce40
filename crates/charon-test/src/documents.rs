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

//! Sample Charon documents with known diagnostics under the default rule.

/// Parses without diagnostics.
pub const CLEAN: &str = "module main;\n\nfn main() -> int {\n    return 0;\n}\n";

/// One unexpected symbol on line 1 (zero-based), column 12.
pub const ONE_ERROR: &str = "fn main() {\n    let x = ?;\n}\n";

/// Two unexpected symbols on separate lines.
pub const TWO_ERRORS: &str = "let a = ?;\nlet b = 1;\nlet c = ?;\n";

/// A string literal left open until the end of the text.
pub const UNTERMINATED_STRING: &str = "let greeting = \"hello\nlet after = 1;\n";

/// Unexpected symbol after a two-byte UTF-8 character.
pub const MULTIBYTE: &str = "let café = ?;\n";

/// Unexpected symbol after a character outside the basic multilingual plane.
pub const ASTRAL: &str = "// 🦀\nlet x = ?;\n";

/// Error on the final line, which has no trailing newline.
pub const NO_TRAILING_NEWLINE: &str = "let a = 1;\nlet b = ?";

/// Canonical URI for a named sample document.
pub fn uri_for(name: &str) -> String {
    format!("file:///workspace/{}.charon", name)
}

/// Every sample as (name, text).
pub fn all() -> Vec<(&'static str, &'static str)> {
    vec![
        ("clean", CLEAN),
        ("one_error", ONE_ERROR),
        ("two_errors", TWO_ERRORS),
        ("unterminated_string", UNTERMINATED_STRING),
        ("multibyte", MULTIBYTE),
        ("astral", ASTRAL),
        ("no_trailing_newline", NO_TRAILING_NEWLINE),
    ]
}

/// A clean document of roughly `bytes` bytes.
pub fn large_document(bytes: usize) -> String {
    let line = "let value = 1;\n";
    line.repeat(bytes / line.len() + 1)
}
