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

//! Translation between front-end byte spans and LSP positions.
//!
//! The front end reports locations as a byte offset and byte length into
//! the analyzed text. Editors want zero-based (line, character) pairs where
//! the character unit is negotiated: LSP mandates UTF-16 code units, some
//! clients accept bytes or code points.
//!
//! Two implementations are provided and always agree:
//!
//! - [`locate`]: a single forward scan, suitable for one-off conversions.
//! - [`LineIndex`]: a line start table built once per text, then a binary
//!   search per lookup. The document processor uses this one.
//!
//! Every conversion clamps: offsets past the end of the text land at the
//! end, and offsets inside a multi-byte character are rounded down to the
//! start of that character.

use crate::utils::{floor_char_boundary, to_lsp_u32};
use charon_frontend::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tower_lsp::lsp_types::{Position, PositionEncodingKind, Range};

/// Unit used to count the `character` component of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PositionEncoding {
    /// Bytes of UTF-8.
    #[serde(rename = "utf-8")]
    Utf8,
    /// UTF-16 code units. The LSP default.
    #[default]
    #[serde(rename = "utf-16")]
    Utf16,
    /// Unicode scalar values.
    #[serde(rename = "utf-32")]
    Utf32,
}

impl PositionEncoding {
    /// Protocol label (`"utf-8"`, `"utf-16"`, `"utf-32"`).
    pub fn as_str(self) -> &'static str {
        match self {
            PositionEncoding::Utf8 => "utf-8",
            PositionEncoding::Utf16 => "utf-16",
            PositionEncoding::Utf32 => "utf-32",
        }
    }

    /// Width of one character in this unit.
    #[inline]
    pub fn char_width(self, ch: char) -> usize {
        match self {
            PositionEncoding::Utf8 => ch.len_utf8(),
            PositionEncoding::Utf16 => ch.len_utf16(),
            PositionEncoding::Utf32 => 1,
        }
    }

    /// Width of a whole string in this unit.
    pub fn str_width(self, s: &str) -> usize {
        match self {
            PositionEncoding::Utf8 => s.len(),
            PositionEncoding::Utf16 => s.encode_utf16().count(),
            PositionEncoding::Utf32 => s.chars().count(),
        }
    }

    pub fn to_lsp_kind(self) -> PositionEncodingKind {
        match self {
            PositionEncoding::Utf8 => PositionEncodingKind::UTF8,
            PositionEncoding::Utf16 => PositionEncodingKind::UTF16,
            PositionEncoding::Utf32 => PositionEncodingKind::UTF32,
        }
    }

    /// Settle on the encoding to use with a client.
    ///
    /// UTF-16 is always available. Any other preference is honoured only
    /// when the client lists it among its supported encodings.
    pub fn negotiate(self, offered: Option<&[PositionEncodingKind]>) -> PositionEncoding {
        if self == PositionEncoding::Utf16 {
            return self;
        }
        let supported = offered
            .unwrap_or_default()
            .iter()
            .any(|kind| kind.as_str() == self.as_str());
        if supported {
            self
        } else {
            PositionEncoding::Utf16
        }
    }
}

impl fmt::Display for PositionEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utf-8" => Ok(PositionEncoding::Utf8),
            "utf-16" => Ok(PositionEncoding::Utf16),
            "utf-32" => Ok(PositionEncoding::Utf32),
            other => Err(format!("unknown position encoding: {}", other)),
        }
    }
}

/// Clamp a span to the text, rounding both ends down to character boundaries.
fn clamp_span(location: SourceLocation, text: &str) -> (usize, usize) {
    let start = floor_char_boundary(text, location.offset);
    let end = floor_char_boundary(text, location.end()).max(start);
    (start, end)
}

/// Convert a byte span into an LSP range with one forward scan over `text`.
///
/// A line feed ends a line; every other character, including `\r`, counts
/// toward the column. A zero-length span yields an empty range.
///
/// # Example
///
/// ```
/// use charon_frontend::SourceLocation;
/// use charon_lsp::position::{locate, PositionEncoding};
///
/// let range = locate(SourceLocation::new(4, 3), "abc\ndef", PositionEncoding::Utf16);
/// assert_eq!((range.start.line, range.start.character), (1, 0));
/// assert_eq!((range.end.line, range.end.character), (1, 3));
/// ```
pub fn locate(location: SourceLocation, text: &str, encoding: PositionEncoding) -> Range {
    let (start_offset, end_offset) = clamp_span(location, text);

    let mut line = 0usize;
    let mut column = 0usize;
    let mut start = None;
    let mut end = None;

    for (offset, ch) in text.char_indices() {
        if offset == start_offset {
            start = Some(Position::new(to_lsp_u32(line), to_lsp_u32(column)));
        }
        if offset == end_offset {
            end = Some(Position::new(to_lsp_u32(line), to_lsp_u32(column)));
            break;
        }

        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += encoding.char_width(ch);
        }
    }

    // Offsets at end-of-text are never visited by the loop
    let eof = Position::new(to_lsp_u32(line), to_lsp_u32(column));
    Range::new(start.unwrap_or(eof), end.unwrap_or(eof))
}

/// Line start table over one text.
///
/// Building the index is linear in the text length; each lookup is a binary
/// search over the line starts plus a scan of the prefix of one line.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    /// Byte offset of the first character of every line. Always starts with 0.
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, byte)| byte == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self { text, line_starts }
    }

    /// Number of lines. A trailing newline starts a final empty line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Position of a byte offset, clamped to the text.
    pub fn position(&self, offset: usize, encoding: PositionEncoding) -> Position {
        let offset = floor_char_boundary(self.text, offset);
        self.position_at_boundary(offset, encoding)
    }

    /// Range of a byte span, clamped to the text. Agrees with [`locate`].
    pub fn range(&self, location: SourceLocation, encoding: PositionEncoding) -> Range {
        let (start, end) = clamp_span(location, self.text);
        Range::new(
            self.position_at_boundary(start, encoding),
            self.position_at_boundary(end, encoding),
        )
    }

    /// Byte offset of a position, clamped to the text.
    ///
    /// A line past the end maps to the end of the text; a character past the
    /// end of its line maps to the line's end (before the line feed). A
    /// character inside a UTF-16 surrogate pair rounds down.
    pub fn offset(&self, position: Position, encoding: PositionEncoding) -> usize {
        let line = position.line as usize;
        let Some(&line_start) = self.line_starts.get(line) else {
            return self.text.len();
        };
        let line_end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);

        let target = position.character as usize;
        let mut units = 0usize;
        for (relative, ch) in self.text[line_start..line_end].char_indices() {
            let width = encoding.char_width(ch);
            if units + width > target {
                return line_start + relative;
            }
            units += width;
        }
        line_end
    }

    fn position_at_boundary(&self, offset: usize, encoding: PositionEncoding) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let column = encoding.str_width(&self.text[line_start..offset]);
        Position::new(to_lsp_u32(line), to_lsp_u32(column))
    }
}
