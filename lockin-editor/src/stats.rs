// SPDX-License-Identifier: AGPL-3.0-or-later
//! Character, word and line counts

/// Counts derived from the editor buffer.
///
/// `lines` counts `\n`-separated pieces: an empty buffer has one line and a
/// trailing newline adds an empty last line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    /// UTF-16 code units, so an emoji outside the BMP counts twice
    pub chars: usize,
    pub words: usize,
    pub lines: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.encode_utf16().count(),
            words: text.split_whitespace().count(),
            lines: text.split('\n').count(),
        }
    }
}
