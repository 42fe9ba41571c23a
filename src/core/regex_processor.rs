//! Regex pre-tokenization in front of a [`TiktokenProcessor`].
//!
//! The pattern cuts the input into coarse pieces (words, numbers, punctuation
//! runs) and each piece is encoded on its own, so merges never cross a piece
//! boundary. Decoding is untouched.
//!
//! Patterns work on Unicode scalars. Input that is not valid UTF-8 is matched
//! as if each invalid byte were U+FFFD, and the pieces are cut from the
//! original bytes, so invalid bytes are encoded like any other.

use std::ops::Range;
use std::path::Path;

use regex::Regex;
use rustc_hash::FxHashMap;

use super::error::{ConfigError, DecodeError, TokenizerError};
use super::processor::{BpeProcessor, TiktokenProcessor};
use super::utf8::scalar_view;
use super::Rank;

/// Letters with English contraction suffixes, numbers, and punctuation runs,
/// each optionally preceded by one space.
pub const WORD_PATTERN: &str = r" ?\p{L}+(?:'(?:s|m|d|ll|re|ve|t|nt))?| ?\p{N}+| ?[^\s\p{L}\p{N}]+";

/// cl100k_base (GPT-4, GPT-3.5-turbo) split pattern without its `\s+(?!\S)`
/// alternative, since look-around is not available here. Trailing whitespace
/// before a word therefore stays in one whitespace piece instead of leaving its
/// last space for the word.
pub const CL100K_COMPAT_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+";

/// A [`TiktokenProcessor`] that encodes each pattern match separately.
///
/// Input not covered by any match is dropped. If the pattern does not match
/// anywhere in the input, the whole input goes to the inner processor instead.
///
/// The pattern only ever sees valid UTF-8 scalars; an invalid input byte shows
/// up as U+FFFD. A pattern that could match invalid UTF-8 itself, such as one
/// using `(?-u:\xFF)`, is rejected at construction.
#[derive(Debug, Clone)]
pub struct RegexTiktokenProcessor {
    inner: TiktokenProcessor,
    regex: Regex,
}

impl RegexTiktokenProcessor {
    /// Wrap `inner` with a pre-tokenization pattern.
    pub fn new(inner: TiktokenProcessor, pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(ConfigError::Pattern)?;
        log::debug!("pre-tokenization pattern compiled: {}", pattern);
        Ok(Self { inner, regex })
    }

    /// Create a pre-tokenizing processor from a tiktoken vocabulary file.
    pub fn from_file(
        path: impl AsRef<Path>,
        replacement: &[u8],
        keep_unknown_bytes: bool,
        special_tokens: FxHashMap<Vec<u8>, Rank>,
        allowed_special: &[Vec<u8>],
        pattern: &str,
    ) -> Result<Self, TokenizerError> {
        let inner = TiktokenProcessor::from_file(
            path,
            replacement,
            keep_unknown_bytes,
            special_tokens,
            allowed_special,
        )?;
        Ok(Self::new(inner, pattern)?)
    }

    /// The processor every piece is delegated to.
    pub fn inner(&self) -> &TiktokenProcessor {
        &self.inner
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Byte ranges of `text` matched by the pattern, in order.
    fn pieces(&self, text: &[u8]) -> Vec<Range<usize>> {
        if let Ok(text) = std::str::from_utf8(text) {
            return self.regex.find_iter(text).map(|m| m.range()).collect();
        }

        let (view, offsets) = scalar_view(text);
        self.regex
            .find_iter(&view)
            .map(|m| offsets[m.start()]..offsets[m.end()])
            .collect()
    }
}

impl BpeProcessor for RegexTiktokenProcessor {
    fn encode(&self, text: &[u8]) -> Vec<Rank> {
        let pieces = self.pieces(text);
        if pieces.is_empty() {
            return self.inner.encode(text);
        }

        pieces
            .into_iter()
            .flat_map(|piece| self.inner.encode(&text[piece]))
            .collect()
    }

    fn decode(&self, ranks: &[Rank]) -> Result<Vec<u8>, DecodeError> {
        self.inner.decode(ranks)
    }
}
