//! Special-token filtering and segmentation.
//!
//! Special tokens come in two flavours per processor. Disallowed ones are cut
//! out of the input before anything else happens, leaving no trace in the
//! output. Allowed ones are located with a single alternation pattern and kept
//! as atomic segments that carry their registered rank.

use std::borrow::Cow;
use std::ops::Range;

use aho_corasick::{AhoCorasick, MatchKind};
use regex::bytes::Regex;

use super::dictionary::Dictionary;
use super::error::ConfigError;

/// Compiled matchers for one dictionary's special tokens.
#[derive(Debug, Clone)]
pub(crate) struct SpecialTokenFilter {
    disallowed: Option<AhoCorasick>,
    allowed: Option<Regex>,
}

impl SpecialTokenFilter {
    pub(crate) fn new(dictionary: &Dictionary) -> Result<Self, ConfigError> {
        let mut disallowed: Vec<&[u8]> = dictionary.disallowed_special_tokens().collect();
        let disallowed = if disallowed.is_empty() {
            None
        } else {
            disallowed.sort_unstable();
            Some(
                AhoCorasick::builder()
                    .match_kind(MatchKind::LeftmostLongest)
                    .build(&disallowed)?,
            )
        };

        let mut allowed: Vec<&[u8]> = dictionary.allowed_special_tokens().collect();
        let allowed = if allowed.is_empty() {
            None
        } else {
            // Longer tokens first so a token is never shadowed by its own prefix.
            allowed.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            let pattern = alternation(&allowed);
            log::debug!("allowed special-token pattern: {}", pattern);
            Some(Regex::new(&pattern).map_err(ConfigError::SpecialPattern)?)
        };

        Ok(Self {
            disallowed,
            allowed,
        })
    }

    /// Remove every occurrence of a disallowed special token.
    pub(crate) fn strip<'a>(&self, text: &'a [u8]) -> Cow<'a, [u8]> {
        match &self.disallowed {
            Some(ac) if ac.is_match(text) => {
                let empty = vec![b"".as_slice(); ac.patterns_len()];
                Cow::Owned(ac.replace_all_bytes(text, &empty))
            }
            _ => Cow::Borrowed(text),
        }
    }

    /// Split `text` into the leaf segments the merge loop starts from.
    ///
    /// Each allowed special-token match becomes one segment; every other byte
    /// becomes a segment of its own.
    pub(crate) fn segment(&self, text: &[u8]) -> Vec<Range<usize>> {
        let mut segments = Vec::with_capacity(text.len());
        let mut last_end = 0;

        if let Some(re) = &self.allowed {
            for m in re.find_iter(text) {
                segments.extend((last_end..m.start()).map(|i| i..i + 1));
                segments.push(m.range());
                last_end = m.end();
            }
        }
        segments.extend((last_end..text.len()).map(|i| i..i + 1));

        segments
    }
}

/// Build `(tok1|tok2|...)` matching each token literally.
fn alternation(tokens: &[&[u8]]) -> String {
    let mut pattern = String::from("(");
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            pattern.push('|');
        }
        match std::str::from_utf8(token) {
            Ok(text) => pattern.push_str(&regex::escape(text)),
            Err(_) => {
                // Raw bytes need Unicode mode off to match outside UTF-8.
                pattern.push_str("(?-u:");
                pattern.extend(token.iter().map(|b| format!("\\x{:02X}", b)));
                pattern.push(')');
            }
        }
    }
    pattern.push(')');
    pattern
}
