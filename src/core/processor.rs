use std::path::Path;

use rustc_hash::FxHashMap;

use super::bpe::byte_pair_encode;
use super::dictionary::Dictionary;
use super::error::{ConfigError, DecodeError, TokenizerError};
use super::special::SpecialTokenFilter;
use super::streaming::StreamingDecoder;
use super::utf8::replace_invalid_utf8;
use super::Rank;

/// Text to ranks and back.
///
/// Implemented by the plain [`TiktokenProcessor`] and by the pre-tokenizing
/// [`RegexTiktokenProcessor`](super::RegexTiktokenProcessor), so callers do not
/// need to know which one they hold.
pub trait BpeProcessor {
    /// Encode text into ranks.
    ///
    /// Never fails: unknown bytes fall back to rank 0 and disallowed special
    /// tokens are dropped.
    fn encode(&self, text: &[u8]) -> Vec<Rank>;

    /// Decode ranks into bytes.
    ///
    /// Fails on the first rank that is not in the dictionary without producing
    /// any output. When a replacement sequence is configured, invalid UTF-8
    /// runs in the result are replaced by it.
    fn decode(&self, ranks: &[Rank]) -> Result<Vec<u8>, DecodeError>;

    /// Decode ranks and require the result to be valid UTF-8.
    fn decode_string(&self, ranks: &[Rank]) -> Result<String, DecodeError> {
        String::from_utf8(self.decode(ranks)?).map_err(|_| DecodeError::Utf8)
    }
}

/// Byte-pair encoder over a tiktoken dictionary.
///
/// Everything is fixed at construction; encoding and decoding only read, so a
/// processor can be shared freely between threads.
///
/// # Example
///
/// ```ignore
/// let processor = TiktokenProcessor::from_file(
///     "cl100k_base.tiktoken",
///     REPLACEMENT_CHARACTER,
///     false,
///     FxHashMap::default(),
///     &[],
/// )?;
/// let ranks = processor.encode(b"Hello world");
/// assert_eq!(processor.decode(&ranks)?, b"Hello world");
/// ```
#[derive(Debug, Clone)]
pub struct TiktokenProcessor {
    dictionary: Dictionary,
    filter: SpecialTokenFilter,
    replacement: Option<Vec<u8>>,
    keep_unknown_bytes: bool,
}

impl TiktokenProcessor {
    /// Create a processor over an already built dictionary.
    ///
    /// # Arguments
    /// * `dictionary` - Vocabulary with its special tokens layered in
    /// * `replacement` - Bytes substituted for invalid UTF-8 runs on decode;
    ///   empty means decode returns raw bytes
    /// * `keep_unknown_bytes` - Reserved, currently has no effect
    pub fn new(
        dictionary: Dictionary,
        replacement: &[u8],
        keep_unknown_bytes: bool,
    ) -> Result<Self, ConfigError> {
        let filter = SpecialTokenFilter::new(&dictionary)?;
        let replacement = (!replacement.is_empty()).then(|| replacement.to_vec());

        Ok(Self {
            dictionary,
            filter,
            replacement,
            keep_unknown_bytes,
        })
    }

    /// Create a processor from a tiktoken vocabulary file.
    pub fn from_file(
        path: impl AsRef<Path>,
        replacement: &[u8],
        keep_unknown_bytes: bool,
        special_tokens: FxHashMap<Vec<u8>, Rank>,
        allowed_special: &[Vec<u8>],
    ) -> Result<Self, TokenizerError> {
        let dictionary = Dictionary::from_file(path, special_tokens, allowed_special)?;
        Ok(Self::new(dictionary, replacement, keep_unknown_bytes)?)
    }

    /// Create a processor from raw tiktoken vocabulary bytes.
    pub fn from_bytes(
        data: &[u8],
        replacement: &[u8],
        keep_unknown_bytes: bool,
        special_tokens: FxHashMap<Vec<u8>, Rank>,
        allowed_special: &[Vec<u8>],
    ) -> Result<Self, TokenizerError> {
        let dictionary = Dictionary::from_bytes(data, special_tokens, allowed_special)?;
        Ok(Self::new(dictionary, replacement, keep_unknown_bytes)?)
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// The configured replacement for invalid UTF-8, `None` in raw-bytes mode.
    pub fn replacement(&self) -> Option<&[u8]> {
        self.replacement.as_deref()
    }

    pub fn keep_unknown_bytes(&self) -> bool {
        self.keep_unknown_bytes
    }

    /// Create a decoder that turns a rank stream into bytes incrementally.
    pub fn streaming_decoder(&self) -> StreamingDecoder<'_> {
        StreamingDecoder::new(self)
    }

    /// Concatenate the tokens for `ranks` without any repair.
    pub fn decode_raw(&self, ranks: &[Rank]) -> Result<Vec<u8>, DecodeError> {
        let mut buf = Vec::with_capacity(ranks.len() * 4);
        for &rank in ranks {
            let token = self
                .dictionary
                .token(rank)
                .ok_or(DecodeError::InvalidRank(rank))?;
            buf.extend_from_slice(token);
        }
        Ok(buf)
    }

    /// Apply the configured invalid-UTF-8 policy to decoded bytes.
    pub(crate) fn finish_decode(&self, bytes: Vec<u8>) -> Vec<u8> {
        match &self.replacement {
            Some(replacement) => replace_invalid_utf8(&bytes, replacement),
            None => bytes,
        }
    }
}

impl BpeProcessor for TiktokenProcessor {
    fn encode(&self, text: &[u8]) -> Vec<Rank> {
        match text.len() {
            0 => return Vec::new(),
            1 => {
                return vec![self.dictionary.rank(text).unwrap_or_else(|| {
                    log::trace!("single byte {:#04x} not in vocabulary, using 0", text[0]);
                    Rank::default()
                })]
            }
            _ => {}
        }

        let filtered = self.filter.strip(text);
        let parts = self.filter.segment(&filtered);
        byte_pair_encode(&filtered, parts, self.dictionary.encoder())
    }

    fn decode(&self, ranks: &[Rank]) -> Result<Vec<u8>, DecodeError> {
        let bytes = self.decode_raw(ranks)?;
        Ok(self.finish_decode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utf8::REPLACEMENT_CHARACTER;
    use base64::{engine::general_purpose::STANDARD, Engine};

    /// All 256 bytes at rank = byte value plus a handful of merges.
    fn vocab() -> Vec<u8> {
        let mut data = String::new();
        for b in 0u8..=255 {
            data.push_str(&format!("{} {}\n", STANDARD.encode([b]), b));
        }
        for (token, rank) in [
            ("he", 256),
            ("ll", 257),
            ("llo", 258),
            ("hello", 259),
            ("ab", 265),
            ("aa", 266),
        ] {
            data.push_str(&format!("{} {}\n", STANDARD.encode(token), rank));
        }
        data.into_bytes()
    }

    fn make_processor(special: &[(&str, Rank)], allowed: &[&str]) -> TiktokenProcessor {
        let special = special
            .iter()
            .map(|(t, r)| (t.as_bytes().to_vec(), *r))
            .collect();
        let allowed: Vec<Vec<u8>> = allowed.iter().map(|t| t.as_bytes().to_vec()).collect();
        TiktokenProcessor::from_bytes(&vocab(), REPLACEMENT_CHARACTER, false, special, &allowed)
            .unwrap()
    }

    #[test]
    fn test_encode_decode() {
        let processor = make_processor(&[], &[]);
        let text = "hello, aab 世界";
        let ranks = processor.encode(text.as_bytes());
        assert_eq!(&ranks[..1], &[259]);
        assert_eq!(processor.decode_string(&ranks).unwrap(), text);
    }

    #[test]
    fn test_empty_input() {
        let processor = make_processor(&[], &[]);
        assert!(processor.encode(b"").is_empty());
        assert!(processor.decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_byte_bypasses_merge() {
        let processor = make_processor(&[], &[]);
        assert_eq!(processor.encode(b"a"), vec![97]);
    }

    #[test]
    fn test_single_unknown_byte_is_zero() {
        let processor =
            TiktokenProcessor::from_bytes(b"YQ== 42\n", b"", false, FxHashMap::default(), &[])
                .unwrap();
        assert_eq!(processor.encode(b"z"), vec![0]);
    }

    #[test]
    fn test_disallowed_special_is_stripped() {
        let processor = make_processor(&[("<|SYSTEM|>", 1 << 62)], &[]);
        assert!(processor.encode(b"<|SYSTEM|>").is_empty());
        assert_eq!(processor.encode(b"a<|SYSTEM|>b"), vec![265]);
    }

    #[test]
    fn test_allowed_special_is_atomic() {
        let processor = make_processor(
            &[("<|SYSTEM|>", 1 << 62), ("<|USER|>", 2 << 60)],
            &["<|SYSTEM|>", "<|USER|>"],
        );
        assert_eq!(processor.encode(b"<|SYSTEM|>"), vec![1 << 62]);
        assert_eq!(
            processor.encode(b"a<|SYSTEM|>b<|USER|>c<|SYSTEM|>d"),
            vec![97, 1 << 62, 98, 2 << 60, 99, 1 << 62, 100]
        );
    }

    #[test]
    fn test_mixed_allowed_and_disallowed() {
        let processor = make_processor(&[("<|a|>", 1000), ("<|b|>", 1001)], &["<|a|>"]);
        assert_eq!(processor.encode(b"h<|b|>e<|a|>x"), vec![256, 1000, 120]);
    }

    #[test]
    fn test_special_tokens_decode_even_when_disallowed() {
        let processor = make_processor(&[("<|SYSTEM|>", 1 << 62)], &[]);
        let bytes = processor.decode(&[97, 1 << 62, 98]).unwrap();
        assert_eq!(bytes, b"a<|SYSTEM|>b");
    }

    #[test]
    fn test_invalid_rank() {
        let processor = make_processor(&[], &[]);
        assert_eq!(
            processor.decode(&[97, 99_999, 98]),
            Err(DecodeError::InvalidRank(99_999))
        );
    }

    #[test]
    fn test_replacement_on_decode() {
        let processor = make_processor(&[], &[]);
        let bytes = processor.decode(&[0xF0, 0x28, 0x8C, 0x28]).unwrap();
        assert_eq!(bytes, "\u{FFFD}(\u{FFFD}(".as_bytes());
    }

    #[test]
    fn test_raw_bytes_mode() {
        let processor =
            TiktokenProcessor::from_bytes(&vocab(), b"", false, FxHashMap::default(), &[]).unwrap();
        assert_eq!(processor.replacement(), None);
        assert_eq!(processor.decode(&[0xA0, 0xA1]).unwrap(), vec![0xA0, 0xA1]);
        assert_eq!(processor.decode_string(&[0xA0]), Err(DecodeError::Utf8));
    }

    #[test]
    fn test_deterministic() {
        let processor = make_processor(&[], &[]);
        let text = b"hellohello aaab";
        assert_eq!(processor.encode(text), processor.encode(text));
    }

    #[test]
    fn test_processor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TiktokenProcessor>();
    }
}
