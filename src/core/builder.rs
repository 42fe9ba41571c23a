//! Processor configuration and construction.
//!
//! [`ProcessorBuilder`] gathers everything a processor is built from and picks
//! the variant: with a pre-tokenization pattern the result wraps the plain
//! processor in a [`RegexTiktokenProcessor`], without one it is the plain
//! [`TiktokenProcessor`].
//!
//! # Example
//!
//! ```ignore
//! let processor = ProcessorBuilder::from_file("cl100k_base.tiktoken")
//!     .special_token("<|endoftext|>", 100257)
//!     .allow_special("<|endoftext|>")
//!     .pattern(WORD_PATTERN)
//!     .build()?;
//!
//! let ranks = processor.encode(b"Hello world<|endoftext|>");
//! ```

use std::path::PathBuf;

use rustc_hash::FxHashMap;

use super::dictionary::Dictionary;
use super::error::{DecodeError, TokenizerError};
use super::processor::{BpeProcessor, TiktokenProcessor};
use super::regex_processor::RegexTiktokenProcessor;
use super::streaming::StreamingDecoder;
use super::utf8::REPLACEMENT_CHARACTER;
use super::Rank;

/// Where the tiktoken vocabulary comes from.
#[derive(Debug, Clone)]
pub enum VocabSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Plain configuration data behind a [`ProcessorBuilder`].
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Substituted for each invalid UTF-8 run on decode; empty for raw bytes.
    pub replacement: Vec<u8>,
    /// Reserved, currently has no effect.
    pub keep_unknown_bytes: bool,
    pub special_tokens: FxHashMap<Vec<u8>, Rank>,
    /// Must be a subset of the keys of `special_tokens`.
    pub allowed_special: Vec<Vec<u8>>,
    /// Pre-tokenization pattern; selects [`RegexTiktokenProcessor`] when set.
    pub pattern: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            replacement: REPLACEMENT_CHARACTER.to_vec(),
            keep_unknown_bytes: false,
            special_tokens: FxHashMap::default(),
            allowed_special: Vec::new(),
            pattern: None,
        }
    }
}

/// Builder for creating a processor.
#[derive(Debug, Clone)]
pub struct ProcessorBuilder {
    source: VocabSource,
    config: ProcessorConfig,
}

impl ProcessorBuilder {
    pub fn new(source: VocabSource) -> Self {
        Self {
            source,
            config: ProcessorConfig::default(),
        }
    }

    /// Read the vocabulary from a tiktoken file at build time.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(VocabSource::File(path.into()))
    }

    /// Use vocabulary bytes already in memory.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::new(VocabSource::Bytes(data.into()))
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bytes substituted for invalid UTF-8 runs on decode.
    pub fn replacement(mut self, replacement: impl Into<Vec<u8>>) -> Self {
        self.config.replacement = replacement.into();
        self
    }

    /// Return decoded bytes as they are, without UTF-8 repair.
    pub fn raw_bytes(mut self) -> Self {
        self.config.replacement.clear();
        self
    }

    pub fn keep_unknown_bytes(mut self, keep: bool) -> Self {
        self.config.keep_unknown_bytes = keep;
        self
    }

    /// Register a special token with its rank.
    pub fn special_token(mut self, token: impl Into<Vec<u8>>, rank: Rank) -> Self {
        self.config.special_tokens.insert(token.into(), rank);
        self
    }

    /// Register several special tokens.
    pub fn special_tokens<T, I>(mut self, tokens: I) -> Self
    where
        T: Into<Vec<u8>>,
        I: IntoIterator<Item = (T, Rank)>,
    {
        self.config
            .special_tokens
            .extend(tokens.into_iter().map(|(t, r)| (t.into(), r)));
        self
    }

    /// Recognise a registered special token while encoding.
    pub fn allow_special(mut self, token: impl Into<Vec<u8>>) -> Self {
        self.config.allowed_special.push(token.into());
        self
    }

    /// Recognise every special token registered so far.
    pub fn allow_all_special(mut self) -> Self {
        let mut all: Vec<Vec<u8>> = self.config.special_tokens.keys().cloned().collect();
        all.sort_unstable();
        self.config.allowed_special = all;
        self
    }

    /// Set the pre-tokenization pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.pattern = Some(pattern.into());
        self
    }

    /// Build the plain processor, ignoring any pattern.
    pub fn build_tiktoken(self) -> Result<TiktokenProcessor, TokenizerError> {
        let ProcessorConfig {
            replacement,
            keep_unknown_bytes,
            special_tokens,
            allowed_special,
            ..
        } = self.config;

        let dictionary = match &self.source {
            VocabSource::File(path) => Dictionary::from_file(path, special_tokens, &allowed_special)?,
            VocabSource::Bytes(data) => Dictionary::from_bytes(data, special_tokens, &allowed_special)?,
        };
        Ok(TiktokenProcessor::new(
            dictionary,
            &replacement,
            keep_unknown_bytes,
        )?)
    }

    /// Build the processor, pre-tokenizing when a pattern is set.
    pub fn build(mut self) -> Result<Processor, TokenizerError> {
        let pattern = self.config.pattern.take();
        let inner = self.build_tiktoken()?;
        match pattern {
            Some(pattern) => Ok(Processor::Regex(RegexTiktokenProcessor::new(
                inner, &pattern,
            )?)),
            None => Ok(Processor::Tiktoken(inner)),
        }
    }
}

/// Either processor variant behind one type.
#[derive(Debug, Clone)]
pub enum Processor {
    Tiktoken(TiktokenProcessor),
    Regex(RegexTiktokenProcessor),
}

impl Processor {
    /// The plain processor that does the byte-pair work.
    pub fn tiktoken(&self) -> &TiktokenProcessor {
        match self {
            Processor::Tiktoken(p) => p,
            Processor::Regex(p) => p.inner(),
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        self.tiktoken().dictionary()
    }

    pub fn pattern(&self) -> Option<&str> {
        match self {
            Processor::Tiktoken(_) => None,
            Processor::Regex(p) => Some(p.pattern()),
        }
    }

    pub fn streaming_decoder(&self) -> StreamingDecoder<'_> {
        self.tiktoken().streaming_decoder()
    }
}

impl BpeProcessor for Processor {
    fn encode(&self, text: &[u8]) -> Vec<Rank> {
        match self {
            Processor::Tiktoken(p) => p.encode(text),
            Processor::Regex(p) => p.encode(text),
        }
    }

    fn decode(&self, ranks: &[Rank]) -> Result<Vec<u8>, DecodeError> {
        self.tiktoken().decode(ranks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ConfigError, LoadError};

    // "a" 0, "b" 1, "c" 2, "ab" 3
    const VOCAB: &[u8] = b"YQ== 0\nYg== 1\nYw== 2\nYWI= 3\n";

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.replacement, "\u{FFFD}".as_bytes());
        assert!(!config.keep_unknown_bytes);
        assert!(config.pattern.is_none());
    }

    #[test]
    fn test_build_without_pattern_is_plain() {
        let processor = ProcessorBuilder::from_bytes(VOCAB).build().unwrap();
        assert!(matches!(processor, Processor::Tiktoken(_)));
        assert_eq!(processor.pattern(), None);
        assert_eq!(processor.encode(b"abc"), vec![3, 2]);
    }

    #[test]
    fn test_build_with_pattern_wraps() {
        let processor = ProcessorBuilder::from_bytes(VOCAB)
            .pattern("a|bc")
            .build()
            .unwrap();
        assert!(matches!(processor, Processor::Regex(_)));
        assert_eq!(processor.pattern(), Some("a|bc"));
        assert_eq!(processor.encode(b"abc"), vec![0, 1, 2]);
    }

    #[test]
    fn test_build_tiktoken_ignores_pattern() {
        let processor = ProcessorBuilder::from_bytes(VOCAB)
            .pattern("a|bc")
            .build_tiktoken()
            .unwrap();
        assert_eq!(processor.encode(b"abc"), vec![3, 2]);
    }

    #[test]
    fn test_special_tokens_and_allow_all() {
        let processor = ProcessorBuilder::from_bytes(VOCAB)
            .special_tokens([("<|x|>", 10), ("<|y|>", 11)])
            .allow_all_special()
            .build()
            .unwrap();
        assert_eq!(processor.encode(b"a<|x|>c<|y|>"), vec![0, 10, 2, 11]);
        assert!(processor.dictionary().is_allowed_special(b"<|y|>"));
    }

    #[test]
    fn test_raw_bytes_and_keep_unknown() {
        let processor = ProcessorBuilder::from_bytes(VOCAB)
            .raw_bytes()
            .keep_unknown_bytes(true)
            .build_tiktoken()
            .unwrap();
        assert_eq!(processor.replacement(), None);
        assert!(processor.keep_unknown_bytes());
    }

    #[test]
    fn test_config_replaces_everything() {
        let config = ProcessorConfig {
            replacement: b"?".to_vec(),
            pattern: Some(r"\w+".to_string()),
            ..Default::default()
        };
        let processor = ProcessorBuilder::from_bytes(VOCAB)
            .config(config)
            .build()
            .unwrap();
        assert_eq!(processor.tiktoken().replacement(), Some(b"?".as_slice()));
        assert_eq!(processor.pattern(), Some(r"\w+"));
    }

    #[test]
    fn test_errors_surface_by_kind() {
        let err = ProcessorBuilder::from_bytes(b"YQ== 0\nYg== 0\n".to_vec())
            .build()
            .unwrap_err();
        assert!(matches!(err, TokenizerError::Load(LoadError::DuplicateRank { .. })));

        let err = ProcessorBuilder::from_bytes(VOCAB)
            .allow_special("<|nope|>")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            TokenizerError::Config(ConfigError::UnknownAllowedToken(_))
        ));

        let err = ProcessorBuilder::from_bytes(VOCAB)
            .pattern("[")
            .build()
            .unwrap_err();
        assert!(matches!(err, TokenizerError::Config(ConfigError::Pattern(_))));

        let err = ProcessorBuilder::from_file("/no/such/vocab.tiktoken")
            .build()
            .unwrap_err();
        assert!(matches!(err, TokenizerError::Load(LoadError::Io { .. })));
    }

    #[test]
    fn test_decode_through_enum() {
        let processor = ProcessorBuilder::from_bytes(VOCAB)
            .pattern(r"\w")
            .build()
            .unwrap();
        assert_eq!(processor.decode(&[3, 2]).unwrap(), b"abc");
        assert_eq!(processor.decode(&[99]), Err(DecodeError::InvalidRank(99)));
    }
}
