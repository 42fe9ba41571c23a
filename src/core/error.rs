//! Error types for loading vocabularies, configuring processors and decoding.
//!
//! Construction can fail with a [`LoadError`] (the vocabulary resource itself
//! is unreadable or malformed) or a [`ConfigError`] (the caller-supplied
//! special tokens or patterns do not fit the vocabulary). Decoding fails with a
//! [`DecodeError`]. Encoding has no runtime failure mode.

use std::path::PathBuf;

use thiserror::Error;

use super::Rank;

/// Errors raised while reading a tiktoken vocabulary.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid base64 token at line {line} ({entry:?}): {source}")]
    Base64 {
        line: usize,
        entry: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Invalid rank at line {line} ({entry:?})")]
    InvalidRank { line: usize, entry: String },

    #[error("Duplicate token at line {line}: already mapped to rank {existing}, redefined as rank {rank}")]
    DuplicateToken {
        line: usize,
        existing: Rank,
        rank: Rank,
    },

    #[error("Duplicate rank {rank} at line {line}: already assigned to token {existing:?}")]
    DuplicateRank {
        line: usize,
        rank: Rank,
        existing: String,
    },
}

/// Errors raised when special tokens or patterns do not fit the vocabulary.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Special token {token:?} reuses rank {rank}, already assigned to {existing:?}")]
    SpecialRankCollision {
        token: String,
        rank: Rank,
        existing: String,
    },

    #[error("Special token {token:?} is already in the vocabulary with rank {existing}")]
    SpecialTokenCollision { token: String, existing: Rank },

    #[error("Allowed special token {0:?} is not part of the special tokens")]
    UnknownAllowedToken(String),

    #[error("Special tokens must not be empty (rank {0})")]
    EmptySpecialToken(Rank),

    #[error("Could not compile pattern for allowed special tokens: {0}")]
    SpecialPattern(#[source] regex::Error),

    #[error("Could not build matcher for disallowed special tokens: {0}")]
    SpecialMatcher(#[from] aho_corasick::BuildError),

    #[error("Could not compile pre-tokenization pattern: {0}")]
    Pattern(#[source] regex::Error),
}

/// Errors raised while turning ranks back into bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid rank {0}")]
    InvalidRank(Rank),

    #[error("Decoded bytes are not valid UTF-8")]
    Utf8,
}

/// Umbrella error returned by the constructors.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Vocabulary error: {0}")]
    Load(#[from] LoadError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),
}

/// Render token bytes for error messages.
pub(crate) fn display_token(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}
