//! Core byte-pair encoding engine.
//!
//! # Architecture
//!
//! - [`vocab`]: tiktoken file parsing with strict duplicate detection
//! - [`Dictionary`]: the immutable token ↔ rank bijection, special tokens included
//! - `special`: removal of disallowed special tokens and atomic segmentation
//!   around allowed ones
//! - [`bpe`]: the lowest-rank-first merge loop
//! - [`TiktokenProcessor`]: encode/decode over a dictionary
//! - [`RegexTiktokenProcessor`]: regex pre-tokenization in front of it
//! - [`StreamingDecoder`]: incremental decode of rank streams
//! - [`ProcessorBuilder`]: one entry point for building either variant

pub mod bpe;
mod builder;
mod dictionary;
mod error;
mod processor;
mod regex_processor;
mod special;
mod streaming;
pub mod utf8;
pub mod vocab;

pub use bpe::{byte_pair_encode, byte_pair_merge};
pub use builder::{Processor, ProcessorBuilder, ProcessorConfig, VocabSource};
pub use dictionary::Dictionary;
pub use error::{ConfigError, DecodeError, LoadError, TokenizerError};
pub use processor::{BpeProcessor, TiktokenProcessor};
pub use regex_processor::{RegexTiktokenProcessor, CL100K_COMPAT_PATTERN, WORD_PATTERN};
pub use streaming::StreamingDecoder;
pub use utf8::{replace_invalid_utf8, REPLACEMENT_CHARACTER};
pub use vocab::{load_tiktoken_bpe, load_tiktoken_bpe_file, EncoderDecoderPair};

/// Identifier of one token within a [`Dictionary`].
pub type Rank = u64;
