//! Rankbpe - byte-pair encoding over tiktoken vocabularies
//!
//! Turns text into ranks and back using a tiktoken dictionary, with:
//! - Strict vocabulary loading (duplicate tokens or ranks are errors)
//! - Special tokens that are either stripped or kept as atomic units
//! - Greedy lowest-rank-first merging with leftmost tie-breaking
//! - Optional regex pre-tokenization
//! - Decoding with configurable repair of invalid UTF-8 runs
//! - A streaming decoder for rank-by-rank output
//!
//! # Example
//!
//! ```no_run
//! use rankbpe::{BpeProcessor, ProcessorBuilder, WORD_PATTERN};
//!
//! let processor = ProcessorBuilder::from_file("cl100k_base.tiktoken")
//!     .special_token("<|endoftext|>", 100257)
//!     .allow_special("<|endoftext|>")
//!     .pattern(WORD_PATTERN)
//!     .build()?;
//!
//! let ranks = processor.encode(b"Hello world<|endoftext|>");
//! let text = processor.decode_string(&ranks)?;
//! assert_eq!(text, "Hello world<|endoftext|>");
//! # Ok::<(), rankbpe::TokenizerError>(())
//! ```

pub mod core;

pub use crate::core::{
    BpeProcessor, ConfigError, DecodeError, Dictionary, LoadError, Processor, ProcessorBuilder,
    ProcessorConfig, Rank, RegexTiktokenProcessor, StreamingDecoder, TiktokenProcessor,
    TokenizerError, VocabSource, CL100K_COMPAT_PATTERN, REPLACEMENT_CHARACTER, WORD_PATTERN,
};
