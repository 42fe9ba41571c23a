//! The immutable token ↔ rank bijection shared by every encode and decode call.

use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

use super::error::{display_token, ConfigError, TokenizerError};
use super::vocab::{load_tiktoken_bpe, load_tiktoken_bpe_file};
use super::Rank;

/// A bijective vocabulary with its special tokens layered in.
///
/// Both directions are kept as owned hash maps keyed by the token bytes and the
/// rank respectively. Special tokens live in the same maps as base entries, so
/// the merge loop and the decoder never need to distinguish them.
#[derive(Debug, Clone)]
pub struct Dictionary {
    encoder: FxHashMap<Vec<u8>, Rank>,
    decoder: FxHashMap<Rank, Vec<u8>>,
    special_tokens: FxHashMap<Vec<u8>, Rank>,
    allowed_special: FxHashSet<Vec<u8>>,
}

impl Dictionary {
    /// Layer special tokens on top of a loaded vocabulary.
    ///
    /// `encoder` and `decoder` must already be inverse of each other, which is
    /// what [`load_tiktoken_bpe`] returns. Every token in `allowed_special`
    /// must be a key of `special_tokens`.
    pub fn new(
        mut encoder: FxHashMap<Vec<u8>, Rank>,
        mut decoder: FxHashMap<Rank, Vec<u8>>,
        special_tokens: FxHashMap<Vec<u8>, Rank>,
        allowed_special: &[Vec<u8>],
    ) -> Result<Self, ConfigError> {
        let mut ordered: Vec<(&Vec<u8>, Rank)> =
            special_tokens.iter().map(|(t, &r)| (t, r)).collect();
        ordered.sort_unstable_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        for (token, rank) in ordered {
            if token.is_empty() {
                return Err(ConfigError::EmptySpecialToken(rank));
            }
            if let Some(existing) = decoder.get(&rank) {
                return Err(ConfigError::SpecialRankCollision {
                    token: display_token(token),
                    rank,
                    existing: display_token(existing),
                });
            }
            if let Some(&existing) = encoder.get(token) {
                return Err(ConfigError::SpecialTokenCollision {
                    token: display_token(token),
                    existing,
                });
            }
            encoder.insert(token.clone(), rank);
            decoder.insert(rank, token.clone());
        }

        let mut allowed = FxHashSet::default();
        for token in allowed_special {
            if !special_tokens.contains_key(token) {
                return Err(ConfigError::UnknownAllowedToken(display_token(token)));
            }
            allowed.insert(token.clone());
        }

        log::debug!(
            "dictionary ready: {} entries, {} special ({} allowed)",
            encoder.len(),
            special_tokens.len(),
            allowed.len()
        );

        Ok(Self {
            encoder,
            decoder,
            special_tokens,
            allowed_special: allowed,
        })
    }

    /// Build a dictionary from raw tiktoken bytes.
    pub fn from_bytes(
        data: &[u8],
        special_tokens: FxHashMap<Vec<u8>, Rank>,
        allowed_special: &[Vec<u8>],
    ) -> Result<Self, TokenizerError> {
        let (encoder, decoder) = load_tiktoken_bpe(data)?;
        Ok(Self::new(encoder, decoder, special_tokens, allowed_special)?)
    }

    /// Build a dictionary from a tiktoken file.
    pub fn from_file(
        path: impl AsRef<Path>,
        special_tokens: FxHashMap<Vec<u8>, Rank>,
        allowed_special: &[Vec<u8>],
    ) -> Result<Self, TokenizerError> {
        let (encoder, decoder) = load_tiktoken_bpe_file(path)?;
        Ok(Self::new(encoder, decoder, special_tokens, allowed_special)?)
    }

    /// Rank of a token, special tokens included.
    #[inline]
    pub fn rank(&self, token: &[u8]) -> Option<Rank> {
        self.encoder.get(token).copied()
    }

    /// Token bytes for a rank, special tokens included.
    #[inline]
    pub fn token(&self, rank: Rank) -> Option<&[u8]> {
        self.decoder.get(&rank).map(Vec::as_slice)
    }

    pub fn is_special(&self, token: &[u8]) -> bool {
        self.special_tokens.contains_key(token)
    }

    pub fn is_allowed_special(&self, token: &[u8]) -> bool {
        self.allowed_special.contains(token)
    }

    /// All registered special tokens with their ranks.
    pub fn special_tokens(&self) -> &FxHashMap<Vec<u8>, Rank> {
        &self.special_tokens
    }

    /// The special tokens recognised as atomic units while encoding.
    pub fn allowed_special_tokens(&self) -> impl Iterator<Item = &[u8]> {
        self.allowed_special.iter().map(Vec::as_slice)
    }

    /// Special tokens that are stripped from the input while encoding.
    pub fn disallowed_special_tokens(&self) -> impl Iterator<Item = &[u8]> {
        self.special_tokens
            .keys()
            .filter(|t| !self.allowed_special.contains(*t))
            .map(Vec::as_slice)
    }

    /// Get the encoder map (token bytes -> rank).
    pub fn encoder(&self) -> &FxHashMap<Vec<u8>, Rank> {
        &self.encoder
    }

    /// Number of entries, special tokens included.
    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Get the vocabulary size.
    ///
    /// This is the highest rank plus one, the number of slots an embedding
    /// table indexed by rank needs. Saturates at `u64::MAX`.
    pub fn vocab_size(&self) -> u64 {
        self.decoder
            .keys()
            .max()
            .map_or(0, |&max| max.saturating_add(1))
    }
}
