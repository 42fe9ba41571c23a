//! Vocabulary loading for the tiktoken BPE format.
//!
//! Each line of a tiktoken file holds one vocabulary entry:
//! - a base64-encoded token (the raw byte sequence)
//! - a single space
//! - the token's rank as a decimal integer
//!
//! Lower ranks are merged first during encoding.
//!
//! # Example Format
//!
//! ```text
//! SGVsbG8= 0
//! V29ybGQ= 1
//! IQ== 2
//! ```
//!
//! Where `SGVsbG8=` decodes to `Hello` (rank 0), `V29ybGQ=` to `World`
//! (rank 1) and `IQ==` to `!` (rank 2).
//!
//! Lines without a space are not entries and are skipped. Every other line must
//! parse, and no token or rank may appear twice: the loader never resolves a
//! collision by overwriting.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashMap;

use super::error::{display_token, LoadError};
use super::Rank;

/// Encoder (token → rank) and decoder (rank → token) built from one file.
pub type EncoderDecoderPair = (FxHashMap<Vec<u8>, Rank>, FxHashMap<Rank, Vec<u8>>);

/// Parse a single line into a `(token, rank)` entry.
///
/// Returns `Ok(None)` for lines that carry no entry. `line_no` is 1-based and
/// only used for error reporting.
fn parse_line(line: &[u8], line_no: usize) -> Result<Option<(Vec<u8>, Rank)>, LoadError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let Some(space_pos) = line.iter().position(|&b| b == b' ') else {
        return Ok(None);
    };

    let token_b64 = &line[..space_pos];
    let rank_str = &line[space_pos + 1..];

    let token = STANDARD
        .decode(token_b64)
        .map_err(|source| LoadError::Base64 {
            line: line_no,
            entry: display_token(line),
            source,
        })?;

    // u64::from_str accepts a leading '+', the format does not.
    if rank_str.is_empty() || !rank_str.iter().all(u8::is_ascii_digit) {
        return Err(LoadError::InvalidRank {
            line: line_no,
            entry: display_token(line),
        });
    }
    let rank = std::str::from_utf8(rank_str)
        .ok()
        .and_then(|s| s.parse::<Rank>().ok())
        .ok_or_else(|| LoadError::InvalidRank {
            line: line_no,
            entry: display_token(line),
        })?;

    Ok(Some((token, rank)))
}

/// Load a tiktoken BPE vocabulary from raw bytes.
///
/// Builds both directions of the mapping at once. The first definition of a
/// token or rank wins; any later line reusing either fails the whole load.
pub fn load_tiktoken_bpe(data: &[u8]) -> Result<EncoderDecoderPair, LoadError> {
    let mut encoder: FxHashMap<Vec<u8>, Rank> = FxHashMap::default();
    let mut decoder: FxHashMap<Rank, Vec<u8>> = FxHashMap::default();

    for (idx, line) in data.split(|&b| b == b'\n').enumerate() {
        let line_no = idx + 1;
        let Some((token, rank)) = parse_line(line, line_no)? else {
            continue;
        };

        if let Some(&existing) = encoder.get(&token) {
            return Err(LoadError::DuplicateToken {
                line: line_no,
                existing,
                rank,
            });
        }
        if let Some(existing) = decoder.get(&rank) {
            return Err(LoadError::DuplicateRank {
                line: line_no,
                rank,
                existing: display_token(existing),
            });
        }

        decoder.insert(rank, token.clone());
        encoder.insert(token, rank);
    }

    log::debug!("loaded {} tiktoken vocabulary entries", encoder.len());
    Ok((encoder, decoder))
}

/// Load a tiktoken BPE vocabulary from a file path.
pub fn load_tiktoken_bpe_file(path: impl AsRef<Path>) -> Result<EncoderDecoderPair, LoadError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("reading tiktoken vocabulary from {}", path.display());
    load_tiktoken_bpe(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_tiktoken_bpe() {
        // "Hello" base64 = "SGVsbG8="
        // "World" base64 = "V29ybGQ="
        let data = b"SGVsbG8= 0\nV29ybGQ= 1\n";
        let (encoder, decoder) = load_tiktoken_bpe(data).unwrap();

        assert_eq!(encoder.get(b"Hello".as_slice()), Some(&0));
        assert_eq!(encoder.get(b"World".as_slice()), Some(&1));
        assert_eq!(decoder.get(&1), Some(&b"World".to_vec()));
        assert_eq!(encoder.len(), 2);
    }

    #[test]
    fn test_lines_without_space_are_skipped() {
        let data = b"# header\n\nSGVsbG8= 7\nnotanentry\n";
        let (encoder, _) = load_tiktoken_bpe(data).unwrap();
        assert_eq!(encoder.len(), 1);
        assert_eq!(encoder.get(b"Hello".as_slice()), Some(&7));
    }

    #[test]
    fn test_crlf_line_endings() {
        let data = b"SGVsbG8= 0\r\nV29ybGQ= 1\r\n";
        let (encoder, _) = load_tiktoken_bpe(data).unwrap();
        assert_eq!(encoder.get(b"World".as_slice()), Some(&1));
    }

    #[test]
    fn test_large_rank() {
        let data = b"YQ== 18446744073709551615\n";
        let (encoder, _) = load_tiktoken_bpe(data).unwrap();
        assert_eq!(encoder.get(b"a".as_slice()), Some(&u64::MAX));
    }

    #[test]
    fn test_invalid_base64_reports_line() {
        let data = b"YQ== 0\n!!!! 1\n";
        match load_tiktoken_bpe(data) {
            Err(LoadError::Base64 { line, entry, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(entry, "!!!! 1");
            }
            other => panic!("expected base64 error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_rank() {
        for data in [
            b"YQ== abc\n".as_slice(),
            b"YQ== -1\n",
            b"YQ== +1\n",
            b"YQ== \n",
            b"YQ== 1 2\n",
            b"YQ== 18446744073709551616\n",
        ] {
            assert!(
                matches!(
                    load_tiktoken_bpe(data),
                    Err(LoadError::InvalidRank { line: 1, .. })
                ),
                "expected rank error for {:?}",
                String::from_utf8_lossy(data)
            );
        }
    }

    #[test]
    fn test_duplicate_rank_is_fatal() {
        // "a" and "b" both claim rank 0
        let data = b"YQ== 0\nYg== 0\n";
        match load_tiktoken_bpe(data) {
            Err(LoadError::DuplicateRank { line, rank, existing }) => {
                assert_eq!(line, 2);
                assert_eq!(rank, 0);
                assert_eq!(existing, "a");
            }
            other => panic!("expected duplicate rank error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_token_is_fatal() {
        let data = b"YQ== 0\nYQ== 1\n";
        assert!(matches!(
            load_tiktoken_bpe(data),
            Err(LoadError::DuplicateToken {
                line: 2,
                existing: 0,
                rank: 1
            })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_tiktoken_bpe_file("/definitely/not/here.tiktoken").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
