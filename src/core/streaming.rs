//! Incremental decoding for rank streams.
//!
//! When ranks arrive one at a time (as in model output), a token may end in the
//! middle of a multi-byte character. [`StreamingDecoder`] buffers bytes and only
//! emits the part that can no longer change: everything up to the last complete
//! valid character. Invalid runs are held back too until a valid character
//! follows them, so a run is never split across two emissions and the
//! replacement policy gives exactly the same bytes as a one-shot decode.

use super::error::DecodeError;
use super::processor::TiktokenProcessor;
use super::utf8::settled_len;
use super::Rank;

/// A streaming decoder that handles incomplete UTF-8 sequences across token boundaries.
///
/// # Example
///
/// ```ignore
/// let mut decoder = processor.streaming_decoder();
///
/// for rank in rank_stream {
///     if let Some(bytes) = decoder.add_rank(rank)? {
///         out.write_all(&bytes)?;
///     }
/// }
/// // Flush any remaining buffered bytes
/// out.write_all(&decoder.flush())?;
/// ```
pub struct StreamingDecoder<'a> {
    processor: &'a TiktokenProcessor,
    buffer: Vec<u8>,
}

impl<'a> StreamingDecoder<'a> {
    /// Create a new streaming decoder for the given processor.
    pub fn new(processor: &'a TiktokenProcessor) -> Self {
        Self {
            processor,
            buffer: Vec::with_capacity(16),
        }
    }

    /// Add a rank and return any bytes that are now settled.
    ///
    /// Returns `Ok(None)` while everything buffered may still change. An unknown
    /// rank is rejected and leaves the buffer as it was.
    pub fn add_rank(&mut self, rank: Rank) -> Result<Option<Vec<u8>>, DecodeError> {
        let token = self
            .processor
            .dictionary()
            .token(rank)
            .ok_or(DecodeError::InvalidRank(rank))?;
        self.buffer.extend_from_slice(token);
        Ok(self.extract_settled())
    }

    /// Add several ranks at once.
    ///
    /// The whole batch is checked before anything is buffered.
    pub fn add_ranks(&mut self, ranks: &[Rank]) -> Result<Option<Vec<u8>>, DecodeError> {
        let bytes = self.processor.decode_raw(ranks)?;
        self.buffer.extend_from_slice(&bytes);
        Ok(self.extract_settled())
    }

    /// Flush any remaining buffered bytes.
    ///
    /// Leftover invalid or unfinished sequences go through the processor's
    /// replacement policy like any other decoded bytes.
    pub fn flush(&mut self) -> Vec<u8> {
        let rest = std::mem::take(&mut self.buffer);
        self.processor.finish_decode(rest)
    }

    /// Reset the decoder state, discarding any buffered bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Check if there are buffered bytes waiting for completion.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Get the number of pending bytes in the buffer.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn extract_settled(&mut self) -> Option<Vec<u8>> {
        let settled = settled_len(&self.buffer);
        if settled == 0 {
            return None;
        }

        let bytes: Vec<u8> = self.buffer.drain(..settled).collect();
        Some(self.processor.finish_decode(bytes))
    }
}
