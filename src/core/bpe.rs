//! The byte-pair merge loop.
//!
//! Leaves are ranges over one contiguous buffer, so the concatenation of two
//! adjacent parts is itself a sub-slice of that buffer. A merge only widens one
//! range and drops its neighbour; nothing is allocated per step.

use std::ops::Range;

use rustc_hash::FxHashMap;

use super::Rank;

/// Repeatedly merge the adjacent pair whose concatenation has the lowest rank.
///
/// Ties on rank go to the leftmost pair. Stops once no adjacent pair
/// concatenates to a known token. Each round removes exactly one part, so the
/// loop runs at most `parts.len() - 1` times; every round rescans all pairs,
/// which makes the whole thing quadratic in the number of leaves.
pub fn byte_pair_merge(
    piece: &[u8],
    parts: &mut Vec<Range<usize>>,
    ranks: &FxHashMap<Vec<u8>, Rank>,
) {
    loop {
        let mut best: Option<(Rank, usize)> = None;
        for (i, pair) in parts.windows(2).enumerate() {
            let Some(&rank) = ranks.get(&piece[pair[0].start..pair[1].end]) else {
                continue;
            };
            if best.map_or(true, |(best_rank, _)| rank < best_rank) {
                best = Some((rank, i));
            }
        }

        let Some((_, i)) = best else {
            break;
        };
        parts[i].end = parts[i + 1].end;
        parts.remove(i + 1);
    }
}

/// Merge `parts` over `piece` and map the survivors to ranks.
///
/// A part missing from `ranks` (only possible for a leaf byte the vocabulary
/// does not define) maps to rank 0.
pub fn byte_pair_encode(
    piece: &[u8],
    mut parts: Vec<Range<usize>>,
    ranks: &FxHashMap<Vec<u8>, Rank>,
) -> Vec<Rank> {
    byte_pair_merge(piece, &mut parts, ranks);

    parts
        .into_iter()
        .map(|part| {
            ranks.get(&piece[part.clone()]).copied().unwrap_or_else(|| {
                log::trace!("no rank for {:?}, using 0", &piece[part]);
                Rank::default()
            })
        })
        .collect()
}
