//! Chunk planning.
//!
//! Partitions the (already shuffled) entry list into fixed-size contiguous
//! chunks. Planning is pure: no I/O, and the same entry order and chunk
//! size always produce the same chunk ids — which is what makes re-running
//! a failed subset of chunks safe.

use crate::error::PlanError;
use crate::manifest::Entry;

/// A fixed-size partition of the entry list, packaged into its own
/// `data{chunk_id}.bin` / `meta{chunk_id}.bin` pair.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Stable identifier: the chunk's index in partition order. Determines
    /// the output filenames.
    pub chunk_id: usize,
    /// The entries packaged into this chunk, in order.
    pub entries: Vec<Entry>,
}

impl Chunk {
    /// Number of entries in this chunk.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this chunk holds no entries. Never true for planner output.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Slice `entries` into chunks of `chunk_size`.
///
/// Chunk `k` receives the half-open slice
/// `[k * chunk_size, min((k + 1) * chunk_size, n))`. The final chunk may be
/// shorter; when `n` divides evenly no trailing empty chunk is produced.
/// An empty entry list plans to zero chunks.
///
/// # Errors
///
/// Returns [`PlanError::InvalidChunkSize`] when `chunk_size` is zero.
pub fn plan(entries: Vec<Entry>, chunk_size: usize) -> Result<Vec<Chunk>, PlanError> {
    if chunk_size == 0 {
        return Err(PlanError::InvalidChunkSize);
    }

    let chunks = entries
        .chunks(chunk_size)
        .enumerate()
        .map(|(chunk_id, window)| Chunk {
            chunk_id,
            entries: window.to_vec(),
        })
        .collect();
    Ok(chunks)
}
