// Fixed-capacity decode batch.
//
// - Storage is allocated once in `new` and never grows.
// - `clear()` only resets the entry count, so the batch is reused every step.
// - Columns mirror the `llama_batch` layout (token / pos / seq_id / logits).

use crate::error::BatchError;
use crate::token::Token;

/// Sequence id. This design runs a single sequence, so it is always `0`.
pub type SeqId = i32;

/// The one sequence every entry belongs to.
pub const SOLE_SEQUENCE: SeqId = 0;

/// Read-only view of one batch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEntry {
    pub token: Token,
    pub pos: usize,
    pub seq_id: SeqId,
    pub logits: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationBatch {
    capacity: usize,
    tokens: Vec<Token>,
    pos: Vec<usize>,
    seq_id: Vec<SeqId>,
    logits: Vec<bool>,
}

impl GenerationBatch {
    /// Create a batch that can hold up to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tokens: Vec::with_capacity(capacity),
            pos: Vec::with_capacity(capacity),
            seq_id: Vec::with_capacity(capacity),
            logits: Vec::with_capacity(capacity),
        }
    }

    /// Append one entry.
    ///
    /// Fails with [`BatchError::CapacityExceeded`] once `capacity` entries are
    /// present. Position ordering is the caller's responsibility.
    pub fn add(
        &mut self,
        token: Token,
        pos: usize,
        seq_id: SeqId,
        logits: bool,
    ) -> Result<(), BatchError> {
        if self.tokens.len() >= self.capacity {
            return Err(BatchError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.tokens.push(token);
        self.pos.push(pos);
        self.seq_id.push(seq_id);
        self.logits.push(logits);
        Ok(())
    }

    /// Reset the batch so it can be reused. Backing storage is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.pos.clear();
        self.seq_id.clear();
        self.logits.clear();
    }

    /// Ensure only the last entry is marked for logits.
    pub fn mark_last_for_logits(&mut self) {
        let Some(last) = self.logits.len().checked_sub(1) else {
            return;
        };
        for flag in self.logits.iter_mut() {
            *flag = false;
        }
        self.logits[last] = true;
    }

    /// Number of active entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[inline]
    pub fn positions(&self) -> &[usize] {
        &self.pos
    }

    #[inline]
    pub fn seq_ids(&self) -> &[SeqId] {
        &self.seq_id
    }

    #[inline]
    pub fn logits_flags(&self) -> &[bool] {
        &self.logits
    }

    /// Index of the last entry that requested logits.
    pub fn last_logits_index(&self) -> Option<usize> {
        self.logits.iter().rposition(|&want| want)
    }

    pub fn entry(&self, index: usize) -> Option<BatchEntry> {
        if index >= self.tokens.len() {
            return None;
        }
        Some(BatchEntry {
            token: self.tokens[index],
            pos: self.pos[index],
            seq_id: self.seq_id[index],
            logits: self.logits[index],
        })
    }

    /// Entries in evaluation order.
    pub fn entries(&self) -> impl Iterator<Item = BatchEntry> + '_ {
        (0..self.tokens.len()).filter_map(|i| self.entry(i))
    }
}
