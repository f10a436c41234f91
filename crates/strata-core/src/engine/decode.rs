use strata_abi::{EngineError, GenerationBatch, InferenceEngine, SOLE_SEQUENCE, Token};
use tracing::debug;

use super::{GenerationLoop, StopReason};
use crate::error::{GenerateError, Result};
use crate::sequence::TokenSequence;

impl<E: InferenceEngine + ?Sized> GenerationLoop<'_, E> {
    /// Sample → check stop → append → decode one token, until a stop condition.
    /// Returns why it stopped and how many single-token decodes ran.
    pub(super) fn generate<F>(
        &mut self,
        batch: &mut GenerationBatch,
        sequence: &mut TokenSequence,
        on_token: &mut F,
    ) -> Result<(StopReason, usize)>
    where
        F: FnMut(Token) -> Result<()>,
    {
        let mut n_decode = 0usize;

        loop {
            let n_cur = sequence.len();

            let index = batch.last_logits_index().ok_or_else(|| {
                GenerateError::LogitsUnavailable(EngineError::LogitsUnavailable {
                    index: batch.len().saturating_sub(1),
                })
            })?;
            let logits = self
                .engine
                .logits_ith(index)
                .map_err(GenerateError::LogitsUnavailable)?;
            let n_vocab = self.engine.n_vocab();
            if logits.len() != n_vocab {
                return Err(GenerateError::LogitsUnavailable(EngineError::LogitsLength {
                    index,
                    expected: n_vocab,
                    actual: logits.len(),
                }));
            }
            let new_token = self.sampler.select_next(logits)?;
            debug!("🎯 [decode] pos {n_cur}: sampled {new_token}");

            // End-of-generation wins when both conditions hold.
            if self.engine.is_end_of_generation(new_token) {
                debug!("🏁 [decode] end-of-generation at pos {n_cur}");
                return Ok((StopReason::EndOfGeneration, n_decode));
            }
            if n_cur >= self.n_len {
                debug!("🏁 [decode] reached n_len = {}", self.n_len);
                return Ok((StopReason::LengthLimit, n_decode));
            }

            sequence.push(new_token);
            on_token(new_token)?;

            batch.clear();
            batch.add(new_token, n_cur, SOLE_SEQUENCE, true)?;
            n_decode += 1;

            self.decode_batch(batch, n_cur)?;
        }
    }
}
