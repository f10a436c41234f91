use strata_abi::{GenerationBatch, InferenceEngine, SOLE_SEQUENCE, Token};
use tracing::{error, info, trace};

use super::GenerationLoop;
use crate::error::{GenerateError, Result};

impl<E: InferenceEngine + ?Sized> GenerationLoop<'_, E> {
    /// Make sure the KV cache can hold the prompt and every generated token.
    /// Runs before any batch exists; the engine cannot grow its cache mid-run.
    pub(super) fn check_capacity(&self, prompt: &[Token]) -> Result<usize> {
        if prompt.is_empty() {
            return Err(GenerateError::EmptyPromptNotSupported);
        }

        let n_ctx = self.engine.n_ctx();
        let n_kv_req = prompt.len().max(self.n_len);
        info!(
            "🧮 [init] n_len = {}, n_ctx = {}, n_kv_req = {}, sampler = {}",
            self.n_len,
            n_ctx,
            n_kv_req,
            self.sampler.name()
        );

        if n_kv_req > n_ctx {
            return Err(GenerateError::CacheTooSmall { n_kv_req, n_ctx });
        }
        Ok(n_kv_req)
    }

    /// Positions 0..P, logits only for the last prompt token.
    pub(super) fn fill_prompt(&self, batch: &mut GenerationBatch, prompt: &[Token]) -> Result<()> {
        for (i, &token) in prompt.iter().enumerate() {
            trace!("[prefill] pos {i} token {token}");
            batch.add(token, i, SOLE_SEQUENCE, false)?;
        }
        batch.mark_last_for_logits();
        Ok(())
    }

    /// Submit `batch`; any engine failure is fatal for the run.
    pub(super) fn decode_batch(&mut self, batch: &GenerationBatch, position: usize) -> Result<()> {
        self.engine.decode(batch).map_err(|source| {
            error!("❌ [decode] engine failed at position {position}: {source}");
            GenerateError::DecodeFailure { position, source }
        })
    }
}
