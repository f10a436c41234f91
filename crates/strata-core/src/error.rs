use thiserror::Error;

use strata_abi::{BatchError, EngineError};

use crate::sampling::SamplingError;

/// Everything that can end a generation run. None of these are retried.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(
        "required KV cache size is not big enough: n_kv_req = {n_kv_req} > n_ctx = {n_ctx} \
         (either reduce n_len or increase n_ctx)"
    )]
    CacheTooSmall { n_kv_req: usize, n_ctx: usize },

    #[error(transparent)]
    CapacityExceeded(#[from] BatchError),

    #[error("decode failed at position {position}: {source}")]
    DecodeFailure {
        position: usize,
        #[source]
        source: EngineError,
    },

    #[error("empty prompt: at least one token is required to request logits")]
    EmptyPromptNotSupported,

    #[error("logits unavailable after decode: {0}")]
    LogitsUnavailable(#[source] EngineError),

    #[error("sampling failed: {0}")]
    Sampling(#[from] SamplingError),

    #[error("tokenization failed: {0}")]
    Tokenize(#[source] EngineError),

    #[error("detokenization failed: {0}")]
    Detokenize(#[source] EngineError),

    #[error("writing output failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
