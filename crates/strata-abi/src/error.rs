use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("batch capacity exceeded: at most {capacity} entries fit")]
    CapacityExceeded { capacity: usize },
}

/// Failures reported by an inference engine or tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("decode failed with code {code}: {message}")]
    Decode { code: i32, message: String },

    #[error("no logits available for batch index {index}")]
    LogitsUnavailable { index: usize },

    #[error("logits for batch index {index} have {actual} entries, expected n_vocab = {expected}")]
    LogitsLength {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("tokenize failed: {0}")]
    Tokenize(String),

    #[error("detokenize failed: {0}")]
    Detokenize(String),
}
