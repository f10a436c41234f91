use crate::batch::GenerationBatch;
use crate::error::EngineError;
use crate::token::Token;

/// Forward-pass side of an inference runtime.
///
/// The engine owns the model, the context and its KV cache. The core only
/// submits batches and reads logits back; it never touches cache state.
pub trait InferenceEngine {
    /// Evaluate `batch` in entry order. Blocks until the forward pass is done.
    ///
    /// After an error the cache state is undefined and the engine must not be
    /// asked to continue the same sequence.
    fn decode(&mut self, batch: &GenerationBatch) -> Result<(), EngineError>;

    /// Logits for entry `index` of the most recently decoded batch.
    /// Only entries submitted with the logits flag set are available.
    fn logits_ith(&self, index: usize) -> Result<&[f32], EngineError>;

    /// True for any end-of-generation marker (EOS, EOT, ...).
    fn is_end_of_generation(&self, token: Token) -> bool;

    /// KV cache capacity in positions.
    fn n_ctx(&self) -> usize;

    fn n_vocab(&self) -> usize;
}

/// Text side of an inference runtime.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, EngineError>;

    /// Raw bytes for one token. A single token may hold an incomplete
    /// UTF-8 sequence, so this is bytes rather than `String`.
    fn token_to_bytes(&self, token: Token) -> Result<Vec<u8>, EngineError>;

    /// Lossy text for one token (display/logging only).
    fn token_to_piece(&self, token: Token) -> Result<String, EngineError> {
        let bytes = self.token_to_bytes(token)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
