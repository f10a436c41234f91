//! Deterministic in-process engine and byte tokenizer.
//!
//! Not a language model. The engine predicts `(last + stride) % n_vocab`
//! (or replays a script) and enforces the same contract a real runtime does:
//! append-only positions, bounded KV cache, logits only where requested.
//! It records every submitted batch so callers can inspect what was decoded.

use std::collections::VecDeque;

use strata_abi::{
    BatchEntry, EngineError, GenerationBatch, InferenceEngine, SOLE_SEQUENCE, Token, Tokenizer,
};
use tracing::{debug, trace};

/// Byte-level tokenizer: three specials, then one id per byte value.
#[derive(Debug, Clone, Copy)]
pub struct ByteTokenizer {
    pub add_bos: bool,
}

impl ByteTokenizer {
    pub const PAD: Token = Token(0);
    pub const BOS: Token = Token(1);
    pub const EOS: Token = Token(2);
    const BYTE_OFFSET: i32 = 3;
    pub const N_VOCAB: usize = 256 + Self::BYTE_OFFSET as usize;

    pub fn new(add_bos: bool) -> Self {
        Self { add_bos }
    }

    #[inline]
    pub fn byte_token(b: u8) -> Token {
        Token(b as i32 + Self::BYTE_OFFSET)
    }
}

impl Default for ByteTokenizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Tokenizer for ByteTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, EngineError> {
        let mut out = Vec::with_capacity(text.len() + 1);
        if self.add_bos {
            out.push(Self::BOS);
        }
        out.extend(text.bytes().map(Self::byte_token));
        Ok(out)
    }

    fn token_to_bytes(&self, token: Token) -> Result<Vec<u8>, EngineError> {
        match token.0 {
            0..=2 => Ok(Vec::new()),
            id if (Self::BYTE_OFFSET..Self::N_VOCAB as i32).contains(&id) => {
                Ok(vec![(id - Self::BYTE_OFFSET) as u8])
            }
            id => Err(EngineError::Detokenize(format!("token {id} out of vocabulary"))),
        }
    }
}

pub struct ReferenceEngine {
    n_ctx: usize,
    n_vocab: usize,
    n_threads: usize,
    eos: Token,
    stride: i32,
    script: VecDeque<Token>,
    fail_on_call: Option<usize>,

    kv_len: usize,
    /// (batch index, logits) for every flagged entry of the last decode.
    outputs: Vec<(usize, Vec<f32>)>,
    submissions: Vec<Vec<BatchEntry>>,
}

impl ReferenceEngine {
    /// Byte vocabulary, EOS from [`ByteTokenizer`], stride 1.
    pub fn new(n_ctx: usize) -> Self {
        Self {
            n_ctx,
            n_vocab: ByteTokenizer::N_VOCAB,
            n_threads: 1,
            eos: ByteTokenizer::EOS,
            stride: 1,
            script: VecDeque::new(),
            fail_on_call: None,
            kv_len: 0,
            outputs: Vec::new(),
            submissions: Vec::new(),
        }
    }

    pub fn with_vocab(mut self, n_vocab: usize) -> Self {
        self.n_vocab = n_vocab.max(1);
        self
    }

    pub fn with_eos(mut self, eos: Token) -> Self {
        self.eos = eos;
        self
    }

    pub fn with_stride(mut self, stride: i32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads.max(1);
        self
    }

    /// Predict these tokens, one per decode call, before falling back to the stride rule.
    pub fn with_script<I: IntoIterator<Item = Token>>(mut self, script: I) -> Self {
        self.script = script.into_iter().collect();
        self
    }

    /// Make the `call`-th decode (0-based) report failure.
    pub fn fail_on_decode(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn decode_calls(&self) -> usize {
        self.submissions.len()
    }

    /// Every batch handed to `decode`, in order (including a failing one).
    pub fn submissions(&self) -> &[Vec<BatchEntry>] {
        &self.submissions
    }

    /// Positions of every submitted entry, flattened across calls.
    pub fn submitted_positions(&self) -> Vec<usize> {
        self.submissions
            .iter()
            .flat_map(|b| b.iter().map(|e| e.pos))
            .collect()
    }

    /// Positions currently held in the (simulated) KV cache.
    pub fn kv_len(&self) -> usize {
        self.kv_len
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    fn predict(&mut self, last: Token) -> Token {
        if let Some(t) = self.script.pop_front() {
            return t;
        }
        let n = self.n_vocab as i64;
        Token(((last.0 as i64 + self.stride as i64).rem_euclid(n)) as i32)
    }

    fn one_hot(&self, token: Token) -> Vec<f32> {
        let mut logits = vec![0.0f32; self.n_vocab];
        if let Some(slot) = token.index().and_then(|i| logits.get_mut(i)) {
            *slot = 1.0;
        }
        logits
    }

    fn validate(&self, batch: &GenerationBatch) -> Result<(), EngineError> {
        if batch.is_empty() {
            return Err(EngineError::Decode {
                code: -1,
                message: "empty batch".into(),
            });
        }
        if self.kv_len + batch.len() > self.n_ctx {
            return Err(EngineError::Decode {
                code: 1,
                message: format!(
                    "KV cache full: {} cached + {} new > n_ctx {}",
                    self.kv_len,
                    batch.len(),
                    self.n_ctx
                ),
            });
        }
        for (i, e) in batch.entries().enumerate() {
            if e.pos != self.kv_len + i {
                return Err(EngineError::Decode {
                    code: -1,
                    message: format!("entry {i}: expected pos {}, got {}", self.kv_len + i, e.pos),
                });
            }
            if e.seq_id != SOLE_SEQUENCE {
                return Err(EngineError::Decode {
                    code: -1,
                    message: format!("entry {i}: unknown sequence {}", e.seq_id),
                });
            }
        }
        Ok(())
    }
}

impl InferenceEngine for ReferenceEngine {
    fn decode(&mut self, batch: &GenerationBatch) -> Result<(), EngineError> {
        let call = self.submissions.len();
        self.submissions.push(batch.entries().collect());
        self.outputs.clear();

        if self.fail_on_call == Some(call) {
            return Err(EngineError::Decode {
                code: 1,
                message: format!("injected failure on decode call {call}"),
            });
        }
        self.validate(batch)?;

        for (i, e) in batch.entries().enumerate() {
            trace!("[reference] pos {} token {} logits={}", e.pos, e.token, e.logits);
            if e.logits {
                let next = self.predict(e.token);
                let logits = self.one_hot(next);
                self.outputs.push((i, logits));
            }
        }

        self.kv_len += batch.len();
        debug!(
            "[reference] decode #{call}: {} entries, kv_len = {}",
            batch.len(),
            self.kv_len
        );
        Ok(())
    }

    fn logits_ith(&self, index: usize) -> Result<&[f32], EngineError> {
        self.outputs
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, l)| l.as_slice())
            .ok_or(EngineError::LogitsUnavailable { index })
    }

    fn is_end_of_generation(&self, token: Token) -> bool {
        token == self.eos
    }

    fn n_ctx(&self) -> usize {
        self.n_ctx
    }

    fn n_vocab(&self) -> usize {
        self.n_vocab
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_tokenizer_roundtrips_text() {
        let tok = ByteTokenizer::default();
        let ids = tok.tokenize("hé").unwrap();
        assert_eq!(ids[0], ByteTokenizer::BOS);
        assert_eq!(ids.len(), 1 + "hé".len());

        let bytes: Vec<u8> = ids
            .iter()
            .flat_map(|&t| tok.token_to_bytes(t).unwrap())
            .collect();
        assert_eq!(String::from_utf8(bytes).unwrap(), "hé");
        assert!(tok.token_to_bytes(Token(9999)).is_err());
    }

    #[test]
    fn logits_only_for_flagged_entries() {
        let mut engine = ReferenceEngine::new(8);
        let mut batch = GenerationBatch::new(8);
        batch.add(Token(10), 0, SOLE_SEQUENCE, false).unwrap();
        batch.add(Token(11), 1, SOLE_SEQUENCE, true).unwrap();
        engine.decode(&batch).unwrap();

        assert!(engine.logits_ith(0).is_err());
        let logits = engine.logits_ith(1).unwrap();
        assert_eq!(logits.len(), ByteTokenizer::N_VOCAB);
        assert_eq!(logits[12], 1.0);
        assert_eq!(engine.kv_len(), 2);
    }

    #[test]
    fn rejects_revisited_positions() {
        let mut engine = ReferenceEngine::new(8);
        let mut batch = GenerationBatch::new(2);
        batch.add(Token(5), 0, SOLE_SEQUENCE, true).unwrap();
        engine.decode(&batch).unwrap();

        // Position 0 again: not append-only.
        let err = engine.decode(&batch).unwrap_err();
        assert!(matches!(err, EngineError::Decode { code: -1, .. }));
    }

    #[test]
    fn rejects_cache_overflow() {
        let mut engine = ReferenceEngine::new(1);
        let mut batch = GenerationBatch::new(2);
        batch.add(Token(5), 0, SOLE_SEQUENCE, false).unwrap();
        batch.add(Token(6), 1, SOLE_SEQUENCE, true).unwrap();
        let err = engine.decode(&batch).unwrap_err();
        assert!(matches!(err, EngineError::Decode { code: 1, .. }));
    }

    #[test]
    fn script_then_stride() {
        let mut engine = ReferenceEngine::new(8)
            .with_vocab(50)
            .with_script([Token(7)])
            .with_stride(3);
        let mut batch = GenerationBatch::new(1);

        batch.add(Token(40), 0, SOLE_SEQUENCE, true).unwrap();
        engine.decode(&batch).unwrap();
        assert_eq!(engine.logits_ith(0).unwrap()[7], 1.0);

        batch.clear();
        batch.add(Token(48), 1, SOLE_SEQUENCE, true).unwrap();
        engine.decode(&batch).unwrap();
        // (48 + 3) % 50
        assert_eq!(engine.logits_ith(0).unwrap()[1], 1.0);
    }
}
