//! Strata generation loop: one prompt, one sequence, one token per step.
//!
//! ```text
//! Init ─▶ PromptFill ─▶ PromptDecode ─▶ GenerateStep ─┬─▶ Done
//!                                           ▲         │
//!                                           └─────────┘
//! (any phase) ─▶ Error
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use strata_abi::{GenerationBatch, InferenceEngine, Token, Tokenizer};
use tracing::{debug, error, info};

use crate::config::GenerationConfig;
use crate::error::{GenerateError, Result};
use crate::sampling::{Sampler, sampler_from_params};
use crate::sequence::TokenSequence;
use crate::stream::Utf8Stream;

// Child modules add `impl GenerationLoop` blocks with the per-phase work.
mod decode;
mod prefill;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Init,
    PromptFill,
    PromptDecode,
    GenerateStep,
    Done,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::PromptFill => "prompt-fill",
            Phase::PromptDecode => "prompt-decode",
            Phase::GenerateStep => "generate",
            Phase::Done => "done",
            Phase::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The sampler produced an end-of-generation token.
    EndOfGeneration,
    /// The sequence reached `n_len`.
    LengthLimit,
}

#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// Prompt followed by every accepted token.
    pub sequence: TokenSequence,
    /// Number of single-token decode steps after the prompt.
    pub n_decode: usize,
    pub stop_reason: StopReason,
    /// Wall time of the generate phase (prompt decode excluded).
    pub elapsed: Duration,
}

impl GenerationOutput {
    #[inline]
    pub fn generated(&self) -> &[Token] {
        self.sequence.generated()
    }

    #[inline]
    pub fn n_prompt(&self) -> usize {
        self.sequence.prompt_len()
    }

    pub fn tokens_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.n_decode as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drives one generation run against a borrowed engine.
///
/// A loop is good for exactly one run: the engine's KV cache is append-only
/// for the sequence, so `run*` consumes `self`.
pub struct GenerationLoop<'e, E: InferenceEngine + ?Sized> {
    engine: &'e mut E,
    sampler: Box<dyn Sampler>,
    /// Total length of the sequence including the prompt.
    n_len: usize,
    batch_capacity: Option<usize>,
    phase: Phase,
}

impl<'e, E: InferenceEngine + ?Sized> GenerationLoop<'e, E> {
    pub fn new(engine: &'e mut E, config: &GenerationConfig) -> Self {
        Self {
            engine,
            sampler: sampler_from_params(&config.sampling),
            n_len: config.n_len,
            batch_capacity: config.batch_capacity,
            phase: Phase::Init,
        }
    }

    /// Swap in a different sampling strategy.
    pub fn with_sampler(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// Generate from `prompt` without observing individual tokens.
    pub fn run(self, prompt: &[Token]) -> Result<GenerationOutput> {
        self.run_streaming(prompt, |_| Ok(()))
    }

    /// Generate from `prompt`, calling `on_token` for every accepted token
    /// (never for the end-of-generation token).
    pub fn run_streaming<F>(mut self, prompt: &[Token], mut on_token: F) -> Result<GenerationOutput>
    where
        F: FnMut(Token) -> Result<()>,
    {
        match self.drive(prompt, &mut on_token) {
            Ok(out) => Ok(out),
            Err(e) => {
                let failed_in = self.phase;
                self.enter(Phase::Error);
                error!("❌ [generate] failed during {failed_in}: {e}");
                Err(e)
            }
        }
    }

    /// Tokenize `text`, generate, and stream decoded UTF-8 to `on_text`.
    /// An error from `on_text` stops the run.
    pub fn run_text<T, F>(
        self,
        tokenizer: &T,
        text: &str,
        mut on_text: F,
    ) -> Result<GenerationOutput>
    where
        T: Tokenizer + ?Sized,
        F: FnMut(&str) -> Result<()>,
    {
        let prompt = tokenizer.tokenize(text).map_err(GenerateError::Tokenize)?;
        debug!("🔤 [generate] Tokenized input ({} tokens)", prompt.len());

        let mut stream = Utf8Stream::new();
        let out = self.run_streaming(&prompt, |token| {
            let bytes = tokenizer
                .token_to_bytes(token)
                .map_err(GenerateError::Detokenize)?;
            if let Some(delta) = stream.push(&bytes) {
                on_text(&delta)?;
            }
            Ok(())
        })?;
        if let Some(rest) = stream.finish() {
            on_text(&rest)?;
        }
        Ok(out)
    }

    fn drive<F>(&mut self, prompt: &[Token], on_token: &mut F) -> Result<GenerationOutput>
    where
        F: FnMut(Token) -> Result<()>,
    {
        self.enter(Phase::Init);
        self.check_capacity(prompt)?;

        let capacity = self.batch_capacity.unwrap_or_else(|| self.engine.n_ctx());
        let mut batch = GenerationBatch::new(capacity);
        let mut sequence = TokenSequence::from_prompt(prompt, self.n_len);

        self.enter(Phase::PromptFill);
        self.fill_prompt(&mut batch, prompt)?;

        self.enter(Phase::PromptDecode);
        self.decode_batch(&batch, prompt.len() - 1)?;

        self.enter(Phase::GenerateStep);
        let t_main_start = Instant::now();
        let (stop_reason, n_decode) = self.generate(&mut batch, &mut sequence, on_token)?;
        let elapsed = t_main_start.elapsed();

        self.enter(Phase::Done);
        let out = GenerationOutput {
            sequence,
            n_decode,
            stop_reason,
            elapsed,
        };
        info!(
            "✅ [generate] decoded {} tokens in {:.2} s, speed: {:.2} t/s ({:?})",
            out.n_decode,
            out.elapsed.as_secs_f64(),
            out.tokens_per_second(),
            out.stop_reason
        );
        Ok(out)
    }

    #[inline]
    fn enter(&mut self, phase: Phase) {
        debug!("[generate] {} → {}", self.phase, phase);
        self.phase = phase;
    }
}
