//! Integration tests for the generation loop.

use strata_abi::{EngineError, GenerationBatch, InferenceEngine, SamplingParams, Token};
use strata_core::reference::{ByteTokenizer, ReferenceEngine};
use strata_core::{
    GenerateError, GenerationConfig, GenerationLoop, Greedy, Sampler, SamplingError, StopReason,
};

fn test_config(n_len: usize) -> GenerationConfig {
    GenerationConfig {
        n_len,
        ..GenerationConfig::default()
    }
}

fn tokens(ids: &[i32]) -> Vec<Token> {
    ids.iter().copied().map(Token).collect()
}

/// Engine over a small vocabulary whose EOS never comes up unless scripted.
fn small_engine(n_ctx: usize) -> ReferenceEngine {
    ReferenceEngine::new(n_ctx)
        .with_vocab(64)
        .with_eos(Token(63))
        .with_stride(1)
}

#[test]
fn test_three_token_prompt_runs_to_n_len() {
    let mut engine = small_engine(16);
    let prompt = tokens(&[1, 10, 20]);

    let out = GenerationLoop::new(&mut engine, &test_config(5))
        .run(&prompt)
        .unwrap();

    assert_eq!(out.stop_reason, StopReason::LengthLimit);
    assert_eq!(out.sequence.len(), 5);
    assert_eq!(out.n_prompt(), 3);
    assert_eq!(out.n_decode, 2);
    assert_eq!(out.generated(), &tokens(&[21, 22])[..]);

    // Prompt batch: three entries, only the last asks for logits.
    let subs = engine.submissions();
    assert_eq!(subs.len(), 3);
    assert_eq!(subs[0].len(), 3);
    let flags: Vec<bool> = subs[0].iter().map(|e| e.logits).collect();
    assert_eq!(flags, vec![false, false, true]);
    assert_eq!(subs[0][2].pos, 2);

    // Then one single-token batch per step, at positions 3 and 4.
    assert_eq!(subs[1].len(), 1);
    assert_eq!(subs[1][0].pos, 3);
    assert!(subs[1][0].logits);
    assert_eq!(subs[2][0].pos, 4);
    assert!(subs.iter().flatten().all(|e| e.seq_id == 0));
}

#[test]
fn test_positions_are_contiguous_from_zero() {
    let mut engine = small_engine(64);
    let prompt = tokens(&[5, 6, 7, 8]);

    GenerationLoop::new(&mut engine, &test_config(20))
        .run(&prompt)
        .unwrap();

    let positions = engine.submitted_positions();
    let expected: Vec<usize> = (0..positions.len()).collect();
    assert_eq!(positions, expected);
    assert_eq!(engine.kv_len(), 20);
}

#[test]
fn test_cache_too_small_for_n_len() {
    let mut engine = small_engine(4);
    let err = GenerationLoop::new(&mut engine, &test_config(5))
        .run(&tokens(&[1, 2]))
        .unwrap_err();

    assert!(matches!(
        err,
        GenerateError::CacheTooSmall {
            n_kv_req: 5,
            n_ctx: 4
        }
    ));
    assert_eq!(engine.decode_calls(), 0);
}

#[test]
fn test_cache_too_small_for_prompt() {
    let mut engine = small_engine(4);
    let prompt = tokens(&[1, 2, 3, 4, 5, 6, 7, 8]);

    let err = GenerationLoop::new(&mut engine, &test_config(8))
        .run(&prompt)
        .unwrap_err();

    assert!(matches!(
        err,
        GenerateError::CacheTooSmall {
            n_kv_req: 8,
            n_ctx: 4
        }
    ));
    assert_eq!(engine.decode_calls(), 0);
}

#[test]
fn test_cache_exactly_n_len_is_enough() {
    let mut engine = small_engine(5);
    let out = GenerationLoop::new(&mut engine, &test_config(5))
        .run(&tokens(&[1, 10, 20]))
        .unwrap();
    assert_eq!(out.sequence.len(), 5);
    assert_eq!(engine.kv_len(), 5);
}

#[test]
fn test_empty_prompt_rejected() {
    let mut engine = small_engine(16);
    let err = GenerationLoop::new(&mut engine, &test_config(5))
        .run(&[])
        .unwrap_err();
    assert!(matches!(err, GenerateError::EmptyPromptNotSupported));
    assert_eq!(engine.decode_calls(), 0);
}

#[test]
fn test_end_of_generation_stops_early() {
    let mut engine = small_engine(16).with_script(tokens(&[30, 63]));
    let out = GenerationLoop::new(&mut engine, &test_config(10))
        .run(&tokens(&[1, 2]))
        .unwrap();

    assert_eq!(out.stop_reason, StopReason::EndOfGeneration);
    assert_eq!(out.generated(), &tokens(&[30])[..]);
    // EOS is never appended nor decoded.
    assert_eq!(engine.decode_calls(), 2);
    assert!(engine.submissions().iter().flatten().all(|e| e.token != Token(63)));
}

#[test]
fn test_end_of_generation_wins_at_final_position() {
    // After two steps the sequence is at n_len and the next sample is EOS.
    let mut engine = small_engine(16).with_script(tokens(&[40, 41, 63]));
    let out = GenerationLoop::new(&mut engine, &test_config(5))
        .run(&tokens(&[1, 10, 20]))
        .unwrap();

    assert_eq!(out.sequence.len(), 5);
    assert_eq!(out.stop_reason, StopReason::EndOfGeneration);
}

#[test]
fn test_prompt_at_n_len_generates_nothing() {
    let mut engine = small_engine(16);
    let out = GenerationLoop::new(&mut engine, &test_config(3))
        .run(&tokens(&[1, 10, 20]))
        .unwrap();

    assert_eq!(out.stop_reason, StopReason::LengthLimit);
    assert!(out.generated().is_empty());
    assert_eq!(out.n_decode, 0);
    assert_eq!(engine.decode_calls(), 1);
}

#[test]
fn test_prompt_longer_than_n_len_stops_immediately() {
    let mut engine = small_engine(16);
    let out = GenerationLoop::new(&mut engine, &test_config(2))
        .run(&tokens(&[1, 10, 20, 30]))
        .unwrap();
    assert!(out.generated().is_empty());
    assert_eq!(engine.decode_calls(), 1);
}

#[test]
fn test_prompt_decode_failure_is_fatal() {
    let mut engine = small_engine(16).fail_on_decode(0);
    let err = GenerationLoop::new(&mut engine, &test_config(8))
        .run(&tokens(&[1, 2, 3]))
        .unwrap_err();

    match err {
        GenerateError::DecodeFailure { position, .. } => assert_eq!(position, 2),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.decode_calls(), 1);
}

#[test]
fn test_step_decode_failure_is_not_retried() {
    let mut engine = small_engine(16).fail_on_decode(2);
    let err = GenerationLoop::new(&mut engine, &test_config(10))
        .run(&tokens(&[1, 2, 3]))
        .unwrap_err();

    match err {
        GenerateError::DecodeFailure { position, .. } => assert_eq!(position, 4),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.decode_calls(), 3);
}

#[test]
fn test_batch_capacity_smaller_than_prompt() {
    let mut engine = small_engine(16);
    let config = GenerationConfig {
        n_len: 8,
        batch_capacity: Some(2),
        ..GenerationConfig::default()
    };
    let err = GenerationLoop::new(&mut engine, &config)
        .run(&tokens(&[1, 2, 3]))
        .unwrap_err();

    assert!(matches!(err, GenerateError::CapacityExceeded(_)));
    assert_eq!(engine.decode_calls(), 0);
}

#[test]
fn test_streaming_callback_sees_each_accepted_token() {
    let mut engine = small_engine(16);
    let mut seen = Vec::new();
    let out = GenerationLoop::new(&mut engine, &test_config(6))
        .run_streaming(&tokens(&[1, 2]), |t| {
            seen.push(t);
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, out.generated());
    assert_eq!(seen.len(), 4);
}

#[test]
fn test_callback_error_ends_run() {
    let mut engine = small_engine(16);
    let err = GenerationLoop::new(&mut engine, &test_config(6))
        .run_streaming(&tokens(&[1, 2]), |_| Err(GenerateError::EmptyPromptNotSupported))
        .unwrap_err();
    assert!(matches!(err, GenerateError::EmptyPromptNotSupported));
    // Prompt decode only; the first accepted token was never submitted.
    assert_eq!(engine.decode_calls(), 1);
}

#[test]
fn test_run_text_streams_utf8() {
    let tokenizer = ByteTokenizer::default();
    let prompt = "é";
    let eacute = prompt.as_bytes();
    // Script the two bytes of "é" back, then stop.
    let mut engine = ReferenceEngine::new(32).with_script([
        ByteTokenizer::byte_token(eacute[0]),
        ByteTokenizer::byte_token(eacute[1]),
        ByteTokenizer::EOS,
    ]);

    let mut text = String::new();
    let mut chunks = 0;
    let out = GenerationLoop::new(&mut engine, &test_config(16))
        .run_text(&tokenizer, prompt, |delta| {
            text.push_str(delta);
            chunks += 1;
            Ok(())
        })
        .unwrap();

    assert_eq!(text, "é");
    assert_eq!(chunks, 1);
    assert_eq!(out.stop_reason, StopReason::EndOfGeneration);
    assert_eq!(out.n_prompt(), 1 + eacute.len());
}

#[test]
fn test_run_text_stops_when_output_fails() {
    let tokenizer = ByteTokenizer::default();
    let mut engine = ReferenceEngine::new(32);
    let err = GenerationLoop::new(&mut engine, &test_config(16))
        .run_text(&tokenizer, "a", |_| {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into())
        })
        .unwrap_err();

    assert!(matches!(err, GenerateError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
    // The first accepted token was never decoded.
    assert_eq!(engine.decode_calls(), 1);
}

/// Reports one more vocabulary entry than its logits actually carry.
struct MisreportedVocab(ReferenceEngine);

impl InferenceEngine for MisreportedVocab {
    fn decode(&mut self, batch: &GenerationBatch) -> Result<(), EngineError> {
        self.0.decode(batch)
    }

    fn logits_ith(&self, index: usize) -> Result<&[f32], EngineError> {
        self.0.logits_ith(index)
    }

    fn is_end_of_generation(&self, token: Token) -> bool {
        self.0.is_end_of_generation(token)
    }

    fn n_ctx(&self) -> usize {
        self.0.n_ctx()
    }

    fn n_vocab(&self) -> usize {
        self.0.n_vocab() + 1
    }
}

#[test]
fn test_logits_length_must_match_vocab() {
    let mut engine = MisreportedVocab(small_engine(16));
    let err = GenerationLoop::new(&mut engine, &test_config(8))
        .run(&tokens(&[1, 2, 3]))
        .unwrap_err();

    assert!(matches!(
        err,
        GenerateError::LogitsUnavailable(EngineError::LogitsLength {
            index: 2,
            expected: 65,
            actual: 64,
        })
    ));
    // Only the prompt reached the engine.
    assert_eq!(engine.0.decode_calls(), 1);
}

struct AlwaysLast;

impl Sampler for AlwaysLast {
    fn select_next(&mut self, logits: &[f32]) -> Result<Token, SamplingError> {
        if logits.is_empty() {
            return Err(SamplingError::EmptyLogits);
        }
        Ok(Token(logits.len() as i32 - 1))
    }

    fn name(&self) -> &'static str {
        "always-last"
    }
}

#[test]
fn test_custom_sampler_plugs_in() {
    // Token 63 is EOS for `small_engine`, so the first pick ends the run.
    let mut engine = small_engine(16);
    let out = GenerationLoop::new(&mut engine, &test_config(10))
        .with_sampler(Box::new(AlwaysLast))
        .run(&tokens(&[1]))
        .unwrap();
    assert_eq!(out.stop_reason, StopReason::EndOfGeneration);
    assert!(out.generated().is_empty());
}

#[test]
fn test_greedy_is_reproducible_across_runs() {
    let run = || {
        let mut engine = small_engine(32).with_stride(7);
        GenerationLoop::new(&mut engine, &test_config(12))
            .with_sampler(Box::new(Greedy))
            .run(&tokens(&[3, 4]))
            .unwrap()
            .sequence
            .into_vec()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_seeded_stochastic_is_reproducible() {
    let config = GenerationConfig {
        n_len: 12,
        sampling: SamplingParams {
            greedy: false,
            temperature: Some(1.5),
            top_k: Some(8),
            top_p: Some(0.9),
            seed: 99,
        },
        ..GenerationConfig::default()
    };
    let run = || {
        let mut engine = small_engine(32);
        GenerationLoop::new(&mut engine, &config)
            .run(&tokens(&[3, 4]))
            .unwrap()
            .sequence
            .into_vec()
    };
    assert_eq!(run(), run());
}
