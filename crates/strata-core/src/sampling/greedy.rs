use strata_abi::Token;

use super::{Sampler, SamplingError};

/// Arg-max over `logits`. Ties go to the lowest id; NaN is never picked.
pub fn select_greedy(logits: &[f32]) -> Result<Token, SamplingError> {
    if logits.is_empty() {
        return Err(SamplingError::EmptyLogits);
    }

    let mut best: Option<(usize, f32)> = None;
    for (id, &score) in logits.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((id, score)),
        }
    }

    let (id, _) = best.ok_or(SamplingError::AllNan)?;
    Ok(Token(id as i32))
}

/// Deterministic arg-max policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl Sampler for Greedy {
    fn select_next(&mut self, logits: &[f32]) -> Result<Token, SamplingError> {
        select_greedy(logits)
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}
