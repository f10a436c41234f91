//! Next-token selection strategies.
//!
//! The generation loop only sees [`Sampler`]; which policy runs behind it is
//! decided once from [`SamplingParams`] by [`sampler_from_params`].

mod greedy;
mod stochastic;

pub use greedy::{Greedy, select_greedy};
pub use stochastic::Stochastic;

use strata_abi::{SamplingParams, Token};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplingError {
    #[error("empty logits vector")]
    EmptyLogits,

    #[error("every logit is NaN")]
    AllNan,
}

/// Turns one logits vector (length `n_vocab`) into the next token.
pub trait Sampler {
    fn select_next(&mut self, logits: &[f32]) -> Result<Token, SamplingError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Factory: build the sampler described by `params` (after normalization).
pub fn sampler_from_params(params: &SamplingParams) -> Box<dyn Sampler> {
    let p = params.normalized();
    match p.temperature {
        Some(temperature) if !p.greedy => Box::new(Stochastic::new(
            temperature,
            p.top_k.map(|k| k as usize),
            p.top_p,
            p.seed,
        )),
        _ => Box::new(Greedy),
    }
}
