use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use strata_abi::Token;

use super::{Sampler, SamplingError};

/// Temperature → top-k → softmax → top-p → draw.
#[derive(Debug, Clone)]
pub struct Stochastic {
    temperature: f32,
    top_k: Option<usize>,
    top_p: Option<f32>,
    rng: StdRng,
    // Reused across steps; cleared every call.
    candidates: Vec<(usize, f32)>,
}

impl Stochastic {
    pub fn new(temperature: f32, top_k: Option<usize>, top_p: Option<f32>, seed: u64) -> Self {
        Self {
            temperature,
            top_k,
            top_p,
            rng: StdRng::seed_from_u64(seed),
            candidates: Vec::new(),
        }
    }

    fn build_candidates(&mut self, logits: &[f32]) {
        self.candidates.clear();
        self.candidates.extend(
            logits
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_nan())
                .map(|(id, &v)| (id, v / self.temperature)),
        );
        // Descending by score, ascending by id on ties.
        self.candidates
            .sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        if let Some(k) = self.top_k {
            self.candidates.truncate(k.max(1));
        }

        // Softmax in place (scores become probabilities).
        // A `+inf` head takes all the mass; an all `-inf` list stays uniform.
        let max = self.candidates.first().map(|c| c.1).unwrap_or(0.0);
        let mut sum = 0.0f32;
        for c in self.candidates.iter_mut() {
            c.1 = if max == f32::INFINITY {
                if c.1 == f32::INFINITY { 1.0 } else { 0.0 }
            } else if max == f32::NEG_INFINITY {
                1.0
            } else {
                (c.1 - max).exp()
            };
            sum += c.1;
        }
        if sum > 0.0 {
            for c in self.candidates.iter_mut() {
                c.1 /= sum;
            }
        }

        if let Some(p) = self.top_p {
            let mut cumulative = 0.0f32;
            let mut cutoff = self.candidates.len();
            for (i, c) in self.candidates.iter().enumerate() {
                cumulative += c.1;
                if cumulative >= p {
                    cutoff = i + 1;
                    break;
                }
            }
            self.candidates.truncate(cutoff.max(1));
        }
    }
}

impl Sampler for Stochastic {
    fn select_next(&mut self, logits: &[f32]) -> Result<Token, SamplingError> {
        if logits.is_empty() {
            return Err(SamplingError::EmptyLogits);
        }
        self.build_candidates(logits);
        if self.candidates.is_empty() {
            return Err(SamplingError::AllNan);
        }

        let id = match WeightedIndex::new(self.candidates.iter().map(|c| c.1)) {
            Ok(dist) => self.candidates[dist.sample(&mut self.rng)].0,
            // Degenerate weights (all zero / overflow): fall back to the top candidate.
            Err(_) => self.candidates[0].0,
        };
        Ok(Token(id as i32))
    }

    fn name(&self) -> &'static str {
        "stochastic"
    }
}
