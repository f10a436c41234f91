use serde::{Deserialize, Serialize};

/// Default RNG seed for stochastic sampling.
pub const DEFAULT_SEED: u64 = 1234;

/// User-tunable sampling parameters.
/// Samplers treat these as *desired* knobs; out-of-range values are
/// disabled by [`SamplingParams::normalized`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// If true, pick argmax and ignore other stochastic knobs.
    pub greedy: bool,

    pub temperature: Option<f32>, // > 0.0 enables temperature scaling
    pub top_k: Option<u32>,       // >= 1 keeps the K most likely candidates
    pub top_p: Option<f32>,       // (0, 1] nucleus sampling

    /// Seed for the stochastic path. Same seed + same logits = same tokens.
    pub seed: u64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::greedy()
    }
}

impl SamplingParams {
    pub fn greedy() -> Self {
        Self {
            greedy: true,
            temperature: None,
            top_k: None,
            top_p: None,
            seed: DEFAULT_SEED,
        }
    }

    /// Returns a conflict-free, clamped version of these parameters.
    ///
    /// Precedence:
    /// - `greedy=true` disables temperature/top_k/top_p.
    ///
    /// Clamps:
    /// - temperature <= 0 (or non-finite) → disabled
    /// - top_k < 1 → disabled
    /// - top_p ∉ (0, 1] → disabled
    ///
    /// A result with no temperature left is treated as greedy.
    pub fn normalized(&self) -> Self {
        let mut p = self.clone();

        if p.greedy {
            p.temperature = None;
            p.top_k = None;
            p.top_p = None;
            return p;
        }

        if let Some(t) = p.temperature {
            if t <= 0.0 || !t.is_finite() {
                p.temperature = None;
            }
        }
        if let Some(k) = p.top_k {
            if k < 1 {
                p.top_k = None;
            }
        }
        if let Some(tp) = p.top_p {
            if !(0.0..=1.0).contains(&tp) || tp == 0.0 {
                p.top_p = None;
            }
        }

        if p.temperature.is_none() {
            p.greedy = true;
            p.top_k = None;
            p.top_p = None;
        }

        p
    }
}
