//! Strata core: single-sequence autoregressive generation.
//!
//! The crate packs tokens into a reusable [`strata_abi::GenerationBatch`],
//! checks KV capacity up front, and drives decode → sample → append through
//! any [`strata_abi::InferenceEngine`].

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod reference;
pub mod sampling;
pub mod sequence;
pub mod stream;
pub mod token_file;
pub mod utils;

pub use config::{ConfigError, GenerationConfig};
pub use engine::{GenerationLoop, GenerationOutput, StopReason};
pub use error::{GenerateError, Result};
pub use sampling::{Greedy, Sampler, SamplingError, Stochastic, sampler_from_params, select_greedy};
pub use sequence::TokenSequence;
pub use stream::Utf8Stream;
pub use token_file::{TokenFileError, load_token_file};

pub use strata_abi::Token;
