//! Strata ABI crate: contracts shared by the generation core and inference engines.

pub mod batch;
pub mod engine;
pub mod error;
pub mod sampling;
pub mod token;

pub use batch::*;
pub use engine::*;
pub use error::*;
pub use sampling::*;
pub use token::*;
