//! Prompt text construction ahead of tokenization.

pub mod passkey;
pub mod prompt_format;
pub mod prompting;

pub use passkey::{PasskeyPrompt, passkey_prompt, random_passkey};
pub use prompt_format::{PromptKind, select_prompt};
pub use prompting::{ChatMlFormat, Phi3Format, PlainFormat, PromptStrategy};
