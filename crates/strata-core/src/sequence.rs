use std::ops::Deref;

use strata_abi::Token;

/// Prompt + generated tokens for the single active sequence.
///
/// Append-only: the only mutation is [`TokenSequence::push`]. Each token's
/// index is also its KV position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: Vec<Token>,
    prompt_len: usize,
}

impl TokenSequence {
    /// Start a sequence from prompt tokens, reserving room for `n_len` total.
    pub fn from_prompt(prompt: &[Token], n_len: usize) -> Self {
        let mut tokens = Vec::with_capacity(n_len.max(prompt.len()));
        tokens.extend_from_slice(prompt);
        Self {
            tokens,
            prompt_len: prompt.len(),
        }
    }

    #[inline]
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    #[inline]
    pub fn prompt_len(&self) -> usize {
        self.prompt_len
    }

    #[inline]
    pub fn prompt(&self) -> &[Token] {
        &self.tokens[..self.prompt_len]
    }

    /// Tokens appended after the prompt.
    #[inline]
    pub fn generated(&self) -> &[Token] {
        &self.tokens[self.prompt_len..]
    }

    #[inline]
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_vec(self) -> Vec<Token> {
        self.tokens
    }
}

impl Deref for TokenSequence {
    type Target = [Token];

    fn deref(&self) -> &[Token] {
        &self.tokens
    }
}
