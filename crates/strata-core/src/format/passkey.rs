//! Long-context retrieval prompt: a pass key buried in filler text.

use rand::Rng;

const PREFIX: &str = "There is an important info hidden inside a lot of irrelevant text. \
Find it and memorize them. I will quiz you about the important information there.";
const SUFFIX: &str = " What is the pass key? The pass key is";
const FILLER: &str =
    " The grass is green. The sky is blue. The sun is yellow. Here we go. There and back again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasskeyPrompt {
    pub text: String,
    pub passkey: u32,
    /// False when `i_pos >= n_junk`; the key never made it into the text.
    pub contains_key: bool,
}

/// Pass keys are drawn from `1..=50000`.
pub fn random_passkey<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=50_000)
}

/// `n_junk` filler blocks; the pass key sentence goes in front of block `i_pos`.
pub fn passkey_prompt(n_junk: usize, i_pos: usize, passkey: u32) -> PasskeyPrompt {
    let mut text = String::with_capacity(PREFIX.len() + n_junk * FILLER.len() + 128);
    text.push_str(PREFIX);

    let mut contains_key = false;
    for i in 0..n_junk {
        if i == i_pos {
            text.push_str(&format!(
                " The pass key is {passkey}. Remember it. {passkey} is the pass key."
            ));
            contains_key = true;
        }
        text.push_str(FILLER);
    }

    text.push_str(SUFFIX);
    PasskeyPrompt {
        text,
        passkey,
        contains_key,
    }
}
