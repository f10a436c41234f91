//! Incremental UTF-8 assembly for streamed token bytes.
//!
//! One token may carry half of a multi-byte character; the rest arrives with
//! the next token. Only complete characters are emitted.

use crate::utils::debug::dump_str;

/// Length of the longest valid UTF-8 prefix in `bytes`.
fn utf8_valid_prefix_len(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Ok(_) => bytes.len(),
        Err(e) => e.valid_up_to(),
    }
}

#[derive(Debug, Default)]
pub struct Utf8Stream {
    staging: Vec<u8>,
}

impl Utf8Stream {
    pub fn new() -> Self {
        Self {
            staging: Vec::with_capacity(64),
        }
    }

    /// Feed bytes; returns the newly completed text, if any.
    pub fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.staging.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            let valid = utf8_valid_prefix_len(&self.staging);
            out.push_str(&String::from_utf8_lossy(&self.staging[..valid]));
            if valid == self.staging.len() {
                self.staging.clear();
                break;
            }
            let bad = std::str::from_utf8(&self.staging[valid..])
                .err()
                .and_then(|e| e.error_len());
            match bad {
                // Truly invalid bytes: replace and keep going.
                Some(bad) => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    self.staging.drain(..valid + bad);
                }
                // Incomplete tail: wait for more bytes.
                None => {
                    self.staging.drain(..valid);
                    break;
                }
            }
        }

        if out.is_empty() {
            None
        } else {
            dump_str("stream", &out);
            Some(out)
        }
    }

    /// Flush whatever is left, lossily.
    pub fn finish(&mut self) -> Option<String> {
        if self.staging.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.staging).into_owned();
        self.staging.clear();
        Some(rest)
    }
}
