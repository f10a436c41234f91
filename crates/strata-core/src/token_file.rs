//! Token id lists stored one integer per line.

use std::fs;
use std::path::{Path, PathBuf};

use strata_abi::Token;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenFileError {
    #[error("failed to open token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: not a token id: {text:?}")]
    BadLine {
        path: PathBuf,
        line: usize,
        text: String,
    },
}

/// Read token ids, one per line. Blank lines are skipped; surrounding
/// whitespace is ignored.
pub fn load_token_file<P: AsRef<Path>>(path: P) -> Result<Vec<Token>, TokenFileError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| TokenFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_token_lines(&raw).map_err(|(line, text)| TokenFileError::BadLine {
        path: path.to_path_buf(),
        line,
        text,
    })
}

/// Parse already-loaded text. On failure returns the 1-based line number and its text.
pub fn parse_token_lines(raw: &str) -> Result<Vec<Token>, (usize, String)> {
    let mut tokens = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<i32>() {
            Ok(id) if id >= 0 => tokens.push(Token(id)),
            _ => return Err((i + 1, trimmed.to_string())),
        }
    }
    Ok(tokens)
}
