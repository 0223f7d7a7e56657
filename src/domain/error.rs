// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the model layers can produce.
//
//   Configuration      → missing argument, capacity exceeded,
//                        mismatched vocabulary or architecture
//   Encoding           → seed text holds a character the
//                        vocabulary has never seen
//   UnknownToken       → a token id with no symbol behind it
//   NumericInstability → loss stopped being a finite number
//   Sampling           → generation logits cannot be turned
//                        into a distribution
//   Persistence        → checkpoint read/write failure
//
// Configuration failures are reported and turned into a
// sentinel at the public boundary (false / None). The others
// abort the current training or generation call.

use std::{fmt, path::PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum PoemError {
    /// A required argument is missing or a value exceeds what the model supports.
    Configuration(String),

    /// The input text contains a character outside the vocabulary.
    Encoding { symbol: char },

    /// A token id has no entry in the index-to-character table.
    UnknownToken(u32),

    /// The training loss became NaN or infinite.
    NumericInstability { epoch: usize, batch: usize, loss: f64 },

    /// Generation produced logits that cannot be sampled from.
    Sampling(String),

    /// Reading or writing a checkpoint failed.
    Persistence { path: PathBuf, message: String },
}

impl PoemError {
    pub fn config(message: impl Into<String>) -> Self {
        PoemError::Configuration(message.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        PoemError::Persistence { path: path.into(), message: message.to_string() }
    }
}

impl fmt::Display for PoemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoemError::Configuration(m) => write!(f, "configuration: {m}"),
            PoemError::Encoding { symbol } => {
                write!(f, "encoding: character {symbol:?} is not in the vocabulary")
            }
            PoemError::UnknownToken(id) => write!(f, "decoding: token id {id} is not in the vocabulary"),
            PoemError::NumericInstability { epoch, batch, loss } => write!(
                f,
                "numeric instability: loss {loss} at epoch {epoch}, batch {batch}"
            ),
            PoemError::Sampling(m) => write!(f, "sampling: {m}"),
            PoemError::Persistence { path, message } => {
                write!(f, "checkpoint '{}': {message}", path.display())
            }
        }
    }
}

impl std::error::Error for PoemError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_names_the_path() {
        let msg = PoemError::persistence("ckpt/model.mpk.gz", "disk full").to_string();
        assert_eq!(msg, "checkpoint 'ckpt/model.mpk.gz': disk full");
    }

    #[test]
    fn test_sampling_error_carries_its_message() {
        let msg = PoemError::Sampling("logit 2 is NaN".into()).to_string();
        assert_eq!(msg, "sampling: logit 2 is NaN");
    }

    #[test]
    fn test_display_names_the_symbol() {
        let msg = PoemError::Encoding { symbol: 'Z' }.to_string();
        assert!(msg.contains("'Z'"));
    }
}
