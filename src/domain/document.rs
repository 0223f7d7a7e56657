// ============================================================
// Layer 3 — Poem Domain Type
// ============================================================
// A single poem after it has been read from disk and split
// out of its file, but before any encoding.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poem {
    /// File the poem came from
    pub source: String,

    /// Cleaned poem text, line breaks preserved
    pub text: String,
}

impl Poem {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }
}
