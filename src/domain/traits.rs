// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers:
//
//   PoemSource       → where raw poems come from
//                      (PoemLoader reads .txt files)
//   EncodedCorpus    → the dataset collaborator handed to
//                      PoemGenerator::compile
//   NextTokenScorer  → anything that turns a token context
//                      into next-token logits; the generation
//                      loop only ever talks to this trait
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::{
    document::Poem,
    error::PoemError,
    sequence::SequenceSample,
    vocabulary::Vocabulary,
};

// ─── PoemSource ───────────────────────────────────────────────────────────────
/// Any component that can load raw poems.
pub trait PoemSource {
    fn load_all(&self) -> Result<Vec<Poem>>;
}

// ─── EncodedCorpus ────────────────────────────────────────────────────────────
/// A corpus that has already been turned into token ids.
///
/// Splitting into train/test is done by the data layer's
/// `split_train_test`, so implementors only hand over samples.
pub trait EncodedCorpus {
    /// The character ↔ index mapping the samples were encoded with.
    fn get_encoding(&self) -> &Vocabulary;

    /// Every training window, in corpus order.
    fn samples(&self) -> Vec<SequenceSample>;
}

// ─── NextTokenScorer ──────────────────────────────────────────────────────────
/// Produces unnormalized logits over the vocabulary for the token
/// that follows `context`.
pub trait NextTokenScorer {
    fn next_token_logits(&self, context: &[u32]) -> Result<Vec<f32>, PoemError>;

    /// Longest context the scorer accepts in one call.
    fn max_context(&self) -> usize;
}
