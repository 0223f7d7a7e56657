// ============================================================
// Layer 4 — Poem Corpus
// ============================================================
// Turns a list of poems into the encoded dataset the model
// trains on.
//
//   poems ──► one token stream:  poem₁ <eos> poem₂ <eos> ...
//         ──► windows of `window + 1` tokens, stride `window`
//
//   stream:  a b c d e f g h i      window = 4
//   samples: [a b c d e] [e f g h i]
//
// Consecutive windows share one token so every position in the
// stream is predicted exactly once. A trailing remainder shorter
// than a full window is dropped.
//
// Reference: Rust Book §8 (Vectors), §13 (Iterators)

use crate::domain::{
    document::Poem,
    error::PoemError,
    sequence::SequenceSample,
    traits::EncodedCorpus,
    vocabulary::Vocabulary,
};

#[derive(Debug, Clone)]
pub struct PoemCorpus {
    vocab:  Vocabulary,
    tokens: Vec<u32>,
    window: usize,
}

impl PoemCorpus {
    pub fn from_poems(poems: &[Poem], window: usize) -> Result<Self, PoemError> {
        if window == 0 {
            return Err(PoemError::config("sequence window must be at least 1"));
        }
        if poems.is_empty() {
            return Err(PoemError::config("corpus contains no poems"));
        }

        let all_text: String = poems.iter().map(|p| p.text.as_str()).collect();
        let vocab = Vocabulary::from_text(&all_text);
        let eos   = vocab.eos().ok_or_else(|| PoemError::config("vocabulary lacks <eos>"))?;

        let mut tokens = Vec::with_capacity(all_text.len() + poems.len());
        for poem in poems {
            tokens.extend(vocab.encode(&poem.text)?);
            tokens.push(eos);
        }

        tracing::info!(
            "Encoded {} poems into {} tokens (vocabulary: {} symbols)",
            poems.len(),
            tokens.len(),
            vocab.len()
        );

        Ok(Self { vocab, tokens, window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

impl EncodedCorpus for PoemCorpus {
    fn get_encoding(&self) -> &Vocabulary {
        &self.vocab
    }

    fn samples(&self) -> Vec<SequenceSample> {
        let span = self.window + 1;
        if self.tokens.len() < span {
            return Vec::new();
        }
        (0..=self.tokens.len() - span)
            .step_by(self.window)
            .map(|start| SequenceSample::new(self.tokens[start..start + span].to_vec()))
            .collect()
    }
}
