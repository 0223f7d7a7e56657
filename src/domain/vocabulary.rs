// ============================================================
// Layer 3 — Vocabulary Codec
// ============================================================
// Bidirectional mapping between symbols and token ids.
//
//   c2i: "a" → 0, "b" → 1, ... "<eos>" → V-1
//   i2c: 0 → "a", 1 → "b", ... V-1 → "<eos>"
//
// Symbols are strings so that the end-of-sequence marker can
// live next to single characters. Text is always encoded one
// character at a time, so "<eos>" can only be produced by the
// model, never typed by the user.
//
// The mapping is built once by the corpus, travels inside
// every checkpoint, and is validated again on load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::PoemError;

/// Marker appended after every poem in the training stream.
pub const EOS_SYMBOL: &str = "<eos>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVocabulary")]
pub struct Vocabulary {
    c2i: BTreeMap<String, u32>,
    i2c: Vec<String>,
}

/// Unvalidated serde shape; converted through `Vocabulary::from_symbols`.
#[derive(Deserialize)]
struct RawVocabulary {
    c2i: BTreeMap<String, u32>,
    i2c: Vec<String>,
}

impl TryFrom<RawVocabulary> for Vocabulary {
    type Error = PoemError;

    fn try_from(raw: RawVocabulary) -> Result<Self, Self::Error> {
        let vocab = Vocabulary::from_symbols(raw.i2c)?;
        if vocab.c2i != raw.c2i {
            return Err(PoemError::config("vocabulary c2i does not invert i2c"));
        }
        Ok(vocab)
    }
}

impl Vocabulary {
    /// Build from symbols in id order. Duplicates or empty symbols break
    /// the bijection and are rejected.
    pub fn from_symbols<I, S>(symbols: I) -> Result<Self, PoemError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut c2i = BTreeMap::new();
        let mut i2c = Vec::new();
        for symbol in symbols {
            let symbol = symbol.into();
            if symbol.is_empty() {
                return Err(PoemError::config("vocabulary symbols must not be empty"));
            }
            let id = i2c.len() as u32;
            if c2i.insert(symbol.clone(), id).is_some() {
                return Err(PoemError::config(format!("duplicate vocabulary symbol {symbol:?}")));
            }
            i2c.push(symbol);
        }
        if i2c.is_empty() {
            return Err(PoemError::config("vocabulary is empty"));
        }
        Ok(Self { c2i, i2c })
    }

    /// Every distinct character of `text` in sorted order, then `<eos>`.
    pub fn from_text(text: &str) -> Self {
        let mut chars: Vec<char> = text.chars().collect();
        chars.sort_unstable();
        chars.dedup();

        let mut c2i = BTreeMap::new();
        let mut i2c = Vec::with_capacity(chars.len() + 1);
        for symbol in chars.into_iter().map(String::from).chain([EOS_SYMBOL.to_string()]) {
            c2i.insert(symbol.clone(), i2c.len() as u32);
            i2c.push(symbol);
        }
        Self { c2i, i2c }
    }

    pub fn len(&self) -> usize {
        self.i2c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i2c.is_empty()
    }

    #[cfg(test)]
    pub fn c2i(&self) -> &BTreeMap<String, u32> {
        &self.c2i
    }

    #[cfg(test)]
    pub fn i2c(&self) -> &[String] {
        &self.i2c
    }

    pub fn id_of(&self, symbol: &str) -> Option<u32> {
        self.c2i.get(symbol).copied()
    }

    pub fn symbol(&self, id: u32) -> Option<&str> {
        self.i2c.get(id as usize).map(String::as_str)
    }

    /// Id of the end-of-sequence marker, if this vocabulary has one.
    pub fn eos(&self) -> Option<u32> {
        self.id_of(EOS_SYMBOL)
    }

    /// Encode character by character. Unmapped characters are an error,
    /// never silently dropped or replaced.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, PoemError> {
        let mut buf = [0u8; 4];
        text.chars()
            .map(|c| {
                self.id_of(c.encode_utf8(&mut buf))
                    .ok_or(PoemError::Encoding { symbol: c })
            })
            .collect()
    }

    pub fn decode(&self, ids: &[u32]) -> Result<String, PoemError> {
        ids.iter()
            .map(|&id| self.symbol(id).ok_or(PoemError::UnknownToken(id)))
            .collect()
    }
}
