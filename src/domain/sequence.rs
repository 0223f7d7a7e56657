// ============================================================
// Layer 3 — Encoded Sequence Domain Type
// ============================================================
// One training window of the next-character objective.
//
// A sample stores window + 1 consecutive token ids. The model
// reads the first `window` ids and must predict the last
// `window` ids, i.e. token t+1 from tokens 0..=t:
//
//   tokens:  [R, o, s, e, s]
//   input:   [R, o, s, e]
//   target:     [o, s, e, s]
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSample {
    /// window + 1 token ids
    pub tokens: Vec<u32>,
}

impl SequenceSample {
    pub fn new(tokens: Vec<u32>) -> Self {
        debug_assert!(tokens.len() >= 2, "a sample needs at least one input/target pair");
        Self { tokens }
    }

    /// Number of positions the model sees (and is scored on).
    pub fn window(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    pub fn input(&self) -> &[u32] {
        &self.tokens[..self.window()]
    }

    pub fn target(&self) -> &[u32] {
        &self.tokens[1..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_is_input_shifted_by_one() {
        let s = SequenceSample::new(vec![4, 7, 1, 9]);
        assert_eq!(s.window(), 3);
        assert_eq!(s.input(),  &[4, 7, 1]);
        assert_eq!(s.target(), &[7, 1, 9]);
    }
}
