// ============================================================
// Layer 5 — Autoregressive Generation
// ============================================================
// Extends a seed one token at a time:
//
//   seed "Ro" ──encode──► [R, o]
//   loop:
//     logits = scorer([..., last context_window tokens])
//     next   = argmax(logits)             (temperature 0)
//            | sample softmax(logits / T) (temperature > 0)
//     push next; stop on <eos> or after max_new_tokens
//   ──decode──► "Roses are red<eos>"
//
// The loop only knows the NextTokenScorer trait, so the Burn
// model and test doubles drive it the same way.

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};

use crate::domain::{error::PoemError, traits::NextTokenScorer, vocabulary::Vocabulary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSettings {
    /// Upper bound on generated tokens (the seed is not counted)
    pub max_new_tokens: usize,
    /// 0 = greedy argmax; higher values flatten the distribution
    pub temperature:    f32,
    /// Longest context fed back per step; also capped by the model
    pub context_window: usize,
    /// Fixed RNG seed for reproducible sampling
    pub seed:           Option<u64>,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature:    0.8,
            context_window: 35,
            seed:           None,
        }
    }
}

/// Continue `seed_text` and return seed + generated text.
///
/// An empty seed starts from `<eos>` (the start of a new poem) when the
/// vocabulary has one; that leading marker is not part of the output.
pub fn generate<S, R>(
    scorer:    &S,
    vocab:     &Vocabulary,
    seed_text: &str,
    settings:  &SamplingSettings,
    rng:       &mut R,
) -> Result<String, PoemError>
where
    S: NextTokenScorer + ?Sized,
    R: Rng + ?Sized,
{
    if vocab.is_empty() {
        return Err(PoemError::config("cannot generate with an empty vocabulary"));
    }
    let mut tokens = vocab.encode(seed_text)?;
    let mut skip   = 0;
    if tokens.is_empty() {
        let eos = vocab
            .eos()
            .ok_or_else(|| PoemError::config("seed text is empty and the vocabulary has no <eos>"))?;
        tokens.push(eos);
        skip = 1;
    }

    let window = settings.context_window.min(scorer.max_context()).max(1);
    let eos    = vocab.eos();

    for step in 0..settings.max_new_tokens {
        let start  = tokens.len().saturating_sub(window);
        let logits = scorer.next_token_logits(&tokens[start..])?;
        if logits.len() != vocab.len() {
            return Err(PoemError::config(format!(
                "scorer returned {} logits for a vocabulary of {}",
                logits.len(),
                vocab.len()
            )));
        }

        let next = pick_token(&logits, settings.temperature, rng)?;
        tokens.push(next);

        if Some(next) == eos {
            tracing::debug!("Reached <eos> after {} tokens", step + 1);
            break;
        }
    }

    vocab.decode(&tokens[skip..])
}

/// Argmax at temperature <= 0, otherwise a draw from softmax(logits / T).
pub fn pick_token<R: Rng + ?Sized>(
    logits:      &[f32],
    temperature: f32,
    rng:         &mut R,
) -> Result<u32, PoemError> {
    if logits.is_empty() {
        return Err(PoemError::config("no logits to choose from"));
    }
    if let Some((i, bad)) = logits.iter().enumerate().find(|(_, l)| !l.is_finite()) {
        return Err(PoemError::Sampling(format!("logit {i} is {bad}")));
    }

    if temperature <= 0.0 {
        let mut best = 0;
        for (i, &l) in logits.iter().enumerate() {
            if l > logits[best] {
                best = i;
            }
        }
        return Ok(best as u32);
    }

    let max   = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let probs: Vec<f64> = logits
        .iter()
        .map(|&l| (((l - max) / temperature) as f64).exp())
        .collect();

    let dist = WeightedIndex::new(&probs)
        .map_err(|e| PoemError::Sampling(format!("cannot sample from logits: {e}")))?;
    Ok(dist.sample(rng) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::EOS_SYMBOL;
    use rand::{rngs::StdRng, SeedableRng};
    use std::cell::{Cell, RefCell};

    fn abc() -> Vocabulary {
        Vocabulary::from_symbols(["a", "b", "c", EOS_SYMBOL]).unwrap()
    }

    fn greedy(max_new_tokens: usize) -> SamplingSettings {
        SamplingSettings { max_new_tokens, temperature: 0.0, context_window: 8, seed: None }
    }

    /// Always favours one fixed token.
    struct Fixed {
        token: usize,
        calls: Cell<usize>,
    }

    impl NextTokenScorer for Fixed {
        fn next_token_logits(&self, _context: &[u32]) -> Result<Vec<f32>, PoemError> {
            self.calls.set(self.calls.get() + 1);
            let mut logits = vec![0.0; 4];
            logits[self.token] = 5.0;
            Ok(logits)
        }

        fn max_context(&self) -> usize {
            64
        }
    }

    /// Predicts (last + 1) mod 3 and records the contexts it saw.
    struct Cycle {
        seen: RefCell<Vec<Vec<u32>>>,
    }

    impl NextTokenScorer for Cycle {
        fn next_token_logits(&self, context: &[u32]) -> Result<Vec<f32>, PoemError> {
            self.seen.borrow_mut().push(context.to_vec());
            let next = (*context.last().unwrap() as usize + 1) % 3;
            let mut logits = vec![-1.0; 4];
            logits[next] = 1.0;
            Ok(logits)
        }

        fn max_context(&self) -> usize {
            3
        }
    }

    #[test]
    fn test_stops_after_one_token_on_eos() {
        let scorer = Fixed { token: 3, calls: Cell::new(0) };
        let mut rng = StdRng::seed_from_u64(0);
        let out = generate(&scorer, &abc(), "ab", &greedy(50), &mut rng).unwrap();
        assert_eq!(out, "ab<eos>");
        assert_eq!(scorer.calls.get(), 1);
    }

    #[test]
    fn test_fixed_length_is_the_fallback_stop() {
        let scorer = Fixed { token: 2, calls: Cell::new(0) };
        let mut rng = StdRng::seed_from_u64(0);
        let out = generate(&scorer, &abc(), "a", &greedy(4), &mut rng).unwrap();
        assert_eq!(out, "acccc");
        assert_eq!(scorer.calls.get(), 4);
    }

    #[test]
    fn test_context_is_cropped_to_scorer_limit() {
        let scorer = Cycle { seen: RefCell::new(Vec::new()) };
        let mut rng = StdRng::seed_from_u64(0);
        let out = generate(&scorer, &abc(), "ab", &greedy(4), &mut rng).unwrap();
        assert_eq!(out, "abcabc");
        assert!(scorer.seen.borrow().iter().all(|ctx| ctx.len() <= 3));
        assert_eq!(scorer.seen.borrow()[3], vec![2, 0, 1]);
    }

    #[test]
    fn test_argmax_is_deterministic() {
        let scorer = Cycle { seen: RefCell::new(Vec::new()) };
        let first  = generate(&scorer, &abc(), "b", &greedy(6), &mut StdRng::seed_from_u64(1)).unwrap();
        let second = generate(&scorer, &abc(), "b", &greedy(6), &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_seed_character_surfaces() {
        let scorer = Fixed { token: 0, calls: Cell::new(0) };
        let err = generate(&scorer, &abc(), "abz", &greedy(3), &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert_eq!(err, PoemError::Encoding { symbol: 'z' });
        assert_eq!(scorer.calls.get(), 0);
    }

    #[test]
    fn test_empty_seed_starts_a_new_poem() {
        let scorer = Fixed { token: 1, calls: Cell::new(0) };
        let out = generate(&scorer, &abc(), "", &greedy(3), &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(out, "bbb");
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let logits = [0.3, 1.2, -0.4, 0.9];
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20).map(|_| pick_token(&logits, 1.0, &mut rng).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
        assert!(draw(7).iter().all(|&t| t < 4));
    }

    #[test]
    fn test_non_finite_logits_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = pick_token(&[0.0, f32::NAN], 0.0, &mut rng).unwrap_err();
        assert_eq!(err, PoemError::Sampling("logit 1 is NaN".into()));
    }
}
