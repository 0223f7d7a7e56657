// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Loads a trained checkpoint and continues a seed text:
//
//   Step 1: Read checkpoint.json      (Layer 6 - infra)
//   Step 2: Rebuild the architecture  (Layer 5 - ml)
//   Step 3: predict(dir, seed)        (Layer 5 - ml)

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::ComputeBackend,
    generator::PoemGenerator,
    sampler::SamplingSettings,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub checkpoint_dir: String,
    pub seed_text:      String,
    pub length:         usize,
    pub temperature:    f32,
    pub context_window: usize,
    pub rng_seed:       Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        let sampling = SamplingSettings::default();
        Self {
            checkpoint_dir: "checkpoints".to_string(),
            seed_text:      String::new(),
            length:         sampling.max_new_tokens,
            temperature:    sampling.temperature,
            context_window: sampling.context_window,
            rng_seed:       None,
        }
    }
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    pub fn execute<C: ComputeBackend>(&self) -> Result<String> {
        let cfg = &self.config;

        // ── Step 1: Metadata ──────────────────────────────────────────────────
        let meta = CheckpointManager::open(Path::new(&cfg.checkpoint_dir))
            .load_meta()
            .with_context(|| format!("No usable checkpoint in '{}'", cfg.checkpoint_dir))?;

        // ── Step 2: Same architecture the weights were trained with ───────────
        let mut generator = PoemGenerator::<C>::new(meta.model)?;
        let sampling = SamplingSettings {
            max_new_tokens: cfg.length,
            temperature:    cfg.temperature,
            context_window: cfg.context_window,
            seed:           cfg.rng_seed,
        };
        if !generator.set_sampling(sampling) {
            bail!("Invalid sampling settings (see warnings above)");
        }

        // ── Step 3: Generate ──────────────────────────────────────────────────
        generator
            .predict(&cfg.checkpoint_dir, &cfg.seed_text)
            .with_context(|| format!("Generation from '{}' failed", cfg.checkpoint_dir))?
            .ok_or_else(|| anyhow!("Nothing was generated (see warnings above)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::ml::backend::CpuBackend;
    use std::fs;

    #[test]
    fn test_generates_from_a_trained_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("poems.txt");
        fs::write(&corpus, "the moon, the sea\nthe tide and me\n").unwrap();
        let ckpt = dir.path().join("ckpt").to_str().unwrap().to_string();

        let train = TrainConfig {
            corpus_path:    corpus.to_str().unwrap().to_string(),
            checkpoint_dir: ckpt.clone(),
            seq_len:        6,
            batch_size:     2,
            epochs:         1,
            lr:             0.5,
            embedding_dim:  8,
            num_heads:      2,
            hidden_dim:     16,
            num_layers:     1,
            dropout:        0.0,
            ..TrainConfig::default()
        };
        TrainUseCase::new(train).execute::<CpuBackend>().unwrap();

        let generate = GenerateConfig {
            checkpoint_dir: ckpt,
            seed_text:      "the ".to_string(),
            length:         10,
            temperature:    0.0,
            context_window: 8,
            rng_seed:       Some(3),
        };
        let text = GenerateUseCase::new(generate).execute::<CpuBackend>().unwrap();
        assert!(text.starts_with("the "));
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GenerateConfig {
            checkpoint_dir: dir.path().join("none").to_str().unwrap().to_string(),
            ..GenerateConfig::default()
        };
        assert!(GenerateUseCase::new(cfg).execute::<CpuBackend>().is_err());
    }
}
