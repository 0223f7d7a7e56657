// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load poem files            (Layer 4 - data)
//   Step 2: Build vocabulary + windows (Layer 4 - data)
//   Step 3: Build the generator        (Layer 5 - ml)
//   Step 4: Compile (split + loaders)  (Layer 5 - ml)
//   Step 5: Fit with checkpointing     (Layer 5 - ml, Layer 6 - infra)
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{corpus::PoemCorpus, loader::PoemLoader};
use crate::domain::traits::{EncodedCorpus, PoemSource};
use crate::ml::{
    backend::ComputeBackend,
    generator::PoemGenerator,
    model::PoemModelConfig,
    state::{LossSettings, OptimizerKind, TrainingState},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All knobs for a training run. Serialisable so a run can be
// described in JSON as well as on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus_path:     String,
    pub checkpoint_dir:  String,
    pub seq_len:         usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub lr_decay:        f64,
    pub grad_clip:       f32,
    pub embedding_dim:   usize,
    pub num_heads:       usize,
    pub hidden_dim:      usize,
    pub num_layers:      usize,
    pub dropout:         f64,
    pub optimizer:       OptimizerKind,
    pub label_smoothing: Option<f32>,
    pub shuffle_seed:    u64,
    pub resume:          bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_path:     "data/poems".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            seq_len:         35,
            batch_size:      30,
            epochs:          3,
            lr:              5.0,
            lr_decay:        0.95,
            grad_clip:       0.5,
            embedding_dim:   200,
            num_heads:       8,
            hidden_dim:      256,
            num_layers:      6,
            dropout:         0.1,
            optimizer:       OptimizerKind::Sgd,
            label_smoothing: None,
            shuffle_seed:    42,
            resume:          true,
        }
    }
}

impl TrainConfig {
    fn model_config(&self, vocab_size: usize) -> PoemModelConfig {
        PoemModelConfig::new(vocab_size)
            .with_embedding_dim(self.embedding_dim)
            .with_num_heads(self.num_heads)
            .with_hidden_dim(self.hidden_dim)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
    }

    /// Push the hyperparameters through the generator's validated setters.
    fn apply<C: ComputeBackend>(&self, generator: &mut PoemGenerator<C>) -> Result<()> {
        let accepted = generator.set_learning_rate(self.lr)
            && generator.set_lr_decay(self.lr_decay)
            && generator.set_epochs(self.epochs)
            && generator.set_batch_size(self.batch_size)
            && generator.set_grad_clip(self.grad_clip);
        if !accepted {
            bail!("Invalid training settings (see warnings above)");
        }
        generator.set_shuffle_seed(self.shuffle_seed);
        generator.set_resume(self.resume);
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline on backend `C`; returns the final training state.
    pub fn execute<C: ComputeBackend>(&self) -> Result<TrainingState> {
        let cfg = &self.config;

        // ── Step 1: Load poems ────────────────────────────────────────────────
        tracing::info!("Loading poems from '{}'", cfg.corpus_path);
        let poems = PoemLoader::new(&cfg.corpus_path).load_all()?;
        if poems.is_empty() {
            bail!("No poems found in '{}'", cfg.corpus_path);
        }

        // ── Step 2: Vocabulary and training windows ───────────────────────────
        let corpus = PoemCorpus::from_poems(&poems, cfg.seq_len)
            .context("Cannot encode the corpus")?;
        let vocab_size = corpus.get_encoding().len();
        tracing::info!(
            "Corpus: {} poems, {} tokens, {} symbols, window {}",
            poems.len(),
            corpus.token_count(),
            vocab_size,
            corpus.window()
        );

        // ── Step 3: Generator on the chosen backend ───────────────────────────
        let mut generator = PoemGenerator::<C>::new(cfg.model_config(vocab_size))
            .context("Invalid model configuration")?;
        cfg.apply(&mut generator)?;
        tracing::debug!("Training settings: {:?}", generator.settings());

        // ── Step 4: Compile ───────────────────────────────────────────────────
        let loss = LossSettings { label_smoothing: cfg.label_smoothing };
        if !generator.compile(Some(&corpus), Some(loss), Some(cfg.optimizer)) {
            bail!("Could not compile the generator (see warnings above)");
        }

        // ── Step 5: Fit ───────────────────────────────────────────────────────
        let trained = generator
            .fit(&cfg.checkpoint_dir)
            .with_context(|| format!("Training into '{}' failed", cfg.checkpoint_dir))?;
        if !trained {
            bail!("Training did not run (see warnings above)");
        }

        Ok(generator.state().clone())
    }
}
