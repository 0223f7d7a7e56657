// ============================================================
// Layer 5 — Poem Generator
// ============================================================
// The public face of the model layer. One PoemGenerator owns
// one model on one device and moves through:
//
//   Uncompiled ──compile(corpus)──► Compiled
//   Compiled   ──fit(dir)─────────► Idle with trained weights
//   any        ──predict(dir, seed)► generated text
//
// Operations report bad input (empty path, missing dataset,
// mismatched vocabulary) as a logged warning plus a sentinel
// (false / None). Numeric and checkpoint I/O failures come
// back as PoemError.

use std::path::Path;

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, Optimizer, SgdConfig},
};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::splitter::split_train_test;
use crate::domain::{error::PoemError, traits::EncodedCorpus, vocabulary::Vocabulary};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMeta},
    metrics::MetricsLogger,
};
use crate::ml::{
    backend::{ComputeBackend, ComputeDevice},
    model::{ModelScorer, PoemModel, PoemModelConfig},
    sampler::{generate, SamplingSettings},
    state::{LossSettings, OptimizerKind, TrainingSettings, TrainingState},
    trainer::{build_loaders, Loaders, TrainingRun},
};

pub struct PoemGenerator<C: ComputeBackend> {
    model:        PoemModel<C::Train>,
    model_config: PoemModelConfig,
    device:       ComputeDevice<C>,
    settings:     TrainingSettings,
    state:        TrainingState,
    vocab:        Option<Vocabulary>,
    loaders:      Option<Loaders<C::Train>>,
}

impl<C: ComputeBackend> PoemGenerator<C> {
    pub fn new(model_config: PoemModelConfig) -> Result<Self, PoemError> {
        Self::with_settings(model_config, TrainingSettings::default())
    }

    pub fn with_settings(
        model_config: PoemModelConfig,
        settings:     TrainingSettings,
    ) -> Result<Self, PoemError> {
        model_config.validate()?;
        settings.validate()?;
        let device = C::device();
        let model  = model_config.init::<C::Train>(&device);

        tracing::info!(
            "Model ready on {}: vocab={}, d_model={}, heads={}, layers={}",
            C::name(),
            model_config.vocab_size,
            model_config.embedding_dim,
            model_config.num_heads,
            model_config.num_layers,
        );

        Ok(Self {
            model,
            model_config,
            device,
            state: TrainingState::new(settings.learning_rate),
            settings,
            vocab: None,
            loaders: None,
        })
    }

    // ─── Typed accessors ──────────────────────────────────────────────────────
    pub fn settings(&self) -> &TrainingSettings { &self.settings }

    pub fn state(&self) -> &TrainingState { &self.state }

    pub fn vocabulary(&self) -> Option<&Vocabulary> { self.vocab.as_ref() }

    pub fn is_compiled(&self) -> bool { self.loaders.is_some() }

    // ─── Validated setters ────────────────────────────────────────────────────
    // Each returns false (and changes nothing) when the new value
    // would fail TrainingSettings::validate.

    /// Also resets the scheduler's current learning rate.
    pub fn set_learning_rate(&mut self, lr: f64) -> bool {
        let accepted = self.try_update(|s| s.learning_rate = lr);
        if accepted {
            self.state.learning_rate = lr;
        }
        accepted
    }

    pub fn set_lr_decay(&mut self, factor: f64) -> bool {
        self.try_update(|s| s.lr_decay = factor)
    }

    /// Takes effect at the next compile().
    pub fn set_batch_size(&mut self, batch_size: usize) -> bool {
        self.try_update(|s| s.batch_size = batch_size)
    }

    pub fn set_epochs(&mut self, epochs: usize) -> bool {
        self.try_update(|s| s.epochs = epochs)
    }

    pub fn set_grad_clip(&mut self, max_norm: f32) -> bool {
        self.try_update(|s| s.grad_clip_norm = max_norm)
    }

    /// Takes effect at the next compile().
    pub fn set_shuffle_seed(&mut self, seed: u64) {
        self.settings.shuffle_seed = seed;
    }

    pub fn set_resume(&mut self, resume: bool) {
        self.settings.resume = resume;
    }

    pub fn set_sampling(&mut self, sampling: SamplingSettings) -> bool {
        self.try_update(|s| s.sampling = sampling)
    }

    fn try_update(&mut self, change: impl FnOnce(&mut TrainingSettings)) -> bool {
        let mut next = self.settings.clone();
        change(&mut next);
        match next.validate() {
            Ok(()) => {
                self.settings = next;
                true
            }
            Err(e) => {
                tracing::warn!("Ignoring setting: {e}");
                false
            }
        }
    }

    // ─── compile ──────────────────────────────────────────────────────────────
    /// Apply loss/optimizer overrides, then bind `dataset` as the source
    /// of train and test batches.
    pub fn compile(
        &mut self,
        dataset:   Option<&dyn EncodedCorpus>,
        loss:      Option<LossSettings>,
        optimizer: Option<OptimizerKind>,
    ) -> bool {
        let accepted = self.try_update(|s| {
            if let Some(loss) = loss {
                s.loss = loss;
            }
            if let Some(kind) = optimizer {
                s.optimizer = kind;
            }
        });
        if !accepted {
            return false;
        }

        let Some(dataset) = dataset else {
            tracing::warn!("compile: no dataset given, nothing to train on");
            return false;
        };

        match self.bind(dataset) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("compile: {e}");
                false
            }
        }
    }

    fn bind(&mut self, dataset: &dyn EncodedCorpus) -> Result<(), PoemError> {
        let vocab = dataset.get_encoding();
        if vocab.len() != self.model_config.vocab_size {
            return Err(PoemError::config(format!(
                "dataset vocabulary has {} symbols but the model expects {}",
                vocab.len(),
                self.model_config.vocab_size
            )));
        }

        let samples = dataset.samples();
        let Some(window) = samples.first().map(|s| s.window()) else {
            return Err(PoemError::config("dataset has no training windows"));
        };
        if window > self.model.max_len() {
            return Err(PoemError::config(format!(
                "window {window} exceeds the positional table ({})",
                self.model.max_len()
            )));
        }

        let (train, test) = split_train_test(samples, self.settings.shuffle_seed);
        let loaders = build_loaders::<C::Train>(
            train,
            test,
            self.settings.batch_size,
            self.settings.shuffle_seed,
            &self.device,
        );

        tracing::info!(
            "Compiled: {} train / {} test windows of {} tokens, batch size {}, {:?}",
            loaders.train_samples,
            loaders.test_samples,
            window,
            self.settings.batch_size,
            self.settings.optimizer,
        );

        self.loaders = Some(loaders);
        self.vocab   = Some(vocab.clone());
        Ok(())
    }

    // ─── fit ──────────────────────────────────────────────────────────────────
    /// Train, checkpointing into `path` whenever the epoch loss improves.
    pub fn fit(&mut self, path: &str) -> Result<bool, PoemError> {
        if path.trim().is_empty() {
            tracing::warn!("fit: no checkpoint path given");
            return Ok(false);
        }
        if !self.is_compiled() || self.vocab.is_none() {
            tracing::warn!("fit: call compile() with a dataset first");
            return Ok(false);
        }
        let checkpoints = match CheckpointManager::create(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("fit: {e}");
                return Ok(false);
            }
        };

        let clip = Some(GradientClippingConfig::Norm(self.settings.grad_clip_norm));
        match self.settings.optimizer {
            OptimizerKind::Sgd => {
                let optim = SgdConfig::new()
                    .with_gradient_clipping(clip)
                    .init::<C::Train, PoemModel<C::Train>>();
                self.fit_with(optim, &checkpoints)
            }
            OptimizerKind::Adam => {
                let optim = AdamConfig::new()
                    .with_grad_clipping(clip)
                    .init::<C::Train, PoemModel<C::Train>>();
                self.fit_with(optim, &checkpoints)
            }
        }
    }

    fn fit_with<O>(&mut self, mut optim: O, checkpoints: &CheckpointManager) -> Result<bool, PoemError>
    where
        O: Optimizer<PoemModel<C::Train>, C::Train>,
    {
        if !self.settings.resume {
            self.state = TrainingState::new(self.settings.learning_rate);
        } else if checkpoints.exists() {
            match self.resume(checkpoints, optim)? {
                Some(restored) => optim = restored,
                None => return Ok(false),
            }
        }

        let (Some(loaders), Some(vocab)) = (&self.loaders, &self.vocab) else {
            return Ok(false);
        };

        let metrics = match MetricsLogger::new(checkpoints.dir()) {
            Ok(m) => {
                tracing::debug!("Epoch metrics go to '{}'", m.csv_path().display());
                Some(m)
            }
            Err(e) => {
                tracing::warn!("Metrics CSV disabled: {e:#}");
                None
            }
        };

        let run = TrainingRun {
            loaders,
            settings:     &self.settings,
            checkpoints,
            metrics:      metrics.as_ref(),
            model_config: &self.model_config,
            vocabulary:   vocab,
            device:       &self.device,
        };
        let trained = run.run(self.model.clone(), optim, &mut self.state)?;
        self.model  = trained;

        tracing::info!(
            "Training finished: {} epochs, best loss {:.4}, checkpoint in '{}'",
            self.state.epoch_now,
            self.state.best_loss,
            checkpoints.dir().display()
        );
        Ok(true)
    }

    /// Load weights, optimizer state and counters from an existing
    /// checkpoint. None means the checkpoint does not fit this run.
    fn resume<O>(&mut self, checkpoints: &CheckpointManager, optim: O) -> Result<Option<O>, PoemError>
    where
        O: Optimizer<PoemModel<C::Train>, C::Train>,
    {
        let meta = checkpoints.load_meta()?;

        if self.vocab.as_ref() != Some(&meta.vocabulary) {
            tracing::warn!("fit: checkpoint vocabulary differs from the compiled dataset");
            return Ok(None);
        }
        if !meta.model.same_architecture(&self.model_config) {
            tracing::warn!("fit: checkpoint architecture differs from this model");
            return Ok(None);
        }

        self.model = checkpoints.load_model(self.model.clone(), &self.device)?;
        let optim = if meta.optimizer == self.settings.optimizer {
            checkpoints.load_optimizer(optim, &self.device)?
        } else {
            tracing::warn!(
                "Checkpoint was trained with {:?}; starting {:?} from fresh state",
                meta.optimizer,
                self.settings.optimizer
            );
            optim
        };

        self.state.start_epoch   = meta.epoch;
        self.state.epoch_now     = meta.epoch;
        self.state.best_loss     = meta.best_loss;
        self.state.learning_rate = meta.learning_rate;

        tracing::info!(
            "Resuming after epoch {} (best loss {:.4}, lr {:.4})",
            meta.epoch,
            meta.best_loss,
            meta.learning_rate
        );
        Ok(Some(optim))
    }

    // ─── predict ──────────────────────────────────────────────────────────────
    /// Continue `seed_text`, optionally after loading weights from `weight_path`.
    pub fn predict(&mut self, weight_path: &str, seed_text: &str) -> Result<Option<String>, PoemError> {
        let weight_path = weight_path.trim();
        if weight_path.is_empty() && seed_text.is_empty() {
            tracing::warn!("predict: neither a weight path nor a seed text was given");
            return Ok(None);
        }
        if !weight_path.is_empty() {
            self.restore(Path::new(weight_path))?;
        }

        let Some(vocab) = self.vocabulary() else {
            tracing::warn!("predict: no vocabulary; compile() or pass a checkpoint path");
            return Ok(None);
        };

        let sampling = &self.settings.sampling;
        let mut rng = match sampling.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };

        let model  = self.model.valid();
        let scorer = ModelScorer::new(&model, self.device.clone());
        let text   = generate(&scorer, vocab, seed_text, sampling, &mut rng)?;

        tracing::debug!("Generated {} characters", text.chars().count());
        Ok(Some(text))
    }

    /// Load weights and vocabulary from a checkpoint directory.
    pub fn restore(&mut self, dir: &Path) -> Result<CheckpointMeta, PoemError> {
        let checkpoints = CheckpointManager::open(dir);
        let meta        = checkpoints.load_meta()?;

        if !meta.model.same_architecture(&self.model_config) {
            return Err(PoemError::config(format!(
                "checkpoint '{}' holds a different architecture",
                dir.display()
            )));
        }
        if meta.vocabulary.len() != meta.model.vocab_size {
            return Err(PoemError::config(format!(
                "checkpoint '{}' vocabulary has {} symbols, model expects {}",
                dir.display(),
                meta.vocabulary.len(),
                meta.model.vocab_size
            )));
        }

        self.model = checkpoints.load_model(self.model.clone(), &self.device)?;
        self.vocab = Some(meta.vocabulary.clone());

        tracing::info!("Loaded weights from epoch {} of '{}'", meta.epoch, dir.display());
        Ok(meta)
    }
}
