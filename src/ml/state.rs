// ============================================================
// Layer 5 — Training Settings and State
// ============================================================
// Two typed structs owned by PoemGenerator:
//
//   TrainingSettings → what the user asked for (hyperparameters,
//                      optimizer and loss choice, sampling knobs)
//   TrainingState    → what the run has done so far (epochs
//                      completed, losses, decayed learning rate)
//
// TrainingState is what a checkpoint restores on resume.

use serde::{Deserialize, Serialize};

use crate::domain::error::PoemError;
use crate::ml::sampler::SamplingSettings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Plain stochastic gradient descent
    #[default]
    Sgd,
    Adam,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossSettings {
    /// Cross-entropy label smoothing in (0, 1); None = plain cross-entropy
    pub label_smoothing: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Learning rate for the first epoch
    pub learning_rate:  f64,
    /// Multiplicative decay applied after every epoch
    pub lr_decay:       f64,
    /// Total epochs of a run (resumed runs continue up to this count)
    pub epochs:         usize,
    pub batch_size:     usize,
    /// Global gradient-norm clipping threshold
    pub grad_clip_norm: f32,
    pub optimizer:      OptimizerKind,
    pub loss:           LossSettings,
    /// Seed for the train/test split and loader shuffling
    pub shuffle_seed:   u64,
    /// Continue from an existing checkpoint at the fit path
    pub resume:         bool,
    pub sampling:       SamplingSettings,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            learning_rate:  5.0,
            lr_decay:       0.95,
            epochs:         3,
            batch_size:     30,
            grad_clip_norm: 0.5,
            optimizer:      OptimizerKind::Sgd,
            loss:           LossSettings::default(),
            shuffle_seed:   42,
            resume:         true,
            sampling:       SamplingSettings::default(),
        }
    }
}

impl TrainingSettings {
    /// Reject values no training run can use.
    pub fn validate(&self) -> Result<(), PoemError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(PoemError::config(format!(
                "learning rate {} must be a positive number",
                self.learning_rate
            )));
        }
        if !(self.lr_decay > 0.0 && self.lr_decay <= 1.0) {
            return Err(PoemError::config(format!(
                "learning rate decay {} must be in (0, 1]",
                self.lr_decay
            )));
        }
        if self.epochs == 0 {
            return Err(PoemError::config("epoch count must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(PoemError::config("batch size must be at least 1"));
        }
        if !self.grad_clip_norm.is_finite() || self.grad_clip_norm <= 0.0 {
            return Err(PoemError::config(format!(
                "gradient clipping threshold {} must be a positive number",
                self.grad_clip_norm
            )));
        }
        if let Some(s) = self.loss.label_smoothing {
            if !(0.0..1.0).contains(&s) {
                return Err(PoemError::config(format!("label smoothing {s} must be in [0, 1)")));
            }
        }
        let sampling = &self.sampling;
        if !sampling.temperature.is_finite() || sampling.temperature < 0.0 {
            return Err(PoemError::config(format!(
                "temperature {} must be zero or positive",
                sampling.temperature
            )));
        }
        if sampling.context_window == 0 {
            return Err(PoemError::config("context window must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    /// First epoch the next fit() runs
    pub start_epoch:   usize,
    /// Epochs completed so far
    pub epoch_now:     usize,
    /// Loss of the most recent epoch
    pub loss_now:      f64,
    /// Lowest epoch loss seen; only ever decreases
    pub best_loss:     f64,
    /// Learning rate after all decay steps so far
    pub learning_rate: f64,
}

impl TrainingState {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            start_epoch: 0,
            epoch_now:   0,
            loss_now:    f64::INFINITY,
            best_loss:   f64::INFINITY,
            learning_rate,
        }
    }

    /// One scheduler step.
    pub fn decay_learning_rate(&mut self, factor: f64) {
        self.learning_rate *= factor;
    }

    /// Book-keeping after epoch `epoch` (0-based) finished with `loss`.
    /// Returns true when the loss beats the best so far.
    pub fn finish_epoch(&mut self, epoch: usize, loss: f64) -> bool {
        self.epoch_now   = epoch + 1;
        self.start_epoch = epoch + 1;
        self.loss_now    = loss;

        let improved = loss < self.best_loss;
        if improved {
            self.best_loss = loss;
        }
        improved
    }
}
