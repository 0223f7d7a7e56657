// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop behind PoemGenerator::fit:
//
//   for epoch in state.start_epoch..settings.epochs
//     train phase   (Autodiff backend)
//       per batch: mask → forward → cross-entropy over
//                  [batch*seq, vocab] → backward → clip + step
//     lr *= lr_decay
//     test phase    (model.valid(), inner backend, no dropout)
//     improved?  → checkpoint (weights, optimizer, metadata)
//     metrics.csv row
//
// The optimizer is a type parameter so SGD and Adam share one
// loop; gradient clipping is configured on the optimizer itself.
//
// Reference: Burn Book §5 (Custom Training Loop)

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{SequenceBatch, SequenceBatcher},
    dataset::SequenceDataset,
};
use crate::domain::{error::PoemError, sequence::SequenceSample, vocabulary::Vocabulary};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMeta},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    mask::MaskCache,
    model::{PoemModel, PoemModelConfig},
    state::{TrainingSettings, TrainingState},
};

/// Batches between two progress lines in the debug log.
const LOG_INTERVAL: usize = 200;

// ─── Data loaders ─────────────────────────────────────────────────────────────
/// Train loader on the autodiff backend, test loader on its inner backend.
pub struct Loaders<B: AutodiffBackend> {
    pub train:         Arc<dyn DataLoader<SequenceBatch<B>>>,
    pub test:          Arc<dyn DataLoader<SequenceBatch<B::InnerBackend>>>,
    pub train_samples: usize,
    pub test_samples:  usize,
}

/// Loaders fetch on the calling thread (no worker pool).
pub fn build_loaders<B: AutodiffBackend>(
    train:      Vec<SequenceSample>,
    test:       Vec<SequenceSample>,
    batch_size: usize,
    seed:       u64,
    device:     &B::Device,
) -> Loaders<B> {
    let train_samples = train.len();
    let test_samples  = test.len();

    let train = DataLoaderBuilder::new(SequenceBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .shuffle(seed)
        .build(SequenceDataset::new(train));

    let test = DataLoaderBuilder::new(SequenceBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(batch_size)
        .build(SequenceDataset::new(test));

    Loaders { train, test, train_samples, test_samples }
}

// ─── One run of the epoch loop ────────────────────────────────────────────────
pub struct TrainingRun<'a, B: AutodiffBackend> {
    pub loaders:      &'a Loaders<B>,
    pub settings:     &'a TrainingSettings,
    pub checkpoints:  &'a CheckpointManager,
    pub metrics:      Option<&'a MetricsLogger>,
    pub model_config: &'a PoemModelConfig,
    pub vocabulary:   &'a Vocabulary,
    pub device:       &'a B::Device,
}

impl<B: AutodiffBackend> TrainingRun<'_, B> {
    /// Train from `state.start_epoch` up to `settings.epochs` and return
    /// the model as it stands after the last epoch.
    pub fn run<O>(
        &self,
        mut model: PoemModel<B>,
        mut optim: O,
        state:     &mut TrainingState,
    ) -> Result<PoemModel<B>, PoemError>
    where
        O: Optimizer<PoemModel<B>, B>,
    {
        let loss_config = CrossEntropyLossConfig::new()
            .with_smoothing(self.settings.loss.label_smoothing);
        let train_loss_fn = loss_config.init::<B>(self.device);
        let test_loss_fn  = loss_config.init::<B::InnerBackend>(self.device);

        let mut train_masks = MaskCache::<B>::new(self.device.clone());
        let mut test_masks  = MaskCache::<B::InnerBackend>::new(self.device.clone());

        if state.start_epoch >= self.settings.epochs {
            tracing::info!(
                "Nothing to train: {} of {} epochs already completed",
                state.start_epoch,
                self.settings.epochs
            );
        }

        for epoch in state.start_epoch..self.settings.epochs {
            // ── Training phase ────────────────────────────────────────────────
            let lr = state.learning_rate;
            let (trained, train_loss) = train_epoch(
                model,
                &mut optim,
                self.loaders.train.as_ref(),
                &train_loss_fn,
                &mut train_masks,
                lr,
                epoch,
            )?;
            model = trained;

            state.decay_learning_rate(self.settings.lr_decay);

            // ── Test phase ────────────────────────────────────────────────────
            let test_loss = evaluate(
                &model.valid(),
                self.loaders.test.as_ref(),
                &test_loss_fn,
                &mut test_masks,
                epoch,
            )?;
            let epoch_loss = test_loss.unwrap_or(train_loss);

            let improved = state.finish_epoch(epoch, epoch_loss);
            if improved {
                save_checkpoint(self, &model, &optim, state)?;
            }

            tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | test_loss={} | lr={:.4}{}",
                epoch + 1,
                self.settings.epochs,
                train_loss,
                test_loss.map_or_else(|| "n/a".to_string(), |l| format!("{l:.4}")),
                state.learning_rate,
                if improved { " | saved" } else { "" },
            );

            if let Some(metrics) = self.metrics {
                let row = EpochMetrics {
                    epoch:         epoch + 1,
                    train_loss,
                    test_loss:     epoch_loss,
                    learning_rate: state.learning_rate,
                    improved,
                };
                if let Err(e) = metrics.log(&row) {
                    tracing::warn!("Could not append to metrics CSV: {e:#}");
                }
            }
        }

        Ok(model)
    }
}

fn save_checkpoint<B, O>(
    run:   &TrainingRun<'_, B>,
    model: &PoemModel<B>,
    optim: &O,
    state: &TrainingState,
) -> Result<(), PoemError>
where
    B: AutodiffBackend,
    O: Optimizer<PoemModel<B>, B>,
{
    let meta = CheckpointMeta {
        epoch:         state.epoch_now,
        best_loss:     state.best_loss,
        learning_rate: state.learning_rate,
        optimizer:     run.settings.optimizer,
        model:         run.model_config.clone(),
        vocabulary:    run.vocabulary.clone(),
    };
    run.checkpoints.save(model, optim, &meta)
}

// ─── Phases ───────────────────────────────────────────────────────────────────
/// Next-token cross-entropy of one batch, logits flattened to [batch*seq, vocab].
fn batch_loss<B: Backend>(
    model:   &PoemModel<B>,
    batch:   SequenceBatch<B>,
    loss_fn: &CrossEntropyLoss<B>,
    masks:   &mut MaskCache<B>,
) -> Result<Tensor<B, 1>, PoemError> {
    let [batch_size, seq_len] = batch.inputs.dims();
    let logits = model.forward(batch.inputs, masks.get(seq_len))?;
    let vocab  = logits.dims()[2];

    let logits  = logits.reshape([batch_size * seq_len, vocab]);
    let targets = batch.targets.reshape([batch_size * seq_len]);
    Ok(loss_fn.forward(logits, targets))
}

fn train_epoch<B, O>(
    mut model: PoemModel<B>,
    optim:     &mut O,
    loader:    &dyn DataLoader<SequenceBatch<B>>,
    loss_fn:   &CrossEntropyLoss<B>,
    masks:     &mut MaskCache<B>,
    lr:        f64,
    epoch:     usize,
) -> Result<(PoemModel<B>, f64), PoemError>
where
    B: AutodiffBackend,
    O: Optimizer<PoemModel<B>, B>,
{
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;

    for (index, batch) in loader.iter().enumerate() {
        let loss  = batch_loss(&model, batch, loss_fn, masks)?;
        let value = loss.clone().into_scalar().elem::<f64>();
        if !value.is_finite() {
            return Err(PoemError::NumericInstability { epoch: epoch + 1, batch: index, loss: value });
        }
        loss_sum += value;
        batches  += 1;

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(lr, model, grads);

        if index > 0 && index % LOG_INTERVAL == 0 {
            tracing::debug!("epoch {} batch {index}: loss {value:.4}", epoch + 1);
        }
    }

    let mean = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
    Ok((model, mean))
}

/// Mean test loss, or None when the loader yields no batches.
fn evaluate<B: Backend>(
    model:   &PoemModel<B>,
    loader:  &dyn DataLoader<SequenceBatch<B>>,
    loss_fn: &CrossEntropyLoss<B>,
    masks:   &mut MaskCache<B>,
    epoch:   usize,
) -> Result<Option<f64>, PoemError> {
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;

    for (index, batch) in loader.iter().enumerate() {
        let value = batch_loss(model, batch, loss_fn, masks)?
            .into_scalar()
            .elem::<f64>();
        if !value.is_finite() {
            return Err(PoemError::NumericInstability { epoch: epoch + 1, batch: index, loss: value });
        }
        loss_sum += value;
        batches  += 1;
    }

    Ok((batches > 0).then(|| loss_sum / batches as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::{ComputeBackend, CpuBackend};
    use burn::optim::AdamConfig;

    type B = <CpuBackend as ComputeBackend>::Train;

    fn samples(n: usize) -> Vec<SequenceSample> {
        // a b a b ... over a 3-symbol vocabulary
        (0..n).map(|_| SequenceSample::new(vec![0, 1, 0, 1, 0])).collect()
    }

    fn config() -> PoemModelConfig {
        PoemModelConfig::new(3)
            .with_embedding_dim(8)
            .with_num_heads(2)
            .with_hidden_dim(16)
            .with_num_layers(1)
            .with_dropout(0.0)
            .with_max_len(8)
    }

    #[test]
    fn test_loaders_batch_all_samples() {
        let device  = CpuBackend::device();
        let loaders = build_loaders::<B>(samples(7), samples(3), 2, 1, &device);
        assert_eq!((loaders.train_samples, loaders.test_samples), (7, 3));
        assert_eq!(loaders.train.iter().count(), 4);
        assert_eq!(loaders.test.iter().count(), 2);
    }

    #[test]
    fn test_empty_test_split_has_no_loss() {
        let device  = CpuBackend::device();
        let loaders = build_loaders::<B>(samples(2), Vec::new(), 2, 1, &device);
        let model   = config().init::<B>(&device).valid();
        let loss_fn = CrossEntropyLossConfig::new().init(&device);
        let mut masks = MaskCache::new(device);
        let loss = evaluate(&model, loaders.test.as_ref(), &loss_fn, &mut masks, 0).unwrap();
        assert!(loss.is_none());
    }

    #[test]
    fn test_training_lowers_the_loss() {
        let device  = CpuBackend::device();
        let loaders = build_loaders::<B>(samples(8), samples(2), 4, 3, &device);
        let loss_fn = CrossEntropyLossConfig::new().init::<B>(&device);
        let mut masks = MaskCache::new(device.clone());
        let mut optim = AdamConfig::new().init::<B, PoemModel<B>>();

        let mut model = config().init::<B>(&device);
        let mut first = None;
        let mut last  = f64::INFINITY;
        for epoch in 0..15 {
            let (trained, loss) =
                train_epoch(model, &mut optim, loaders.train.as_ref(), &loss_fn, &mut masks, 0.01, epoch)
                    .unwrap();
            model = trained;
            first.get_or_insert(loss);
            last = loss;
        }
        assert!(last < first.unwrap(), "{last} !< {first:?}");
        assert_eq!(masks.cached_len(), Some(4));
    }
}
