// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SequenceSamples into
// input / target tensors.
//
//   Input:  N samples, each with window + 1 token ids
//   Output: inputs  [N, window]  = tokens[..window]
//           targets [N, window]  = tokens[1..]
//
// All samples of one corpus share the same window, so no
// padding is needed.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::sequence::SequenceSample;

// ─── SequenceBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Token ids the model reads, shape [batch_size, window]
    pub inputs: Tensor<B, 2, Int>,

    /// Next-token ids the model is scored on, shape [batch_size, window]
    pub targets: Tensor<B, 2, Int>,
}

// ─── SequenceBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SequenceSample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceSample>) -> SequenceBatch<B> {
        let batch_size = items.len();
        let window     = items.first().map(SequenceSample::window).unwrap_or(0);

        let inputs: Vec<i64> = items
            .iter()
            .flat_map(|s| s.input().iter().map(|&t| t as i64))
            .collect();

        let targets: Vec<i64> = items
            .iter()
            .flat_map(|s| s.target().iter().map(|&t| t as i64))
            .collect();

        let inputs = Tensor::<B, 2, Int>::from_data(
            TensorData::new(inputs, [batch_size, window]),
            &self.device,
        );
        let targets = Tensor::<B, 2, Int>::from_data(
            TensorData::new(targets, [batch_size, window]),
            &self.device,
        );

        SequenceBatch { inputs, targets }
    }
}
