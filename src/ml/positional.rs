// ============================================================
// Layer 5 — Sinusoidal Positional Encoding
// ============================================================
// Self-attention has no notion of order, so a fixed position
// signal is added to every embedding:
//
//   pe[pos, 2k]   = sin(pos / 10000^(2k/D))
//   pe[pos, 2k+1] = cos(pos / 10000^(2k/D))
//
// The L×D table is computed once on the host and uploaded as a
// module constant (not a parameter, never touched by the
// optimizer, not stored in checkpoints).
//
// Reference: Vaswani et al. (2017) §3.5

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::TensorData,
};

use crate::domain::error::PoemError;

/// Row-major table of shape [max_len, d_model].
pub fn sinusoid_table(d_model: usize, max_len: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; max_len * d_model];
    for pos in 0..max_len {
        for two_k in (0..d_model).step_by(2) {
            let angle = pos as f64 / 10000f64.powf(two_k as f64 / d_model as f64);
            table[pos * d_model + two_k] = angle.sin() as f32;
            if two_k + 1 < d_model {
                table[pos * d_model + two_k + 1] = angle.cos() as f32;
            }
        }
    }
    table
}

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    pe:      Tensor<B, 2>,
    dropout: Dropout,
    max_len: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    pub fn new(d_model: usize, max_len: usize, dropout: f64, device: &B::Device) -> Self {
        let pe = Tensor::from_data(
            TensorData::new(sinusoid_table(d_model, max_len), [max_len, d_model]),
            device,
        );
        Self {
            pe,
            dropout: DropoutConfig::new(dropout).init(),
            max_len,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// x: [batch, seq_len, d_model] → same shape, position signal added.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, PoemError> {
        let [batch, seq_len, d_model] = x.dims();
        if seq_len > self.max_len {
            return Err(PoemError::config(format!(
                "sequence length {seq_len} exceeds positional table length {}",
                self.max_len
            )));
        }

        let pe = self
            .pe
            .clone()
            .slice([0..seq_len, 0..d_model])
            .unsqueeze::<3>()
            .expand([batch, seq_len, d_model]);

        Ok(self.dropout.forward(x + pe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_table_is_deterministic() {
        assert_eq!(sinusoid_table(16, 32), sinusoid_table(16, 32));
    }

    #[test]
    fn test_row_zero_is_zero_phase() {
        let d     = 6;
        let table = sinusoid_table(d, 4);
        assert_eq!(&table[..d], &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_known_values() {
        let d     = 4;
        let table = sinusoid_table(d, 3);
        // pos = 2: k = 0 → angle 2; k = 1 → angle 2 / 100
        assert!((table[2 * d]     - 2f32.sin()).abs() < 1e-6);
        assert!((table[2 * d + 1] - 2f32.cos()).abs() < 1e-6);
        assert!((table[2 * d + 2] - 0.02f32.sin()).abs() < 1e-6);
        assert!((table[2 * d + 3] - 0.02f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_odd_dimension_ends_with_sine() {
        let table = sinusoid_table(5, 2);
        assert_eq!(table.len(), 10);
        assert_eq!(table[4], 0.0);
    }

    #[test]
    fn test_forward_adds_table_without_dropout_at_inference() {
        let device = Default::default();
        let enc    = PositionalEncoding::<NdArray>::new(4, 8, 0.5, &device);
        let x      = Tensor::<NdArray, 3>::zeros([2, 3, 4], &device);

        let out: Vec<f32> = enc.forward(x).unwrap().into_data().convert::<f32>().to_vec().unwrap();
        let expected = &sinusoid_table(4, 8)[..12];
        assert_eq!(&out[..12], expected);
        assert_eq!(&out[12..], expected);
    }

    #[test]
    fn test_sequence_longer_than_table_is_rejected() {
        let device = Default::default();
        let enc    = PositionalEncoding::<NdArray>::new(4, 8, 0.0, &device);
        let err    = enc.forward(Tensor::<NdArray, 3>::zeros([1, 9, 4], &device)).unwrap_err();
        assert!(matches!(err, PoemError::Configuration(_)));
    }
}
