// ============================================================
// Layer 5 — Causal Mask Builder
// ============================================================
// Additive attention bias that enforces autoregressive order:
//
//            j=0   j=1   j=2
//   i=0  [   0   -inf  -inf ]
//   i=1  [   0     0   -inf ]
//   i=2  [   0     0     0  ]
//
// Added to the raw scores before softmax, -inf turns into an
// exact zero weight, so position i never sees positions > i.
// The diagonal is always 0, so every row keeps at least one
// finite score and softmax stays well defined.

use burn::{prelude::*, tensor::TensorData};

/// Row-major n×n mask: 0 where j <= i, -inf where j > i.
pub fn causal_mask(n: usize) -> Vec<f32> {
    let mut mask = vec![0.0f32; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            mask[i * n + j] = f32::NEG_INFINITY;
        }
    }
    mask
}

/// The same mask as a [n, n] float tensor on `device`.
pub fn causal_mask_tensor<B: Backend>(n: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(causal_mask(n), [n, n]), device)
}

/// Keeps the last mask around and rebuilds it only when the
/// sequence length changes.
pub struct MaskCache<B: Backend> {
    device: B::Device,
    cached: Option<(usize, Tensor<B, 2>)>,
}

impl<B: Backend> MaskCache<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device, cached: None }
    }

    pub fn get(&mut self, seq_len: usize) -> Tensor<B, 2> {
        if let Some((len, mask)) = &self.cached {
            if *len == seq_len {
                return mask.clone();
            }
        }
        let mask = causal_mask_tensor::<B>(seq_len, &self.device);
        self.cached = Some((seq_len, mask.clone()));
        mask
    }

    #[cfg(test)]
    pub fn cached_len(&self) -> Option<usize> {
        self.cached.as_ref().map(|(len, _)| *len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_zero_iff_not_in_future() {
        for n in 0..=12 {
            let mask = causal_mask(n);
            assert_eq!(mask.len(), n * n);
            for i in 0..n {
                for j in 0..n {
                    let v = mask[i * n + j];
                    if j <= i {
                        assert_eq!(v, 0.0, "n={n} ({i},{j})");
                    } else {
                        assert_eq!(v, f32::NEG_INFINITY, "n={n} ({i},{j})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_tensor_matches_host_mask() {
        let device = Default::default();
        let values: Vec<f32> = causal_mask_tensor::<NdArray>(5, &device)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .unwrap();
        assert_eq!(values, causal_mask(5));
    }

    #[test]
    fn test_cache_rebuilds_only_on_length_change() {
        let mut cache = MaskCache::<NdArray>::new(Default::default());
        assert_eq!(cache.cached_len(), None);
        assert_eq!(cache.get(4).dims(), [4, 4]);
        assert_eq!(cache.get(4).dims(), [4, 4]);
        assert_eq!(cache.cached_len(), Some(4));
        assert_eq!(cache.get(7).dims(), [7, 7]);
        assert_eq!(cache.cached_len(), Some(7));
    }
}
