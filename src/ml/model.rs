use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Initializer,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation::{relu, softmax}, TensorData},
};

use crate::domain::{error::PoemError, traits::NextTokenScorer};
use crate::ml::{mask::causal_mask_tensor, positional::PositionalEncoding};

#[derive(Config, Debug)]
pub struct PoemModelConfig {
    pub vocab_size:    usize,
    #[config(default = 200)]
    pub embedding_dim: usize,
    #[config(default = 8)]
    pub num_heads:     usize,
    /// Inner width of each layer's feed-forward network
    #[config(default = 256)]
    pub hidden_dim:    usize,
    #[config(default = 6)]
    pub num_layers:    usize,
    #[config(default = 0.1)]
    pub dropout:       f64,
    /// Rows in the sinusoidal table, i.e. the longest sequence the model accepts
    #[config(default = 5000)]
    pub max_len:       usize,
}

impl PoemModelConfig {
    pub fn validate(&self) -> Result<(), PoemError> {
        if self.vocab_size == 0 {
            return Err(PoemError::config("vocab_size must be positive"));
        }
        if self.num_heads == 0 || self.embedding_dim % self.num_heads != 0 {
            return Err(PoemError::config(format!(
                "embedding_dim {} must be divisible by num_heads {}",
                self.embedding_dim, self.num_heads
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(PoemError::config(format!("dropout {} must be in [0, 1)", self.dropout)));
        }
        if self.max_len == 0 || self.num_layers == 0 || self.hidden_dim == 0 {
            return Err(PoemError::config("max_len, num_layers and hidden_dim must be positive"));
        }
        Ok(())
    }

    /// Two configs describe weight-compatible models.
    pub fn same_architecture(&self, other: &Self) -> bool {
        self.vocab_size == other.vocab_size
            && self.embedding_dim == other.embedding_dim
            && self.num_heads == other.num_heads
            && self.hidden_dim == other.hidden_dim
            && self.num_layers == other.num_layers
            && self.max_len == other.max_len
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PoemModel<B> {
        let init_range = Initializer::Uniform { min: -0.1, max: 0.1 };

        let embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_dim)
            .with_initializer(init_range.clone())
            .init(device);
        let positional = PositionalEncoding::new(self.embedding_dim, self.max_len, self.dropout, device);
        let layers = (0..self.num_layers)
            .map(|_| self.build_encoder_layer(device))
            .collect();
        let decoder = LinearConfig::new(self.embedding_dim, self.vocab_size)
            .with_initializer(init_range)
            .init(device);

        PoemModel {
            embedding, positional, layers, decoder,
            embedding_dim: self.embedding_dim,
            vocab_size:    self.vocab_size,
        }
    }

    fn build_encoder_layer<B: Backend>(&self, device: &B::Device) -> EncoderLayer<B> {
        let d_model = self.embedding_dim;
        let self_attn = CausalSelfAttention {
            query:     LinearConfig::new(d_model, d_model).init(device),
            key:       LinearConfig::new(d_model, d_model).init(device),
            value:     LinearConfig::new(d_model, d_model).init(device),
            output:    LinearConfig::new(d_model, d_model).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
            num_heads: self.num_heads,
            head_dim:  d_model / self.num_heads,
        };
        EncoderLayer {
            self_attn,
            ff1:     LinearConfig::new(d_model, self.hidden_dim).init(device),
            ff2:     LinearConfig::new(self.hidden_dim, d_model).init(device),
            norm1:   LayerNormConfig::new(d_model).init(device),
            norm2:   LayerNormConfig::new(d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Multi-head self-attention with an additive mask ─────────────────────────
#[derive(Module, Debug)]
pub struct CausalSelfAttention<B: Backend> {
    pub query:     Linear<B>,
    pub key:       Linear<B>,
    pub value:     Linear<B>,
    pub output:    Linear<B>,
    pub dropout:   Dropout,
    pub num_heads: usize,
    pub head_dim:  usize,
}

impl<B: Backend> CausalSelfAttention<B> {
    /// x: [batch, seq, d_model], mask: [seq, seq] (0 / -inf)
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, seq_len, d_model] = x.dims();
        let heads = |t: Tensor<B, 3>| {
            t.reshape([batch, seq_len, self.num_heads, self.head_dim])
                .swap_dims(1, 2)
        };

        let q = heads(self.query.forward(x.clone()));
        let k = heads(self.key.forward(x.clone()));
        let v = heads(self.value.forward(x));

        // [batch, heads, seq, seq]
        let scores = q
            .matmul(k.swap_dims(2, 3))
            .div_scalar((self.head_dim as f64).sqrt());
        let scores = scores
            + mask
                .unsqueeze::<4>()
                .expand([batch, self.num_heads, seq_len, seq_len]);

        let weights = self.dropout.forward(softmax(scores, 3));
        let context = weights
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch, seq_len, d_model]);

        self.output.forward(context)
    }
}

// ─── Encoder layer (post-norm, ReLU feed-forward) ────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    pub self_attn: CausalSelfAttention<B>,
    pub ff1:       Linear<B>,
    pub ff2:       Linear<B>,
    pub norm1:     LayerNorm<B>,
    pub norm2:     LayerNorm<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> EncoderLayer<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let attended = self.self_attn.forward(x.clone(), mask);
        let x = self.norm1.forward(x + self.dropout.forward(attended));

        let hidden = self.dropout.forward(relu(self.ff1.forward(x.clone())));
        let ff_out = self.ff2.forward(hidden);
        self.norm2.forward(x + self.dropout.forward(ff_out))
    }
}

// ─── Full language model ─────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct PoemModel<B: Backend> {
    pub embedding:     Embedding<B>,
    pub positional:    PositionalEncoding<B>,
    pub layers:        Vec<EncoderLayer<B>>,
    pub decoder:       Linear<B>,
    pub embedding_dim: usize,
    pub vocab_size:    usize,
}

impl<B: Backend> PoemModel<B> {
    /// token_ids: [batch, seq_len], mask: [seq_len, seq_len]
    /// → logits [batch, seq_len, vocab_size] (no softmax)
    pub fn forward(
        &self,
        token_ids: Tensor<B, 2, Int>,
        mask:      Tensor<B, 2>,
    ) -> Result<Tensor<B, 3>, PoemError> {
        let [_, seq_len] = token_ids.dims();
        if mask.dims() != [seq_len, seq_len] {
            return Err(PoemError::config(format!(
                "mask {:?} does not match sequence length {seq_len}",
                mask.dims()
            )));
        }

        let x = self
            .embedding
            .forward(token_ids)
            .mul_scalar((self.embedding_dim as f64).sqrt());
        let mut x = self.positional.forward(x)?;

        for layer in &self.layers {
            x = layer.forward(x, mask.clone());
        }

        Ok(self.decoder.forward(x))
    }

    pub fn max_len(&self) -> usize {
        self.positional.max_len()
    }
}

// ─── Single-sequence scorer used by generation ───────────────────────────────
pub struct ModelScorer<'a, B: Backend> {
    model:  &'a PoemModel<B>,
    device: B::Device,
}

impl<'a, B: Backend> ModelScorer<'a, B> {
    pub fn new(model: &'a PoemModel<B>, device: B::Device) -> Self {
        Self { model, device }
    }
}

impl<B: Backend> NextTokenScorer for ModelScorer<'_, B> {
    fn next_token_logits(&self, context: &[u32]) -> Result<Vec<f32>, PoemError> {
        let seq_len = context.len();
        if seq_len == 0 {
            return Err(PoemError::config("cannot score an empty context"));
        }

        let ids: Vec<i64> = context.iter().map(|&t| t as i64).collect();
        let tokens = Tensor::<B, 2, Int>::from_data(TensorData::new(ids, [1, seq_len]), &self.device);
        let mask   = causal_mask_tensor::<B>(seq_len, &self.device);

        let vocab  = self.model.vocab_size;
        let logits = self.model.forward(tokens, mask)?;
        let last   = logits
            .slice([0..1, seq_len - 1..seq_len, 0..vocab])
            .reshape([vocab]);

        last.into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| PoemError::config(format!("cannot read logits: {e:?}")))
    }

    fn max_context(&self) -> usize {
        self.model.max_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn tiny_config() -> PoemModelConfig {
        PoemModelConfig::new(7)
            .with_embedding_dim(8)
            .with_num_heads(2)
            .with_hidden_dim(16)
            .with_num_layers(2)
            .with_dropout(0.0)
            .with_max_len(16)
    }

    fn tokens(ids: &[i64]) -> Tensor<B, 2, Int> {
        Tensor::from_data(TensorData::new(ids.to_vec(), [1, ids.len()]), &Default::default())
    }

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let model  = tiny_config().init::<B>(&device);
        let input  = Tensor::<B, 2, Int>::from_data(
            TensorData::new(vec![0i64, 1, 2, 3, 4, 5], [2, 3]),
            &device,
        );
        let logits = model.forward(input, causal_mask_tensor::<B>(3, &device)).unwrap();
        assert_eq!(logits.dims(), [2, 3, 7]);
    }

    #[test]
    fn test_future_tokens_do_not_change_past_logits() {
        let device = Default::default();
        let model  = tiny_config().init::<B>(&device);
        let mask   = causal_mask_tensor::<B>(5, &device);

        let a = model.forward(tokens(&[1, 2, 3, 4, 5]), mask.clone()).unwrap();
        let b = model.forward(tokens(&[1, 2, 3, 6, 0]), mask).unwrap();

        let prefix = |t: Tensor<B, 3>| -> Vec<f32> {
            t.slice([0..1, 0..3, 0..7]).into_data().convert::<f32>().to_vec().unwrap()
        };
        let (pa, pb) = (prefix(a), prefix(b));
        for (x, y) in pa.iter().zip(&pb) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }

    #[test]
    fn test_mask_size_mismatch_is_rejected() {
        let device = Default::default();
        let model  = tiny_config().init::<B>(&device);
        let err    = model.forward(tokens(&[1, 2, 3]), causal_mask_tensor::<B>(4, &device));
        assert!(matches!(err, Err(PoemError::Configuration(_))));
    }

    #[test]
    fn test_scorer_returns_one_logit_per_symbol() {
        let device = Default::default();
        let model  = tiny_config().init::<B>(&device);
        let scorer = ModelScorer::new(&model, device);
        assert_eq!(scorer.next_token_logits(&[3, 1]).unwrap().len(), 7);
        assert_eq!(scorer.max_context(), 16);
        assert!(scorer.next_token_logits(&[]).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(tiny_config().validate().is_ok());
        assert!(tiny_config().with_num_heads(3).validate().is_err());
        assert!(tiny_config().with_dropout(1.0).validate().is_err());
        assert!(tiny_config().same_architecture(&tiny_config().with_dropout(0.3)));
        assert!(!tiny_config().same_architecture(&tiny_config().with_num_layers(3)));
    }
}
