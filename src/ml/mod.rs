// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs the network.
//
//   backend.rs    — ComputeBackend: CPU (NdArray) or GPU (Wgpu)
//   mask.rs       — Additive causal attention mask + cache
//   positional.rs — Fixed sinusoidal position signals
//   model.rs      — Causal transformer encoder language model:
//                   • Token embeddings scaled by √d_model
//                   • Multi-head self-attention under the mask
//                   • Post-norm residual blocks, ReLU feed-forward
//                   • Linear projection to vocabulary logits
//   state.rs      — TrainingSettings / TrainingState
//   trainer.rs    — Epoch loop: loss, clipping, LR decay,
//                   held-out evaluation, best checkpoint
//   sampler.rs    — Autoregressive generation (argmax / temperature)
//   generator.rs  — PoemGenerator: compile, fit, predict
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// CPU / GPU backend selection
pub mod backend;

/// Causal attention mask
pub mod mask;

/// Sinusoidal positional encoding
pub mod positional;

/// Transformer encoder language model
pub mod model;

/// Typed hyperparameters and run state
pub mod state;

/// Training and evaluation loop
pub mod trainer;

/// Token-by-token text generation
pub mod sampler;

/// compile / fit / predict facade
pub mod generator;
