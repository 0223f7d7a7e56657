// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting file I/O used by the training loop and the
// generation path:
//
//   checkpoint.rs — Model + optimizer records (full-precision
//                   NamedMpkGzFileRecorder) and checkpoint.json
//                   metadata (epoch, best loss, learning rate,
//                   model config, vocabulary). Atomic writes.
//
//   metrics.rs    — Epoch-level metrics (train/test loss,
//                   learning rate) appended to a CSV file for
//                   later analysis and plotting.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
