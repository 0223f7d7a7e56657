// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// user goal (training or generating).
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No argument parsing or printing here (that's Layer 1)
//   - Only workflow coordination and error context
//
// Use cases are generic over ComputeBackend; the CLI picks the
// concrete backend once.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// The text generation workflow
pub mod generate_use_case;
