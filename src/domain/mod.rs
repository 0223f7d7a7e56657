// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define what the
// system works with. No Burn types and no file I/O here.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A poem loaded from disk
pub mod document;

// Error taxonomy shared by every layer below the CLI
pub mod error;

// A fixed-size window of token ids with its shifted target
pub mod sequence;

// Core abstractions (traits) that other layers implement
pub mod traits;

// Character ↔ index codec
pub mod vocabulary;
