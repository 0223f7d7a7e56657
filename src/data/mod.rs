// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From raw .txt files to tensor batches:
//
//   .txt files
//       │
//       ▼
//   PoemLoader        → reads files
//       │
//       ▼
//   Preprocessor      → cleans text, splits files into poems
//       │
//       ▼
//   PoemCorpus        → builds the vocabulary, encodes, windows
//       │
//       ▼
//   split_train_test  → seeded 80/20 split
//       │
//       ▼
//   SequenceDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   SequenceBatcher   → stacks windows into [batch, window] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads poem collections from a file or directory
pub mod loader;

/// Normalises text and splits files into poems
pub mod preprocessor;

/// Vocabulary + encoded windows (the dataset collaborator)
pub mod corpus;

/// Implements Burn's Dataset trait for sequence windows
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/test split
pub mod splitter;
