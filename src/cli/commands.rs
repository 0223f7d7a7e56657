// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `generate`, and all
// their configurable flags.
//
// clap's derive macros generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    generate_use_case::GenerateConfig,
    train_use_case::TrainConfig,
};
use crate::ml::state::OptimizerKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the poem model on a directory (or file) of .txt poems
    Train(TrainArgs),

    /// Generate text from a trained checkpoint
    Generate(GenerateArgs),
}

/// Where tensors live for the whole run.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendChoice {
    /// NdArray on the CPU
    Cpu,
    /// WGPU (Vulkan / Metal / DX12)
    Gpu,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizerChoice {
    Sgd,
    Adam,
}

impl From<OptimizerChoice> for OptimizerKind {
    fn from(choice: OptimizerChoice) -> Self {
        match choice {
            OptimizerChoice::Sgd  => OptimizerKind::Sgd,
            OptimizerChoice::Adam => OptimizerKind::Adam,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory of .txt files (or a single file); poems are separated
    /// by two or more blank lines
    #[arg(long, default_value = "data/poems")]
    pub corpus: String,

    /// Directory for the checkpoint and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Characters per training window
    #[arg(long, default_value_t = 35)]
    pub seq_len: usize,

    /// Windows per batch
    #[arg(long, default_value_t = 30)]
    pub batch_size: usize,

    /// Total epochs (a resumed run continues up to this count)
    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 5.0)]
    pub lr: f64,

    /// Learning rate multiplier applied after every epoch
    #[arg(long, default_value_t = 0.95)]
    pub lr_decay: f64,

    /// Gradient norm clipping threshold
    #[arg(long, default_value_t = 0.5)]
    pub grad_clip: f32,

    /// Width of token embeddings (d_model); must be divisible by num_heads
    #[arg(long, default_value_t = 200)]
    pub embedding_dim: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Inner width of each feed-forward block
    #[arg(long, default_value_t = 256)]
    pub hidden_dim: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, value_enum, default_value_t = OptimizerChoice::Sgd)]
    pub optimizer: OptimizerChoice,

    /// Cross-entropy label smoothing in [0, 1)
    #[arg(long)]
    pub label_smoothing: Option<f32>,

    /// Seed for the train/test split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub shuffle_seed: u64,

    /// Compute backend; without it the GPU is used when an adapter is found
    #[arg(long, value_enum)]
    pub backend: Option<BackendChoice>,

    /// Start fresh even if the checkpoint directory holds a checkpoint
    #[arg(long)]
    pub no_resume: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus_path:     a.corpus,
            checkpoint_dir:  a.checkpoint_dir,
            seq_len:         a.seq_len,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            lr_decay:        a.lr_decay,
            grad_clip:       a.grad_clip,
            embedding_dim:   a.embedding_dim,
            num_heads:       a.num_heads,
            hidden_dim:      a.hidden_dim,
            num_layers:      a.num_layers,
            dropout:         a.dropout,
            optimizer:       a.optimizer.into(),
            label_smoothing: a.label_smoothing,
            shuffle_seed:    a.shuffle_seed,
            resume:          !a.no_resume,
        }
    }
}

/// All arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory where training saved its checkpoint
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Text to continue; empty starts a new poem
    #[arg(long, default_value = "")]
    pub seed_text: String,

    /// Maximum number of characters to generate
    #[arg(long, default_value_t = 200)]
    pub length: usize,

    /// 0 picks the most likely character every step
    #[arg(long, default_value_t = 0.8)]
    pub temperature: f32,

    /// Longest context fed back into the model per step
    #[arg(long, default_value_t = 35)]
    pub context_window: usize,

    /// Fixed seed for reproducible sampling
    #[arg(long)]
    pub rng_seed: Option<u64>,

    /// Compute backend; without it the GPU is used when an adapter is found
    #[arg(long, value_enum)]
    pub backend: Option<BackendChoice>,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            checkpoint_dir: a.checkpoint_dir,
            seed_text:      a.seed_text,
            length:         a.length,
            temperature:    a.temperature,
            context_window: a.context_window,
            rng_seed:       a.rng_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["poem-generator", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(args.backend, None);
        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();
        assert_eq!(cfg.seq_len, def.seq_len);
        assert_eq!(cfg.lr, def.lr);
        assert_eq!(cfg.embedding_dim, def.embedding_dim);
        assert!(cfg.resume);
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::try_parse_from([
            "poem-generator", "generate",
            "--seed-text", "Roses",
            "--temperature", "0",
            "--rng-seed", "7",
            "--backend", "cpu",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else { panic!("expected generate") };
        assert_eq!(args.backend, Some(BackendChoice::Cpu));
        let cfg: GenerateConfig = args.into();
        assert_eq!(cfg.seed_text, "Roses");
        assert_eq!(cfg.rng_seed, Some(7));
        assert_eq!(cfg.temperature, 0.0);
    }

    #[test]
    fn test_optimizer_and_no_resume() {
        let cli = Cli::try_parse_from([
            "poem-generator", "train", "--optimizer", "adam", "--no-resume",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.optimizer, OptimizerKind::Adam);
        assert!(!cfg.resume);
    }
}
