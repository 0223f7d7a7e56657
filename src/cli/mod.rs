// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap, picks the compute backend, and hands off to Layer 2.
// Without --backend the GPU is checked once and the CPU is used
// when no adapter answers.
//
// Two commands are supported:
//   1. `train`    — trains the model on a poem corpus
//   2. `generate` — loads a checkpoint and writes a poem
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BackendChoice, Commands, GenerateArgs, TrainArgs};

use crate::application::{
    generate_use_case::GenerateUseCase,
    train_use_case::TrainUseCase,
};
use crate::ml::backend::{ComputeBackend, CpuBackend};

#[derive(Parser, Debug)]
#[command(
    name = "poem-generator",
    version,
    about = "Train a character-level transformer on poems, then generate new ones."
)]
pub struct Cli {
    /// The subcommand to run (train or generate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case on the chosen backend.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => match resolve_backend(args.backend, gpu::is_available) {
                BackendChoice::Cpu => run_train::<CpuBackend>(args),
                BackendChoice::Gpu => gpu::train(args),
            },
            Commands::Generate(args) => match resolve_backend(args.backend, gpu::is_available) {
                BackendChoice::Cpu => run_generate::<CpuBackend>(args),
                BackendChoice::Gpu => gpu::generate(args),
            },
        }
    }
}

/// An explicit --backend wins; otherwise GPU if `gpu_available` says so.
fn resolve_backend(
    requested:     Option<BackendChoice>,
    gpu_available: impl FnOnce() -> bool,
) -> BackendChoice {
    if let Some(choice) = requested {
        return choice;
    }
    if gpu_available() {
        BackendChoice::Gpu
    } else {
        tracing::info!("No GPU available, falling back to the CPU backend");
        BackendChoice::Cpu
    }
}

fn run_train<C: ComputeBackend>(args: TrainArgs) -> Result<()> {
    tracing::info!("Training on '{}' with backend {}", args.corpus, C::name());

    let checkpoint_dir = args.checkpoint_dir.clone();
    let state = TrainUseCase::new(args.into()).execute::<C>()?;

    println!(
        "Training complete: {} epochs, best loss {:.4}. Checkpoint in '{}'.",
        state.epoch_now, state.best_loss, checkpoint_dir
    );
    Ok(())
}

fn run_generate<C: ComputeBackend>(args: GenerateArgs) -> Result<()> {
    tracing::info!("Generating from '{}' with backend {}", args.checkpoint_dir, C::name());

    let text = GenerateUseCase::new(args.into()).execute::<C>()?;
    println!("{text}");
    Ok(())
}

#[cfg(feature = "wgpu")]
mod gpu {
    use super::*;
    use crate::ml::backend::GpuBackend;

    pub fn is_available() -> bool {
        GpuBackend::is_available()
    }

    pub fn train(args: TrainArgs) -> Result<()> {
        run_train::<GpuBackend>(args)
    }

    pub fn generate(args: GenerateArgs) -> Result<()> {
        run_generate::<GpuBackend>(args)
    }
}

#[cfg(not(feature = "wgpu"))]
mod gpu {
    use super::*;

    pub fn is_available() -> bool {
        false
    }

    pub fn train(_args: TrainArgs) -> Result<()> {
        anyhow::bail!("this binary was built without the `wgpu` feature; use --backend cpu")
    }

    pub fn generate(_args: GenerateArgs) -> Result<()> {
        anyhow::bail!("this binary was built without the `wgpu` feature; use --backend cpu")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_backend_skips_the_gpu_check() {
        let gpu_check = || -> bool { panic!("GPU check must not run") };
        assert_eq!(resolve_backend(Some(BackendChoice::Cpu), gpu_check), BackendChoice::Cpu);
        assert_eq!(resolve_backend(Some(BackendChoice::Gpu), gpu_check), BackendChoice::Gpu);
    }

    #[test]
    fn test_missing_gpu_falls_back_to_cpu() {
        assert_eq!(resolve_backend(None, || false), BackendChoice::Cpu);
        assert_eq!(resolve_backend(None, || true), BackendChoice::Gpu);
    }
}
