// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and delegates the work to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — trains the model, checkpointing every 5 epochs
//   2. `evaluate` — reloads a checkpoint and reports loss + AUC
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "image-classifier-trainer",
    version = "0.1.0",
    about = "Train a pixel-wise image classifier with Burn, then evaluate its checkpoints."
)]
pub struct Cli {
    /// The subcommand to run (train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = args.into_config()?;
    tracing::info!("Starting training for {} epochs", config.epochs);

    let report = TrainUseCase::new(config).execute()?;

    match report.last() {
        Some(last) => println!("Training complete. Final val loss: {:.4}", last.val_loss),
        None       => println!("Training complete. No epochs were run."),
    }
    if !report.checkpoint_failures.is_empty() {
        println!("{} checkpoint(s) could not be written; see the log.", report.checkpoint_failures.len());
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::new(&args.dir_checkpoint, args.epoch, args.cpu);
    let report = use_case.execute()?;
    println!("{}", report.summary_line());
    Ok(())
}
