//! Kiln CLI - run compiled classification models on flat buffer files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kiln_cli::ContextArgs;
use kiln_cli::report;
use kiln_runtime::{ExecutionContext, LabelTable, ModelConfig, Pipeline};
use std::path::PathBuf;

const FASHION_MNIST_ARTIFACT: &str = "./linear_relu_mnist.so";
const CIFAR10_ARTIFACT: &str = "./libtvm_model.so";

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Single-shot classifier for compiled model artifacts", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify with the linear/ReLU Fashion-MNIST model and explicit weights
    FashionMnist {
        /// Directory holding input_img.bin, w0.bin, b0.bin, w1.bin and b1.bin
        #[arg(short, long, value_name = "DIR", default_value = "weights")]
        weights_dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Classify a 1x3x32x32 image with the CIFAR-10 model
    Cifar10 {
        /// Flat f32 image file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Load an artifact and check that its entry points resolve
    Inspect {
        #[command(flatten)]
        context: ContextArgs,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    #[command(flatten)]
    context: ContextArgs,

    /// Label file, one label per line (overrides the built-in table)
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// Report how long the entry function took
    #[arg(long)]
    time: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::FashionMnist { weights_dir, run } => {
            cmd_classify(
                ModelConfig::fashion_mnist(weights_dir),
                FASHION_MNIST_ARTIFACT,
                run,
            )?;
        }
        Commands::Cifar10 { input, run } => {
            cmd_classify(ModelConfig::cifar10(input), CIFAR10_ARTIFACT, run)?;
        }
        Commands::Inspect { context } => {
            cmd_inspect(context)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(kiln_cli::log_filter(verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

/// Run one forward pass and print the prediction.
fn cmd_classify(mut model: ModelConfig, default_artifact: &str, run: RunArgs) -> Result<()> {
    if let Some(path) = &run.labels {
        let labels = LabelTable::from_file(path)
            .with_context(|| format!("Failed to read labels from {}", path.display()))?;
        model = model.with_labels(labels);
    }
    let pipeline = Pipeline::new(model).context("Invalid model configuration")?;

    let model_path = run.context.model_path(default_artifact);
    tracing::info!(model = %pipeline.model().name, path = %model_path.display(), "Loading artifact");
    let mut context = ExecutionContext::load(&model_path, run.context.context_config())
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;
    println!("{}", context.description());

    let report = pipeline
        .run(&mut context)
        .with_context(|| format!("Inference with '{}' failed", pipeline.model().name))?;
    print!("{}", report::render(&report, run.time));

    Ok(())
}

/// Load an artifact and report what resolves.
fn cmd_inspect(args: ContextArgs) -> Result<()> {
    let model_path = args.model_path(CIFAR10_ARTIFACT);
    tracing::debug!(path = %model_path.display(), "Inspecting artifact");
    let context = ExecutionContext::load(&model_path, args.context_config())
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

    println!("{}", context.description());
    println!("  Device: {}", context.device());
    println!("  Allocator: {:?}", context.config().init.allocator);
    println!("  Entry: {} (resolved)", context.entry());

    Ok(())
}
