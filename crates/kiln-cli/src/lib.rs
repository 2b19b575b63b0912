//! Kiln CLI library - shared functionality for testing and binary.

pub mod report;

use clap::Args;
use kiln_runtime::{AllocatorKind, ContextConfig, DEFAULT_ENTRY, Device, VmInitParams};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Allocator selection for the VM's memory arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AllocatorArg {
    Naive,
    Pooled,
}

impl From<AllocatorArg> for AllocatorKind {
    fn from(arg: AllocatorArg) -> Self {
        match arg {
            AllocatorArg::Naive => AllocatorKind::Naive,
            AllocatorArg::Pooled => AllocatorKind::Pooled,
        }
    }
}

/// Options shared by every command that loads an artifact.
#[derive(Debug, Clone, Args)]
pub struct ContextArgs {
    /// Path to the compiled model artifact
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// CPU device ordinal
    #[arg(long, default_value = "0")]
    pub device_index: i32,

    /// Allocator for both the device and host-staging arenas
    #[arg(long, value_enum, default_value = "pooled")]
    pub allocator: AllocatorArg,

    /// Name of the computation entry function
    #[arg(long, default_value = DEFAULT_ENTRY)]
    pub entry: String,
}

impl ContextArgs {
    /// Artifact path, falling back to `default` when `--model` is absent.
    pub fn model_path(&self, default: &str) -> PathBuf {
        self.model.clone().unwrap_or_else(|| PathBuf::from(default))
    }

    pub fn context_config(&self) -> ContextConfig {
        let allocator = self.allocator.into();
        ContextConfig {
            init: VmInitParams {
                device: Device::cpu(self.device_index),
                allocator,
                host_device: Device::cpu(0),
                host_allocator: allocator,
            },
            entry: self.entry.clone(),
        }
    }
}

/// Log filter for the binary: `RUST_LOG` directives win, otherwise `-v`
/// picks the level (warn, info, debug).
pub fn log_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}
