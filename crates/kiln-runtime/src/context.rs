//! Execution context: a loaded, initialized VM bound to one device.

use crate::artifact::{Artifact, DEFAULT_ENTRY, VirtualMachine, VmInitParams};
use crate::device::Device;
use crate::error::{Result, RuntimeError};
use crate::native::NativeArtifact;
use crate::tensor::DeviceTensor;
use std::path::Path;
use std::time::{Duration, Instant};

/// Progress of a single process-wide inference run.
///
/// Within one run stages only move forward. Failures before
/// [`Stage::VmInitialized`] are fatal; later stages assume everything before
/// them succeeded. A context that runs again rewinds to
/// [`Stage::VmInitialized`] when the next run begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Uninitialized,
    ModuleLoaded,
    VmCreated,
    VmInitialized,
    InputBound,
    Invoked,
    OutputHarvested,
    Classified,
}

/// Device, allocator and entry point selection for a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub init: VmInitParams,
    /// Name of the computation entry point.
    pub entry: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            init: VmInitParams::default(),
            entry: DEFAULT_ENTRY.to_string(),
        }
    }
}

/// Main entry point for running a compiled artifact.
///
/// Owns the VM created from the artifact. Construction performs the whole
/// setup sequence (load executable, initialize, resolve entry) and either
/// yields a context ready to invoke or a fatal error.
///
/// # Example
/// ```no_run
/// use kiln_runtime::{ContextConfig, ExecutionContext};
///
/// let context = ExecutionContext::load("./libtvm_model.so", ContextConfig::default())?;
/// println!("{}", context.description());
/// # Ok::<(), kiln_runtime::RuntimeError>(())
/// ```
pub struct ExecutionContext {
    vm: Box<dyn VirtualMachine>,
    config: ContextConfig,
    description: String,
    stage: Stage,
}

impl ExecutionContext {
    /// Load a shared-library artifact from disk and set up its VM.
    ///
    /// # Errors
    /// [`RuntimeError::ModuleLoadError`] if the artifact can't be loaded and
    /// [`RuntimeError::MissingEntryPointError`] if any required function is absent.
    pub fn load(path: impl AsRef<Path>, config: ContextConfig) -> Result<Self> {
        let artifact = NativeArtifact::open(path)?;
        Self::from_artifact(&artifact, config)
    }

    /// Set up a VM from any artifact implementation.
    #[tracing::instrument(skip_all, fields(device = %config.init.device, entry = %config.entry))]
    pub fn from_artifact(artifact: &dyn Artifact, config: ContextConfig) -> Result<Self> {
        let description = artifact.description();
        tracing::debug!(stage = ?Stage::ModuleLoaded, %description);

        let mut vm = artifact.load_executable()?;
        tracing::debug!(stage = ?Stage::VmCreated);

        vm.initialize(&config.init)?;
        tracing::debug!(
            stage = ?Stage::VmInitialized,
            allocator = ?config.init.allocator,
            host_allocator = ?config.init.host_allocator
        );

        if !vm.has_function(&config.entry) {
            return Err(RuntimeError::MissingEntryPointError {
                symbol: config.entry.clone(),
                module: description,
            });
        }

        tracing::info!(entry = %config.entry, "Execution context ready");

        Ok(Self {
            vm,
            config,
            description,
            stage: Stage::VmInitialized,
        })
    }

    /// Allocate a zeroed `f32` tensor on this context's device.
    pub fn empty(&self, shape: &[usize]) -> DeviceTensor {
        DeviceTensor::empty(shape, self.device())
    }

    /// Invoke the entry function once, blocking until it returns.
    ///
    /// Returns the wall-clock duration of the call.
    #[tracing::instrument(skip_all, fields(entry = %self.config.entry, num_args = args.len()))]
    pub fn invoke(&mut self, args: &[&DeviceTensor], output: &mut DeviceTensor) -> Result<Duration> {
        let start = Instant::now();
        self.vm.invoke(&self.config.entry, args, output)?;
        let elapsed = start.elapsed();

        self.advance(Stage::Invoked);
        tracing::debug!(elapsed_us = elapsed.as_micros() as u64, "Entry function returned");
        Ok(elapsed)
    }

    /// Rewind to [`Stage::VmInitialized`] for a new run on the same VM.
    pub(crate) fn begin_run(&mut self) {
        if self.stage != Stage::VmInitialized {
            tracing::debug!(from = ?self.stage, "Starting a new run");
            self.stage = Stage::VmInitialized;
        }
    }

    pub(crate) fn advance(&mut self, stage: Stage) {
        tracing::debug!(from = ?self.stage, to = ?stage, "Stage transition");
        self.stage = stage;
    }

    pub fn device(&self) -> Device {
        self.config.init.device
    }

    pub fn entry(&self) -> &str {
        &self.config.entry
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Artifact description captured at load time.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}
