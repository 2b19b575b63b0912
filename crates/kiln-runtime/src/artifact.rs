//! The protocol a compiled model artifact must satisfy.
//!
//! An artifact is opaque to the runtime. All it has to offer is three
//! operations: produce a virtual machine from its executable, initialize
//! that VM's memory arenas for a device, and invoke a named function on
//! tensors. [`NativeArtifact`](crate::NativeArtifact) implements this over a
//! shared library; tests implement it in-process.

use crate::device::{AllocatorKind, Device};
use crate::error::Result;
use crate::tensor::DeviceTensor;

/// Name of the artifact export that yields a VM module.
pub const LOAD_EXECUTABLE_SYMBOL: &str = "vm_load_executable";

/// Name of the VM function that configures devices and allocators.
pub const INITIALIZATION_SYMBOL: &str = "vm_initialization";

/// Default computation entry point.
pub const DEFAULT_ENTRY: &str = "main";

/// Arguments to the VM's initialization function.
///
/// The VM keeps two arenas: one on the compute device and one on a
/// host-staging device. Each gets its own allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmInitParams {
    pub device: Device,
    pub allocator: AllocatorKind,
    pub host_device: Device,
    pub host_allocator: AllocatorKind,
}

impl Default for VmInitParams {
    fn default() -> Self {
        Self {
            device: Device::cpu(0),
            allocator: AllocatorKind::Pooled,
            host_device: Device::cpu(0),
            host_allocator: AllocatorKind::Pooled,
        }
    }
}

/// A loaded model artifact.
pub trait Artifact {
    /// Human-readable description, printed after loading.
    fn description(&self) -> String;

    /// Instantiate the artifact's executable as a virtual machine.
    ///
    /// # Errors
    /// [`RuntimeError::MissingEntryPointError`](crate::RuntimeError::MissingEntryPointError)
    /// if the artifact doesn't export [`LOAD_EXECUTABLE_SYMBOL`].
    fn load_executable(&self) -> Result<Box<dyn VirtualMachine>>;
}

/// A virtual machine instance created from an artifact.
///
/// Implementations are not required to be re-entrant; callers hold `&mut`
/// for both initialization and invocation.
pub trait VirtualMachine {
    /// Configure the VM's memory pools.
    ///
    /// # Errors
    /// [`RuntimeError::MissingEntryPointError`](crate::RuntimeError::MissingEntryPointError)
    /// if the VM has no [`INITIALIZATION_SYMBOL`] function.
    fn initialize(&mut self, params: &VmInitParams) -> Result<()>;

    /// Whether a function named `name` can be invoked.
    fn has_function(&self, name: &str) -> bool;

    /// Run `name` synchronously with positional `args`, writing the result
    /// into the preallocated `output`.
    fn invoke(&mut self, name: &str, args: &[&DeviceTensor], output: &mut DeviceTensor)
    -> Result<()>;
}
