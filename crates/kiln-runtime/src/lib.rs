//! Single-shot inference runner for compiled model artifacts.
//!
//! This crate loads an opaque compiled model (a shared library exporting a
//! small VM protocol), binds flat `f32` buffer files as tensors, invokes the
//! model's entry function once, and reduces the output to a class label.
//!
//! # Architecture
//!
//! The pipeline is strictly linear:
//! 1. **Buffer loading** - read weight/input files into host memory
//! 2. **Execution context** - load the artifact, create and initialize its VM
//! 3. **Tensor binding** - allocate device tensors and copy host data in
//! 4. **Invocation and classification** - call the entry function, copy the
//!    output back and take the arg-max
//!
//! # Example
//!
//! ```no_run
//! use kiln_runtime::{ContextConfig, ExecutionContext, ModelConfig, Pipeline};
//!
//! fn main() -> Result<(), kiln_runtime::RuntimeError> {
//!     let mut context = ExecutionContext::load("./libtvm_model.so", ContextConfig::default())?;
//!     let pipeline = Pipeline::new(ModelConfig::cifar10("image.bin"))?;
//!
//!     let report = pipeline.run(&mut context)?;
//!     println!("Predicted label: {}", report.classification.label);
//!     Ok(())
//! }
//! ```

mod artifact;
mod buffer;
mod classify;
mod context;
mod device;
mod error;
mod model;
mod native;
mod pipeline;
mod tensor;

// Public exports
pub use artifact::{
    Artifact, DEFAULT_ENTRY, INITIALIZATION_SYMBOL, LOAD_EXECUTABLE_SYMBOL, VirtualMachine,
    VmInitParams,
};
pub use buffer::{HostBuffer, load_bin};
pub use classify::{
    CIFAR10_LABELS, Classification, Classifier, FASHION_MNIST_LABELS, LabelTable, argmax,
};
pub use context::{ContextConfig, ExecutionContext, Stage};
pub use device::{AllocatorKind, DLDataType, DLDevice, DLTensor, DataType, Device, DeviceKind};
pub use error::{Result, RuntimeError};
pub use model::{ModelConfig, TensorSource};
pub use native::NativeArtifact;
pub use pipeline::{InferenceReport, Pipeline};
pub use tensor::DeviceTensor;
