//! Common test utilities for pipeline integration tests.
//!
//! Provides an in-process artifact that implements the VM protocol in Rust,
//! plus helpers for writing buffer files.

#![allow(dead_code)]

use kiln_runtime::{
    Artifact, DEFAULT_ENTRY, DeviceTensor, INITIALIZATION_SYMBOL, LOAD_EXECUTABLE_SYMBOL, Result,
    RuntimeError, VirtualMachine, VmInitParams,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type Forward = Rc<dyn Fn(&[&DeviceTensor], &mut DeviceTensor) -> Result<()>>;

/// What the mock VM observed.
#[derive(Debug, Default)]
pub struct CallLog {
    pub init: Vec<VmInitParams>,
    /// Argument shapes of every invocation.
    pub invocations: Vec<Vec<Vec<i64>>>,
}

/// Artifact whose entry function is a Rust closure.
pub struct MockArtifact {
    missing: HashSet<&'static str>,
    forward: Forward,
    pub log: Rc<RefCell<CallLog>>,
}

impl MockArtifact {
    pub fn new(
        forward: impl Fn(&[&DeviceTensor], &mut DeviceTensor) -> Result<()> + 'static,
    ) -> Self {
        Self {
            missing: HashSet::new(),
            forward: Rc::new(forward),
            log: Rc::new(RefCell::new(CallLog::default())),
        }
    }

    /// Entry function that always produces `values`.
    pub fn constant(values: Vec<f32>) -> Self {
        Self::new(move |_, out| out.copy_from_slice(&values))
    }

    /// Entry function that copies the leading input elements to the output.
    pub fn echo() -> Self {
        Self::new(|args, out| {
            let n = out.len();
            out.as_mut_slice()
                .copy_from_slice(&args[0].as_slice()[..n]);
            Ok(())
        })
    }

    /// Two-layer linear/ReLU network: `relu(x W0^T + b0) W1^T + b1`.
    pub fn linear_relu() -> Self {
        Self::new(|args, out| {
            let [x, w0, b0, w1, b1] = args else {
                return Err(RuntimeError::InvocationError(format!(
                    "expected 5 arguments, got {}",
                    args.len()
                )));
            };
            let hidden = linear(x.as_slice(), w0.as_slice(), b0.as_slice())
                .into_iter()
                .map(|v| v.max(0.0))
                .collect::<Vec<_>>();
            let logits = linear(&hidden, w1.as_slice(), b1.as_slice());
            out.copy_from_slice(&logits)
        })
    }

    /// Drop one of the protocol functions from the artifact.
    pub fn without(mut self, symbol: &'static str) -> Self {
        self.missing.insert(symbol);
        self
    }
}

fn linear(x: &[f32], weight: &[f32], bias: &[f32]) -> Vec<f32> {
    let in_features = x.len();
    bias.iter()
        .enumerate()
        .map(|(row, b)| {
            let w = &weight[row * in_features..(row + 1) * in_features];
            b + w.iter().zip(x).map(|(w, x)| w * x).sum::<f32>()
        })
        .collect()
}

impl Artifact for MockArtifact {
    fn description(&self) -> String {
        "Module(type_key=mock)".to_string()
    }

    fn load_executable(&self) -> Result<Box<dyn VirtualMachine>> {
        if self.missing.contains(LOAD_EXECUTABLE_SYMBOL) {
            return Err(RuntimeError::MissingEntryPointError {
                symbol: LOAD_EXECUTABLE_SYMBOL.to_string(),
                module: self.description(),
            });
        }
        Ok(Box::new(MockVm {
            missing: self.missing.clone(),
            forward: Rc::clone(&self.forward),
            log: Rc::clone(&self.log),
        }))
    }
}

struct MockVm {
    missing: HashSet<&'static str>,
    forward: Forward,
    log: Rc<RefCell<CallLog>>,
}

impl VirtualMachine for MockVm {
    fn initialize(&mut self, params: &VmInitParams) -> Result<()> {
        if self.missing.contains(INITIALIZATION_SYMBOL) {
            return Err(RuntimeError::MissingEntryPointError {
                symbol: INITIALIZATION_SYMBOL.to_string(),
                module: "mock vm".to_string(),
            });
        }
        self.log.borrow_mut().init.push(*params);
        Ok(())
    }

    fn has_function(&self, name: &str) -> bool {
        name == DEFAULT_ENTRY && !self.missing.contains(DEFAULT_ENTRY)
    }

    fn invoke(
        &mut self,
        name: &str,
        args: &[&DeviceTensor],
        output: &mut DeviceTensor,
    ) -> Result<()> {
        if !self.has_function(name) {
            return Err(RuntimeError::MissingEntryPointError {
                symbol: name.to_string(),
                module: "mock vm".to_string(),
            });
        }
        self.log
            .borrow_mut()
            .invocations
            .push(args.iter().map(|t| t.shape().to_vec()).collect());
        (self.forward)(args, output)
    }
}

/// Route pipeline logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Write little-endian floats to `path`.
pub fn write_floats(path: &Path, values: &[f32]) {
    let mut file = std::fs::File::create(path).unwrap();
    for v in values {
        file.write_all(&v.to_le_bytes()).unwrap();
    }
}

/// Ten single-letter labels, "A" through "J".
pub fn letter_labels() -> kiln_runtime::LabelTable {
    kiln_runtime::LabelTable::new(["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"])
}

/// Path of a C fixture artifact built by `build.rs`, if the build produced it.
pub fn native_fixture(variant: &str) -> Option<PathBuf> {
    let dir = option_env!("KILN_FIXTURE_DIR")?;
    let path = Path::new(dir).join(format!(
        "{}kiln_fixture_{variant}{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    ));
    path.exists().then_some(path)
}
