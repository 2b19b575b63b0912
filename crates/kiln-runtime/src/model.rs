//! Static description of a model's tensors and labels.

use crate::classify::{CIFAR10_LABELS, FASHION_MNIST_LABELS, LabelTable};
use crate::error::{Result, RuntimeError};
use std::path::{Path, PathBuf};

/// A tensor read from a flat `f32` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSource {
    pub name: String,
    pub path: PathBuf,
    pub shape: Vec<usize>,
}

impl TensorSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            shape: shape.to_vec(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Everything needed to bind and classify one forward pass.
///
/// Parameters are passed to the entry function after the input, in the
/// order listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub name: String,
    pub input: TensorSource,
    pub params: Vec<TensorSource>,
    pub output_shape: Vec<usize>,
    pub labels: LabelTable,
}

impl ModelConfig {
    /// Two-layer linear/ReLU classifier with weights supplied at call time.
    pub fn fashion_mnist(weights_dir: impl AsRef<Path>) -> Self {
        let dir = weights_dir.as_ref();
        Self {
            name: "fashion-mnist".to_string(),
            input: TensorSource::new("input_img", dir.join("input_img.bin"), &[1, 784]),
            params: vec![
                TensorSource::new("w0", dir.join("w0.bin"), &[128, 784]),
                TensorSource::new("b0", dir.join("b0.bin"), &[128]),
                TensorSource::new("w1", dir.join("w1.bin"), &[10, 128]),
                TensorSource::new("b1", dir.join("b1.bin"), &[10]),
            ],
            output_shape: vec![1, 10],
            labels: LabelTable::new(FASHION_MNIST_LABELS),
        }
    }

    /// Image classifier with weights baked into the artifact.
    pub fn cifar10(input: impl Into<PathBuf>) -> Self {
        Self {
            name: "cifar10".to_string(),
            input: TensorSource::new("input_img", input, &[1, 3, 32, 32]),
            params: Vec::new(),
            output_shape: vec![1, 10],
            labels: LabelTable::new(CIFAR10_LABELS),
        }
    }

    pub fn with_labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    pub fn output_len(&self) -> usize {
        self.output_shape.iter().product()
    }

    /// Input followed by parameters, in argument order.
    pub fn sources(&self) -> impl Iterator<Item = &TensorSource> {
        std::iter::once(&self.input).chain(&self.params)
    }

    /// Check that the label table covers the output exactly.
    pub fn validate(&self) -> Result<()> {
        if self.output_len() == 0 {
            return Err(RuntimeError::ConfigError(format!(
                "Model '{}' has an empty output shape {:?}",
                self.name, self.output_shape
            )));
        }
        if self.labels.len() != self.output_len() {
            return Err(RuntimeError::ConfigError(format!(
                "Model '{}' produces {} scores but has {} labels",
                self.name,
                self.output_len(),
                self.labels.len()
            )));
        }
        Ok(())
    }
}
