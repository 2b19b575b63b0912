//! Arg-max classification over a model's output vector.

use crate::error::{Result, RuntimeError};
use std::fmt;
use std::path::Path;

/// Fashion-MNIST class names, in output order.
pub const FASHION_MNIST_LABELS: [&str; 10] = [
    "T-shirt/top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle boot",
];

/// CIFAR-10 class names, in output order.
pub const CIFAR10_LABELS: [&str; 10] = [
    "plane", "car", "bird", "cat", "deer", "dog", "frog", "horse", "ship", "truck",
];

/// Ordered class names; position `i` names output element `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Read a label file with one label per line. Blank lines are skipped.
    ///
    /// # Errors
    /// [`RuntimeError::IoError`] if the file can't be read,
    /// [`RuntimeError::ConfigError`] if it contains no labels.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RuntimeError::io(path, e))?;
        let table = Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        );
        if table.is_empty() {
            return Err(RuntimeError::ConfigError(format!(
                "Label file {} contains no labels",
                path.display()
            )));
        }
        Ok(table)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// Predicted class for one output vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub index: usize,
    pub value: f32,
    pub label: String,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} at index {})", self.label, self.value, self.index)
    }
}

/// Maps output vectors to labels.
#[derive(Debug, Clone)]
pub struct Classifier {
    labels: LabelTable,
}

impl Classifier {
    pub fn new(labels: LabelTable) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Classify an output vector of exactly `labels.len()` scores.
    ///
    /// # Errors
    /// [`RuntimeError::ConfigError`] if the output length differs from the label
    /// count, which means the label table doesn't belong to this model.
    pub fn classify(&self, output: &[f32]) -> Result<Classification> {
        if output.len() != self.labels.len() || output.is_empty() {
            return Err(RuntimeError::ConfigError(format!(
                "Output has {} elements but the label table has {} entries",
                output.len(),
                self.labels.len()
            )));
        }

        let (index, value) = argmax(output).ok_or_else(|| {
            RuntimeError::ConfigError("Cannot classify an empty output".to_string())
        })?;
        let label = self
            .labels
            .get(index)
            .ok_or_else(|| RuntimeError::ConfigError(format!("No label for index {index}")))?;

        Ok(Classification {
            index,
            value,
            label: label.to_string(),
        })
    }
}

/// Index and value of the largest element.
///
/// Ties resolve to the lowest index. Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let (&first, rest) = values.split_first()?;
    let mut best = (0, first);
    for (i, &v) in rest.iter().enumerate() {
        if v > best.1 {
            best = (i + 1, v);
        }
    }
    Some(best)
}
