//! One forward pass from buffer files to a predicted label.

use crate::buffer::HostBuffer;
use crate::classify::{Classification, Classifier};
use crate::context::{ExecutionContext, Stage};
use crate::error::{Result, RuntimeError};
use crate::model::ModelConfig;
use crate::tensor::DeviceTensor;
use std::time::Duration;

/// Result of a single inference call.
#[derive(Debug, Clone)]
pub struct InferenceReport {
    /// Raw scores, one per label.
    pub output: Vec<f32>,
    pub classification: Classification,
    /// Wall-clock time spent inside the entry function.
    pub elapsed: Duration,
}

/// Runs a [`ModelConfig`] against an [`ExecutionContext`].
pub struct Pipeline {
    model: ModelConfig,
    classifier: Classifier,
}

impl Pipeline {
    /// # Errors
    /// [`RuntimeError::ConfigError`] if the label table doesn't match the output.
    pub fn new(model: ModelConfig) -> Result<Self> {
        model.validate()?;
        let classifier = Classifier::new(model.labels.clone());
        Ok(Self { model, classifier })
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Load every input and parameter file.
    ///
    /// Size mismatches are tolerated (see [`load_bin`](crate::load_bin)); a
    /// missing file aborts.
    pub fn load_buffers(&self) -> Result<Vec<HostBuffer>> {
        self.model
            .sources()
            .map(|source| {
                tracing::debug!(name = %source.name, path = %source.path.display(), "Loading buffer");
                HostBuffer::load(&source.path, &source.shape)
            })
            .collect()
    }

    /// Load buffers from disk, then run.
    pub fn run(&self, context: &mut ExecutionContext) -> Result<InferenceReport> {
        let buffers = self.load_buffers()?;
        self.run_with_buffers(context, &buffers)
    }

    /// Run with host buffers already in memory, one per source in argument
    /// order.
    pub fn run_with_buffers(
        &self,
        context: &mut ExecutionContext,
        buffers: &[HostBuffer],
    ) -> Result<InferenceReport> {
        context.begin_run();
        let args = self.bind(context, buffers)?;
        context.advance(Stage::InputBound);

        let mut output = context.empty(&self.model.output_shape);
        let arg_refs: Vec<&DeviceTensor> = args.iter().collect();
        let elapsed = context.invoke(&arg_refs, &mut output)?;

        let scores = output.copy_to_host(self.classifier.labels().len())?;
        context.advance(Stage::OutputHarvested);

        let classification = self.classifier.classify(&scores)?;
        context.advance(Stage::Classified);
        tracing::info!(
            index = classification.index,
            value = classification.value,
            label = %classification.label,
            "Classified"
        );

        Ok(InferenceReport {
            output: scores,
            classification,
            elapsed,
        })
    }

    /// Allocate fresh device tensors and copy each host buffer in.
    pub fn bind(
        &self,
        context: &ExecutionContext,
        buffers: &[HostBuffer],
    ) -> Result<Vec<DeviceTensor>> {
        let sources: Vec<_> = self.model.sources().collect();
        if buffers.len() != sources.len() {
            return Err(RuntimeError::TensorError(format!(
                "Model '{}' takes {} tensors but {} buffers were supplied",
                self.model.name,
                sources.len(),
                buffers.len()
            )));
        }

        sources
            .iter()
            .zip(buffers)
            .map(|(source, buffer)| {
                let mut tensor = context.empty(&source.shape);
                tensor.copy_from_host(buffer).map_err(|e| {
                    RuntimeError::TensorError(format!("Failed to bind '{}': {e}", source.name))
                })?;
                Ok(tensor)
            })
            .collect()
    }
}
