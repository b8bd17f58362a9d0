//! Utilities for training neural networks.

use crate::error::{Error, Result};
use crate::network::Network;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Number of samples averaged into one update unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Where the network is checkpointed unless configured otherwise.
pub const DEFAULT_CHECKPOINT: &str = "neural_network_save";

/// Makes a model trainable using mini-batch gradient descent.
pub trait Trainable {
    /// Length of every input vector.
    fn input_len(&self) -> usize;

    /// Length of every target vector.
    fn output_len(&self) -> usize;

    /// Number of epochs completed so far.
    fn epoch(&self) -> u32;

    /// Zeroes the gradient accumulators before a batch.
    fn reset_gradients(&mut self);

    /// Using the provided training example, accumulate gradients. Returns
    /// the mean square error for the example prediction.
    fn accumulate_gradient(&mut self, input: &[f32], target: &[f32]) -> Result<f32>;

    /// Applies the accumulated gradients, averaged over `batch_size`
    /// examples and scaled by the gradient descent `rate`.
    fn apply_gradient(&mut self, batch_size: usize, rate: f32) -> Result<()>;

    /// Marks an epoch as completed, returning the new total.
    fn finish_epoch(&mut self) -> u32;

    /// Persists the model to `path`.
    fn checkpoint(&self, path: &Path) -> Result<()>;
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` epochs, and at completion
    Epochs(usize),
}

impl Logging {
    /// Performs logging at the end of an epoch.
    fn epoch(&self, epoch: u32, epochs: u32, total: u32, training_error: f32) {
        if let Logging::Epochs(freq) = *self {
            if freq > 0 && epoch as usize % freq == 0 {
                info!(
                    "Epoch(s) trained: {epoch} / {epochs} (total epochs: {total}), MSE={training_error}"
                );
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, report: &TrainReport, start_time: Instant) {
        if let Logging::Silent = self {
            return;
        }
        info!(
            "Ran {} epochs in {:.2} seconds, final MSE: {}",
            report.epochs,
            start_time.elapsed().as_secs_f64(),
            report.mean_square_error
        );
    }
}

/// Whether to persist the model after every epoch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Disabled,
    Path(PathBuf),
}

impl Default for Checkpoint {
    fn default() -> Self {
        Checkpoint::Path(PathBuf::from(DEFAULT_CHECKPOINT))
    }
}

/// What happened during a call to `Trainer::train`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrainReport {
    /// Epochs run by this call.
    pub epochs: u32,
    /// The model's epoch counter once training finished.
    pub total_epochs: u32,
    /// Gradient updates applied by this call.
    pub batches: usize,
    /// Mean of the per example squared error over the final epoch.
    pub mean_square_error: f32,
}

/// Trains a model with mini-batch gradient descent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trainer {
    batch_size: usize,
    learning_rate: f32,
    epochs: u32,
    logging: Logging,
    checkpoint: Checkpoint,
}

impl Default for Trainer {
    fn default() -> Self {
        Trainer::new()
    }
}

impl Trainer {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * Batches of 64 examples.
    /// * A learning rate of 0.1.
    /// * A single epoch.
    /// * Logs after every epoch.
    /// * Checkpoints to `neural_network_save` after every epoch.
    pub fn new() -> Self {
        Trainer {
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: 0.1,
            epochs: 1,
            logging: Logging::Epochs(1),
            checkpoint: Checkpoint::default(),
        }
    }

    /// Sets the number of examples averaged into each update.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the learning rate to use during gradient descent.
    pub fn learning_rate(mut self, rate: f32) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Sets the number of passes over the training set.
    pub fn epochs(mut self, epochs: u32) -> Self {
        self.epochs = epochs;
        self
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Sets where the model is persisted after every epoch.
    pub fn checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Trains `model` in place using the provided labelled data.
    ///
    /// `inputs[i]` is paired with `targets[i]`. Every epoch walks the data in
    /// order in batches of `batch_size`; the last batch holds whatever is
    /// left over. After each epoch the model's epoch counter is incremented
    /// and, unless disabled, the model is checkpointed.
    ///
    /// Returns:
    ///   A report of the run, or an error if invalid training data was
    ///   provided or a checkpoint could not be written.
    pub fn train<T, I, O>(&self, model: &mut T, inputs: &[I], targets: &[O]) -> Result<TrainReport>
    where
        T: Trainable,
        I: AsRef<[f32]>,
        O: AsRef<[f32]>,
    {
        self.validate(model, inputs, targets)?;

        let start_time = Instant::now();
        let mut report = TrainReport {
            total_epochs: model.epoch(),
            ..TrainReport::default()
        };
        for epoch in 1..=self.epochs {
            let mut training_error = 0.0;
            for (xs, ys) in inputs
                .chunks(self.batch_size)
                .zip(targets.chunks(self.batch_size))
            {
                model.reset_gradients();
                for (x, y) in xs.iter().zip(ys) {
                    training_error += model.accumulate_gradient(x.as_ref(), y.as_ref())?;
                }
                model.apply_gradient(xs.len(), self.learning_rate)?;
                report.batches += 1;
                debug!("applied batch of {} examples", xs.len());
            }
            if !inputs.is_empty() {
                training_error /= inputs.len() as f32;
            }

            report.epochs = epoch;
            report.total_epochs = model.finish_epoch();
            report.mean_square_error = training_error;
            self.logging
                .epoch(epoch, self.epochs, report.total_epochs, training_error);

            if let Checkpoint::Path(path) = &self.checkpoint {
                model.checkpoint(path)?;
            }
        }
        self.logging.completion(&report, start_time);
        Ok(report)
    }

    /// Verifies that all provided inputs to the `Trainer` are valid, returning
    /// an error if something is wrong.
    fn validate<T, I, O>(&self, model: &T, inputs: &[I], targets: &[O]) -> Result<()>
    where
        T: Trainable,
        I: AsRef<[f32]>,
        O: AsRef<[f32]>,
    {
        if self.batch_size == 0 {
            return Err(Error::EmptyBatch);
        }
        if inputs.len() != targets.len() {
            return Err(Error::SizeMismatch {
                what: "target set",
                got: targets.len(),
                expected: inputs.len(),
            });
        }
        for (input, target) in inputs.iter().zip(targets) {
            if input.as_ref().len() != model.input_len() {
                return Err(Error::SizeMismatch {
                    what: "input",
                    got: input.as_ref().len(),
                    expected: model.input_len(),
                });
            }
            if target.as_ref().len() != model.output_len() {
                return Err(Error::SizeMismatch {
                    what: "target",
                    got: target.as_ref().len(),
                    expected: model.output_len(),
                });
            }
        }
        Ok(())
    }
}

/// How many examples a network classified correctly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    /// Returns the share of correct classifications, in percent.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.correct as f64 / self.total as f64
    }
}

/// Classifies every input and counts how many match their label.
pub fn evaluate<I>(network: &Network, inputs: &[I], labels: &[usize]) -> Result<Evaluation>
where
    I: AsRef<[f32]>,
{
    if inputs.len() != labels.len() {
        return Err(Error::SizeMismatch {
            what: "label set",
            got: labels.len(),
            expected: inputs.len(),
        });
    }
    let mut evaluation = Evaluation {
        correct: 0,
        total: inputs.len(),
    };
    for (input, &label) in inputs.iter().zip(labels) {
        if network.classify(input.as_ref())? == label {
            evaluation.correct += 1;
        }
    }
    Ok(evaluation)
}
