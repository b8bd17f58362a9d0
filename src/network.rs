//! A two layer [feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network).
//!
//! # Example
//!
//! Let's teach a small network to tell two patterns apart:
//!
//! ```
//! # use digitnet::network::Network;
//! # use digitnet::trainer::{Checkpoint, Logging, Trainer};
//! let inputs = [[1.0f32, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]];
//! let targets = [[1.0f32, 0.0], [0.0, 1.0]];
//!
//! let mut network = Network::new(4, 3, 2).unwrap();
//! Trainer::new()
//!     .learning_rate(0.5)
//!     .epochs(500)
//!     .checkpoint(Checkpoint::Disabled)
//!     .logging(Logging::Silent)
//!     .train(&mut network, &inputs, &targets)
//!     .unwrap();
//!
//! assert_eq!(network.classify(&inputs[0]).unwrap(), 0);
//! assert_eq!(network.classify(&inputs[1]).unwrap(), 1);
//! ```

use crate::activator::sigmoid_prime;
use crate::error::{Error, Result};
use crate::layer::Dense;
use crate::trainer::{TrainReport, Trainable, Trainer};
use crate::utils::{argmax, mean_square_error};

use itertools::izip;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::Rng;
use std::path::Path;

/// A fully connected network with one sigmoid hidden layer and a sigmoid
/// output layer.
///
/// The layer sizes are fixed at construction. Every parameter and gradient
/// buffer keeps its shape for the lifetime of the network; training and
/// loading only overwrite values.
#[derive(Clone, Debug)]
pub struct Network {
    hidden: Dense,
    output: Dense,
    epoch: u32,
}

impl Network {
    /// Creates a new, untrained network with weights drawn from the thread
    /// local generator.
    pub fn new(input_len: usize, hidden_len: usize, output_len: usize) -> Result<Self> {
        Self::with_rng(input_len, hidden_len, output_len, &mut rand::rng())
    }

    /// Creates a new, untrained network with weights drawn from `rng`.
    ///
    /// Weights are uniform in `[-1, 1]`, biases are zero and the epoch
    /// counter starts at zero.
    pub fn with_rng<R: Rng>(
        input_len: usize,
        hidden_len: usize,
        output_len: usize,
        rng: &mut R,
    ) -> Result<Self> {
        for (name, got) in [
            ("input", input_len),
            ("hidden", hidden_len),
            ("output", output_len),
        ] {
            if got == 0 {
                return Err(Error::InvalidDimension { name, got });
            }
        }

        let hidden = Dense::new(input_len, hidden_len, rng);
        let output = Dense::new(hidden_len, output_len, rng);
        Ok(Network {
            hidden,
            output,
            epoch: 0,
        })
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.hidden.input_len()
    }

    /// Returns the size of the hidden layer.
    pub fn hidden_len(&self) -> usize {
        self.hidden.output_len()
    }

    /// Returns the size of the output layer from the network.
    pub fn output_len(&self) -> usize {
        self.output.output_len()
    }

    /// Returns `(input, hidden, output)` sizes.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.input_len(), self.hidden_len(), self.output_len())
    }

    /// Returns the number of completed training epochs.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn hidden_layer(&self) -> &Dense {
        &self.hidden
    }

    pub fn output_layer(&self) -> &Dense {
        &self.output
    }

    /// Input to hidden weights, `hidden × input`.
    pub fn w1(&self) -> ArrayView2<'_, f32> {
        self.hidden.weights()
    }

    pub fn b1(&self) -> ArrayView1<'_, f32> {
        self.hidden.biases()
    }

    /// Hidden to output weights, `output × hidden`.
    pub fn w2(&self) -> ArrayView2<'_, f32> {
        self.output.weights()
    }

    pub fn b2(&self) -> ArrayView1<'_, f32> {
        self.output.biases()
    }

    pub(crate) fn layers_mut(&mut self) -> (&mut Dense, &mut Dense) {
        (&mut self.hidden, &mut self.output)
    }

    pub(crate) fn set_epoch(&mut self, epoch: u32) {
        self.epoch = epoch;
    }

    /// Feeds the provided `input` through the network, returning the output
    /// layer.
    ///
    /// Each output lies in `(0, 1)`. The outputs are independent sigmoids,
    /// so they do not sum to one.
    pub fn feed_forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        let (_, output) = self.activations(input)?;
        Ok(output.to_vec())
    }

    /// Returns the index of the strongest output for `input`.
    pub fn classify(&self, input: &[f32]) -> Result<usize> {
        let (_, output) = self.activations(input)?;
        // The output layer is never empty.
        Ok(argmax(output.as_slice().unwrap_or(&[])).unwrap_or(0))
    }

    /// Computes the hidden and output activations for `input`.
    pub(crate) fn activations(&self, input: &[f32]) -> Result<(Array1<f32>, Array1<f32>)> {
        check_len("input", input.len(), self.input_len())?;
        let hidden = self.hidden.forward(ArrayView1::from(input));
        let output = self.output.forward(hidden.view());
        Ok((hidden, output))
    }

    /// Zeroes every gradient accumulator.
    pub fn reset_gradients(&mut self) {
        self.hidden.reset();
        self.output.reset();
    }

    /// Runs `input` forward, backpropagates the squared error against
    /// `target` and adds the resulting gradients into the accumulators.
    ///
    /// Returns the mean squared error of the prediction, taken before the
    /// gradients were accumulated.
    pub fn accumulate_gradient(&mut self, input: &[f32], target: &[f32]) -> Result<f32> {
        check_len("target", target.len(), self.output_len())?;
        let (hidden, output) = self.activations(input)?;

        let mut output_delta = Array1::zeros(output.len());
        for (d, &y, &t) in izip!(output_delta.iter_mut(), output.iter(), target) {
            *d = (y - t) * sigmoid_prime(y);
        }
        let hidden_delta = self.output.backward(output_delta.view(), hidden.view());

        self.output.accumulate(hidden.view(), output_delta.view());
        self.hidden
            .accumulate(ArrayView1::from(input), hidden_delta.view());

        Ok(mean_square_error(output.as_slice().unwrap_or(&[]), target))
    }

    /// Applies the accumulated gradients averaged over `batch_size` samples,
    /// i.e. every parameter moves by `-rate / batch_size * gradient`.
    pub fn apply_gradient(&mut self, batch_size: usize, rate: f32) -> Result<()> {
        if batch_size == 0 {
            return Err(Error::EmptyBatch);
        }
        let scale = rate / batch_size as f32;
        self.hidden.apply(scale);
        self.output.apply(scale);
        Ok(())
    }

    /// Trains with the default settings: batches of 64, a checkpoint to
    /// `neural_network_save` after every epoch.
    pub fn train_network<I, O>(
        &mut self,
        inputs: &[I],
        targets: &[O],
        rate: f32,
        epochs: u32,
    ) -> Result<TrainReport>
    where
        I: AsRef<[f32]>,
        O: AsRef<[f32]>,
    {
        Trainer::new()
            .learning_rate(rate)
            .epochs(epochs)
            .train(self, inputs, targets)
    }
}

impl Trainable for Network {
    fn input_len(&self) -> usize {
        Network::input_len(self)
    }

    fn output_len(&self) -> usize {
        Network::output_len(self)
    }

    fn epoch(&self) -> u32 {
        self.epoch
    }

    fn reset_gradients(&mut self) {
        Network::reset_gradients(self)
    }

    fn accumulate_gradient(&mut self, input: &[f32], target: &[f32]) -> Result<f32> {
        Network::accumulate_gradient(self, input, target)
    }

    fn apply_gradient(&mut self, batch_size: usize, rate: f32) -> Result<()> {
        Network::apply_gradient(self, batch_size, rate)
    }

    fn finish_epoch(&mut self) -> u32 {
        self.epoch += 1;
        self.epoch
    }

    fn checkpoint(&self, path: &Path) -> Result<()> {
        self.save(path)
    }
}

fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(Error::SizeMismatch {
            what,
            got,
            expected,
        });
    }
    Ok(())
}
