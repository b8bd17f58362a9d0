use crate::activator::{sigmoid, sigmoid_prime};
use crate::utils::ZeroOut;

use itertools::izip;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

/// A wrapper for a fully connected sigmoid layer of a neural network
///
/// The weights are stored as a single matrix with one row per output
/// neuron, so `weights[[o, i]]` connects input `i` to output `o`. The layer
/// also owns the gradient accumulators for its parameters.
#[derive(Clone, Debug)]
pub struct Dense {
    weights: Array2<f32>,
    biases: Array1<f32>,
    weight_grads: Array2<f32>,
    bias_grads: Array1<f32>,
}

impl Dense {
    /// Initializes a new, untrained layer.
    ///
    /// Arguments:
    ///
    ///  * `inputs` - the number of inputs to this layer.
    ///  * `outputs` - the number of outputs from this layer.
    ///  * `rng` - the source of the initial weights, drawn uniformly from
    ///            `[-1, 1]`. Biases start at zero.
    pub fn new<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        Dense {
            weights: Array2::from_shape_simple_fn((outputs, inputs), || {
                rng.random_range(-1.0..=1.0)
            }),
            biases: Array1::zeros(outputs),
            weight_grads: Array2::zeros((outputs, inputs)),
            bias_grads: Array1::zeros(outputs),
        }
    }

    /// Returns the number of inputs to this layer.
    pub fn input_len(&self) -> usize {
        self.weights.ncols()
    }

    /// Returns the number of outputs from this layer.
    pub fn output_len(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    pub fn biases(&self) -> ArrayView1<'_, f32> {
        self.biases.view()
    }

    pub fn weight_grads(&self) -> ArrayView2<'_, f32> {
        self.weight_grads.view()
    }

    pub fn bias_grads(&self) -> ArrayView1<'_, f32> {
        self.bias_grads.view()
    }

    /// Replaces the parameters in place.
    ///
    /// Both arrays must already have this layer's shape.
    pub(crate) fn assign(&mut self, weights: ArrayView2<f32>, biases: ArrayView1<f32>) {
        self.weights.assign(&weights);
        self.biases.assign(&biases);
    }

    /// Feeds the provided `inputs` forward through the layer, returning the
    /// activated outputs.
    pub fn forward(&self, inputs: ArrayView1<f32>) -> Array1<f32> {
        debug_assert_eq!(inputs.len(), self.input_len());
        let mut outputs = self.weights.dot(&inputs) + &self.biases;
        outputs.mapv_inplace(sigmoid);
        outputs
    }

    /// Projects an error signal at the outputs back onto the inputs, i.e.
    /// computes `Wᵀ · delta` without any activation derivative.
    pub fn project(&self, delta: ArrayView1<f32>) -> Array1<f32> {
        debug_assert_eq!(delta.len(), self.output_len());
        self.weights.t().dot(&delta)
    }

    /// Backpropagates `delta` through the layer to the activated `inputs`
    /// of this layer, which must themselves be sigmoid outputs.
    pub fn backward(&self, delta: ArrayView1<f32>, inputs: ArrayView1<f32>) -> Array1<f32> {
        let mut hidden_delta = self.project(delta);
        for (d, &y) in izip!(hidden_delta.iter_mut(), inputs.iter()) {
            *d *= sigmoid_prime(y);
        }
        hidden_delta
    }

    /// Adds the gradient of one example into the accumulators.
    pub fn accumulate(&mut self, inputs: ArrayView1<f32>, delta: ArrayView1<f32>) {
        debug_assert_eq!(inputs.len(), self.input_len());
        debug_assert_eq!(delta.len(), self.output_len());
        for (mut row, db, &d) in izip!(
            self.weight_grads.rows_mut(),
            self.bias_grads.iter_mut(),
            delta.iter()
        ) {
            row.scaled_add(d, &inputs);
            *db += d;
        }
    }

    /// Zeroes the gradient accumulators.
    pub fn reset(&mut self) {
        self.weight_grads.zero_out();
        self.bias_grads.zero_out();
    }

    /// Takes one gradient descent step of size `scale` along the
    /// accumulated gradients.
    pub fn apply(&mut self, scale: f32) {
        self.weights.scaled_add(-scale, &self.weight_grads);
        self.biases.scaled_add(-scale, &self.bias_grads);
    }
}
