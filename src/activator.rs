//! The logistic activation used by every neuron in the network.

/// Evaluates the [sigmoid](https://en.wikipedia.org/wiki/Sigmoid_function)
/// `1 / (1 + e^-x)`.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Evaluates the derivative of the sigmoid at `x`, where `y = sigmoid(x)`.
///
/// Note that this function takes in the *output* of the activation
/// function, rather than the input. This is an optimization that means we
/// don't have to store the intermediate results before activation.
#[inline]
pub fn sigmoid_prime(y: f32) -> f32 {
    y * (1.0 - y)
}
