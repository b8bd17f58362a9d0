//! Read-only explanations of what a network responds to.
//!
//! Neither map touches the parameters or the gradient accumulators, so they
//! can be computed between training steps.

use crate::activator::sigmoid_prime;
use crate::error::{Error, Result};
use crate::network::Network;

use ndarray::{Array1, Array2};

/// Below this range a map is considered flat and is not stretched.
const FLAT_RANGE: f32 = 1e-6;

/// Linearly rescales `values` in place so they span `[0, 1]`.
///
/// A flat input (range below `1e-6`) is shifted to start at zero without
/// being stretched.
pub fn normalize<'a, I>(values: I)
where
    I: IntoIterator<Item = &'a mut f32>,
{
    let values: Vec<&mut f32> = values.into_iter().collect();
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(**v), hi.max(**v))
        });
    let mut range = max - min;
    if range < FLAT_RANGE {
        range = 1.0;
    }
    for v in values {
        *v = (*v - min) / range;
    }
}

/// Returns the side of the square image an input of `len` pixels encodes.
fn image_side(len: usize) -> Result<usize> {
    let side = (len as f64).sqrt().round() as usize;
    if side * side != len {
        return Err(Error::NotSquare { len });
    }
    Ok(side)
}

/// The output error used to explain `target`: the sigmoid slope at the
/// target unit, zero everywhere else.
fn relevance_seed(output: &Array1<f32>, target: usize) -> Array1<f32> {
    let mut seed = Array1::zeros(output.len());
    seed[target] = sigmoid_prime(output[target]);
    seed
}

impl Network {
    /// Computes how strongly each input pixel drives the hidden layer for
    /// `input`.
    ///
    /// Pixel `i` scores `Σ_h |W1[h][i]| * hidden[h]`. The scores are laid out
    /// as a square image (`side × side`, row major) and rescaled to `[0, 1]`.
    pub fn activation_heat_map(&self, input: &[f32]) -> Result<Array2<f32>> {
        let side = image_side(self.input_len())?;
        let (hidden, _) = self.activations(input)?;

        let heat = self.w1().mapv(f32::abs).t().dot(&hidden);
        let mut heat = heat
            .into_shape_with_order((side, side))
            .map_err(|_| Error::NotSquare {
                len: self.input_len(),
            })?;
        normalize(heat.iter_mut());
        Ok(heat)
    }

    /// Computes a saliency map of `input` for the output unit `target`.
    ///
    /// A delta seeded only at `target` is backpropagated to the hidden layer
    /// and projected onto the inputs: `relevance[i] = Σ_h deltaHid[h] *
    /// W1[h][i]`. The result is not normalized.
    pub fn relevance_map(&self, input: &[f32], target: usize) -> Result<Vec<f32>> {
        if target >= self.output_len() {
            return Err(Error::IndexOutOfRange {
                index: target,
                len: self.output_len(),
            });
        }
        let (hidden, output) = self.activations(input)?;

        let seed = relevance_seed(&output, target);
        let hidden_delta = self.output_layer().backward(seed.view(), hidden.view());
        Ok(self.hidden_layer().project(hidden_delta.view()).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::sigmoid;
    use rand::{rngs::StdRng, SeedableRng};

    fn network(input: usize) -> Network {
        Network::with_rng(input, 5, 3, &mut StdRng::seed_from_u64(11)).unwrap()
    }

    fn pixels(n: usize) -> Vec<f32> {
        (0..n).map(|i| (i % 7) as f32 / 6.0).collect()
    }

    #[test]
    fn normalize_stretches_to_unit_range() {
        let mut values = vec![2.0f32, 4.0, 3.0];
        normalize(values.iter_mut());
        assert_eq!(values, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn normalize_flat_values() {
        let mut values = vec![3.0f32; 4];
        normalize(values.iter_mut());
        assert_eq!(values, vec![0.0; 4]);
    }

    #[test]
    fn heat_map_is_square_and_normalized() {
        let network = network(16);
        let heat = network.activation_heat_map(&pixels(16)).unwrap();
        assert_eq!(heat.dim(), (4, 4));
        assert!(heat.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(heat.iter().any(|&v| v == 0.0));
        assert!(heat.iter().any(|&v| v == 1.0));
    }

    #[test]
    fn heat_map_matches_manual_sum() {
        let network = network(9);
        let input = pixels(9);
        let heat = network.activation_heat_map(&input).unwrap();

        let (w1, b1) = (network.w1(), network.b1());
        let hidden: Vec<f32> = (0..5)
            .map(|h| sigmoid(b1[h] + (0..9).map(|i| w1[[h, i]] * input[i]).sum::<f32>()))
            .collect();
        let mut expected: Vec<f32> = (0..9)
            .map(|i| (0..5).map(|h| w1[[h, i]].abs() * hidden[h]).sum())
            .collect();
        normalize(expected.iter_mut());

        for (i, e) in expected.iter().enumerate() {
            assert!((heat[[i / 3, i % 3]] - e).abs() < 1e-5);
        }
    }

    #[test]
    fn heat_map_needs_square_input() {
        let network = network(10);
        assert!(matches!(
            network.activation_heat_map(&pixels(10)),
            Err(Error::NotSquare { len: 10 })
        ));
    }

    #[test]
    fn seed_is_zero_outside_target() {
        let output = Array1::from(vec![0.2f32, 0.7, 0.5, 0.9]);
        for target in 0..4 {
            let seed = relevance_seed(&output, target);
            for (i, &s) in seed.iter().enumerate() {
                if i == target {
                    assert_eq!(s, sigmoid_prime(output[target]));
                } else {
                    assert_eq!(s, 0.0);
                }
            }
        }
    }

    #[test]
    fn relevance_matches_manual_backpropagation() {
        let network = network(4);
        let input = [0.1f32, 0.9, 0.4, 0.0];
        let target = 2;
        let relevance = network.relevance_map(&input, target).unwrap();

        let (w1, b1, w2, b2) = (network.w1(), network.b1(), network.w2(), network.b2());
        let hidden: Vec<f32> = (0..5)
            .map(|h| sigmoid(b1[h] + (0..4).map(|i| w1[[h, i]] * input[i]).sum::<f32>()))
            .collect();
        let out = sigmoid(b2[target] + (0..5).map(|h| w2[[target, h]] * hidden[h]).sum::<f32>());
        let seed = sigmoid_prime(out);

        for i in 0..4 {
            let expected: f32 = (0..5)
                .map(|h| seed * w2[[target, h]] * sigmoid_prime(hidden[h]) * w1[[h, i]])
                .sum();
            assert!((relevance[i] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn maps_leave_network_untouched() {
        let network = network(16);
        let before = network.clone();
        network.activation_heat_map(&pixels(16)).unwrap();
        network.relevance_map(&pixels(16), 1).unwrap();
        assert_eq!(network.w1(), before.w1());
        assert_eq!(network.w2(), before.w2());
        assert_eq!(
            network.hidden_layer().weight_grads(),
            before.hidden_layer().weight_grads()
        );
    }

    #[test]
    fn relevance_target_out_of_range() {
        let network = network(4);
        assert!(matches!(
            network.relevance_map(&[0.0; 4], 3),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
    }
}
