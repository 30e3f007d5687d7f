//! Small fully connected network used as the learner behind [`Classifier`](super::Classifier).
//!
//! Hidden layers use ReLU, the output layer produces raw logits that are
//! turned into class probabilities with a softmax. Training is full-batch
//! gradient descent on softmax cross-entropy with Adagrad step sizes.

use ndarray::{Array1, Array2, Axis, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::utils::softmax_rows;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DenseLayer {
    /// Shape `[inputs, outputs]`
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl DenseLayer {
    /// Glorot-uniform initialised layer with zero bias.
    fn glorot(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| rng.random_range(-limit..limit));
        Self {
            weights,
            bias: Array1::zeros(outputs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FeedForwardNetwork {
    layers: Vec<DenseLayer>,
}

impl FeedForwardNetwork {
    /// Builds a network with the given layer widths, input first and output last.
    /// The same seed always yields the same initial weights.
    pub fn new(layer_sizes: &[usize], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = layer_sizes
            .windows(2)
            .map(|pair| DenseLayer::glorot(pair[0], pair[1], &mut rng))
            .collect();
        Self { layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.weights.nrows()).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.weights.ncols()).unwrap_or(0)
    }

    pub fn hidden_units(&self) -> Vec<usize> {
        let n = self.layers.len();
        self.layers
            .iter()
            .take(n.saturating_sub(1))
            .map(|l| l.weights.ncols())
            .collect()
    }

    /// Checks that consecutive layers fit together. Used after deserialising.
    pub fn check_shapes(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("network has no layers".into());
        }
        let mut expected_inputs = self.input_size();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.weights.nrows() != expected_inputs {
                return Err(format!(
                    "layer {} expects {} inputs, previous layer produces {}",
                    i,
                    layer.weights.nrows(),
                    expected_inputs
                ));
            }
            if layer.bias.len() != layer.weights.ncols() {
                return Err(format!(
                    "layer {} has {} outputs but {} biases",
                    i,
                    layer.weights.ncols(),
                    layer.bias.len()
                ));
            }
            expected_inputs = layer.weights.ncols();
        }
        Ok(())
    }

    /// Computes output logits for a batch of rows.
    pub fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        let last = self.layers.len().saturating_sub(1);
        let mut activation = input.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = activation.dot(&layer.weights) + &layer.bias;
            activation = if i < last { z.mapv(relu) } else { z };
        }
        activation
    }

    /// Forward pass that keeps every layer's input and pre-activation for backprop.
    fn forward_trace(&self, input: &Array2<f32>) -> (Vec<Array2<f32>>, Vec<Array2<f32>>) {
        let last = self.layers.len().saturating_sub(1);
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        activations.push(input.clone());

        for (i, layer) in self.layers.iter().enumerate() {
            let z = activations[i].dot(&layer.weights) + &layer.bias;
            let a = if i < last { z.mapv(relu) } else { z.clone() };
            pre_activations.push(z);
            activations.push(a);
        }
        (activations, pre_activations)
    }

    /// Runs one full-batch update and returns the mean cross-entropy before the update.
    ///
    /// `targets` is one-hot with shape `[rows, outputs]`.
    pub fn train_step(
        &mut self,
        input: &Array2<f32>,
        targets: &Array2<f32>,
        optimizer: &mut Adagrad,
    ) -> f32 {
        let rows = input.nrows().max(1) as f32;
        let (activations, pre_activations) = self.forward_trace(input);
        let logits = &activations[self.layers.len()];
        let probs = softmax_rows(logits);

        let loss = (&probs * targets)
            .sum_axis(Axis(1))
            .mapv(|p| -p.max(1e-12).ln())
            .sum()
            / rows;

        // Backward pass - collect gradients first
        let mut delta = (&probs - targets) / rows;
        let mut gradients = Vec::with_capacity(self.layers.len());
        for i in (0..self.layers.len()).rev() {
            let grad_weights = activations[i].t().dot(&delta);
            let grad_bias = delta.sum_axis(Axis(0));
            if i > 0 {
                let back = delta.dot(&self.layers[i].weights.t());
                delta = back * pre_activations[i - 1].mapv(relu_grad);
            }
            gradients.push((grad_weights, grad_bias));
        }
        gradients.reverse();

        optimizer.apply(&mut self.layers, gradients);
        loss
    }
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

fn relu_grad(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Adagrad: per-parameter step sizes shrinking with the accumulated squared gradient.
#[derive(Debug)]
pub(crate) struct Adagrad {
    learning_rate: f32,
    accumulators: Vec<(Array2<f32>, Array1<f32>)>,
}

impl Adagrad {
    const INITIAL_ACCUMULATOR: f32 = 0.1;

    pub fn new(learning_rate: f32, network: &FeedForwardNetwork) -> Self {
        let accumulators = network
            .layers
            .iter()
            .map(|l| {
                (
                    Array2::from_elem(l.weights.raw_dim(), Self::INITIAL_ACCUMULATOR),
                    Array1::from_elem(l.bias.len(), Self::INITIAL_ACCUMULATOR),
                )
            })
            .collect();
        Self {
            learning_rate,
            accumulators,
        }
    }

    fn apply(&mut self, layers: &mut [DenseLayer], gradients: Vec<(Array2<f32>, Array1<f32>)>) {
        let lr = self.learning_rate;
        for ((layer, (grad_w, grad_b)), (acc_w, acc_b)) in layers
            .iter_mut()
            .zip(gradients)
            .zip(self.accumulators.iter_mut())
        {
            Zip::from(&mut layer.weights)
                .and(acc_w)
                .and(&grad_w)
                .for_each(|w, a, &g| {
                    *a += g * g;
                    *w -= lr * g / a.sqrt();
                });
            Zip::from(&mut layer.bias)
                .and(acc_b)
                .and(&grad_b)
                .for_each(|b, a, &g| {
                    *a += g * g;
                    *b -= lr * g / a.sqrt();
                });
        }
    }
}
