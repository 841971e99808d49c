//! A [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network).
//!
//! # Example
//!
//! Let's train a simple neural network to compute the XOR function:
//!
//! ```
//! # use neural::{Activator, Init, Mode, Network, Topology};
//! # use rand::{rngs::StdRng, SeedableRng};
//! // Create examples of the XOR function, each one input followed by the
//! // expected output.
//! let examples = [[0.0, 0.0, 0.0],
//!                 [0.0, 1.0, 1.0],
//!                 [1.0, 0.0, 1.0],
//!                 [1.0, 1.0, 0.0]];
//!
//! let topology = Topology::with_activators(&[2, 4, 1],
//!                                          Activator::TanH,
//!                                          Activator::Sigmoid).unwrap();
//! let mut network = Network::new(topology, Mode::Training);
//! let mut rng = StdRng::seed_from_u64(2727272);
//! network.initialize(&Init::XavierNormal { biases: (-0.01, 0.01) }, &mut rng)
//!        .unwrap();
//!
//! let before = network.average_cost(&examples).unwrap();
//! for _ in 0..2000 {
//!     network.train(&examples, 0.2).unwrap();
//! }
//! assert!(network.average_cost(&examples).unwrap() < before);
//! ```

use crate::activator::Activator;
use crate::error::{Error, Result};
use crate::init::Init;
use crate::store::{Mode, ParamStore};
use crate::topology::Topology;
use crate::utils::squared_error;

use itertools::multizip;
use log::debug;
use rand::Rng;

/// A feedforward neural network backed by a single packed parameter store.
///
/// Every method mutates the store in place; a `Network` has exactly one
/// owner at a time and none of its methods are reentrant.
#[derive(Clone, Debug)]
pub struct Network {
    topology: Topology,
    store: ParamStore,
    /// dCost/dActivation for the layer being backpropagated.
    delta: Vec<f64>,
    /// dCost/dActivation for the layer before it.
    prev_delta: Vec<f64>,
}

impl Network {
    /// Creates a new network with every value zeroed.
    ///
    /// Arguments:
    ///  * `topology` - the layer sizes and activators.
    ///  * `mode` - whether to keep the state needed for training.
    pub fn new(topology: Topology, mode: Mode) -> Self {
        let store = ParamStore::new(topology.layer_sizes(), mode);
        let widest = topology.layer_sizes().iter().copied().max().unwrap_or(0);
        Network {
            topology,
            store,
            delta: vec![0.0; widest],
            prev_delta: vec![0.0; widest],
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn mode(&self) -> Mode {
        self.store.layout().mode()
    }

    pub fn store(&self) -> &ParamStore {
        &self.store
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.topology.input_len()
    }

    /// Returns the size of the output layer from the network.
    pub fn output_len(&self) -> usize {
        self.topology.output_len()
    }

    /// Returns the number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.store.layout().parameter_count()
    }

    /// Node values of `layer`. Layer 0 holds the current input.
    pub fn activations(&self, layer: usize) -> Result<&[f64]> {
        self.topology.check_layer(layer, 0)?;
        Ok(self.store.slice(self.store.layout().activations(layer)))
    }

    pub fn activations_mut(&mut self, layer: usize) -> Result<&mut [f64]> {
        self.topology.check_layer(layer, 0)?;
        let range = self.store.layout().activations(layer);
        Ok(self.store.slice_mut(range))
    }

    /// The input layer's values, for writing an input before `forward_pass`.
    pub fn input_mut(&mut self) -> &mut [f64] {
        let range = self.store.layout().activations(0);
        self.store.slice_mut(range)
    }

    /// The output layer's values after the last pass.
    pub fn output(&self) -> &[f64] {
        let last = self.topology.num_layers() - 1;
        self.store.slice(self.store.layout().activations(last))
    }

    /// Weighted sums of `layer` from the last pass, before activation.
    pub fn pre_activations(&self, layer: usize) -> Result<&[f64]> {
        self.topology.check_layer(layer, 1)?;
        self.require_gradients()?;
        Ok(self.store.slice(self.store.layout().pre_activations(layer)))
    }

    pub fn biases(&self, layer: usize) -> Result<&[f64]> {
        self.topology.check_layer(layer, 1)?;
        Ok(self.store.slice(self.store.layout().biases(layer)))
    }

    pub fn biases_mut(&mut self, layer: usize) -> Result<&mut [f64]> {
        self.topology.check_layer(layer, 1)?;
        let range = self.store.layout().biases(layer);
        Ok(self.store.slice_mut(range))
    }

    /// The incoming weights of `node` in `layer`, one per node of
    /// `layer - 1`.
    pub fn weights(&self, layer: usize, node: usize) -> Result<&[f64]> {
        self.topology.check_node(layer, node)?;
        Ok(self.store.slice(self.store.layout().weights(layer, node)))
    }

    pub fn weights_mut(&mut self, layer: usize, node: usize) -> Result<&mut [f64]> {
        self.topology.check_node(layer, node)?;
        let range = self.store.layout().weights(layer, node);
        Ok(self.store.slice_mut(range))
    }

    pub fn bias_gradients(&self, layer: usize) -> Result<&[f64]> {
        self.topology.check_layer(layer, 1)?;
        let range = self.store.layout().bias_gradients(layer);
        self.store.gradient_slice(range).ok_or(Error::GradientsDisabled)
    }

    pub fn weight_gradients(&self, layer: usize, node: usize) -> Result<&[f64]> {
        self.topology.check_node(layer, node)?;
        let range = self.store.layout().weight_gradients(layer, node);
        self.store.gradient_slice(range).ok_or(Error::GradientsDisabled)
    }

    fn require_gradients(&self) -> Result<()> {
        match self.mode() {
            Mode::Training => Ok(()),
            Mode::Inference => Err(Error::GradientsDisabled),
        }
    }

    /// Overwrites every weight and bias using `init`. Gradients are left
    /// untouched.
    pub fn initialize<R: Rng + ?Sized>(&mut self, init: &Init, rng: &mut R) -> Result<()> {
        let (weight_dist, bias_dist) =
            init.samplers(self.topology.input_len(), self.topology.output_len())?;
        debug!("Initializing {} parameters with {:?}", self.parameter_count(), init);

        for layer in 1..self.topology.num_layers() {
            let range = self.store.layout().biases(layer);
            for b in self.store.slice_mut(range) {
                *b = bias_dist.sample(rng);
            }
            for node in 0..self.topology.layer_sizes()[layer] {
                let range = self.store.layout().weights(layer, node);
                for w in self.store.slice_mut(range) {
                    *w = weight_dist.sample(rng);
                }
            }
        }
        Ok(())
    }

    /// Feeds the current input layer forward through the network.
    ///
    /// Modifies every activation except the input layer's, and every
    /// pre-activation in training mode.
    pub fn forward_pass(&mut self) {
        for layer in 1..self.topology.num_layers() {
            let activator = self.topology.activators()[layer - 1];
            let view = self.store.layer_mut(layer);
            let fan_in = view.inputs.len();
            let mut pre_activations = view.pre_activations;
            for (node, (y, bias, weights)) in multizip((
                view.activations.iter_mut(),
                view.biases.iter(),
                view.weights.chunks_exact(fan_in),
            ))
            .enumerate()
            {
                let sum = dot(weights, view.inputs) + bias;
                if let Some(pre) = pre_activations.as_deref_mut() {
                    pre[node] = sum;
                }
                *y = activator.f(sum);
            }
        }
    }

    /// Writes `input` into the input layer and runs a forward pass.
    pub fn run(&mut self, input: &[f64]) -> Result<&[f64]> {
        self.load_input(input)?;
        self.forward_pass();
        Ok(self.output())
    }

    fn load_input(&mut self, input: &[f64]) -> Result<()> {
        if input.len() != self.input_len() {
            return Err(Error::size_mismatch("input", self.input_len(), input.len()));
        }
        self.input_mut().copy_from_slice(input);
        Ok(())
    }

    /// Splits an `input ++ expected` span into its two halves.
    pub fn split_example<'a>(&self, example: &'a [f64]) -> Result<(&'a [f64], &'a [f64])> {
        let len = self.topology.example_len();
        if example.len() != len {
            return Err(Error::size_mismatch("example", len, example.len()));
        }
        Ok(example.split_at(self.input_len()))
    }

    /// Computes the cost gradient of every weight and bias for one example.
    ///
    /// With `accumulate` the gradients are added onto the existing gradient
    /// slots, otherwise they replace them. Returns the example's squared
    /// error cost as measured by the forward pass.
    pub fn backward_pass(
        &mut self,
        input: &[f64],
        expected: &[f64],
        accumulate: bool,
    ) -> Result<f64> {
        self.require_gradients()?;
        if expected.len() != self.output_len() {
            return Err(Error::size_mismatch(
                "expected output",
                self.output_len(),
                expected.len(),
            ));
        }
        self.load_input(input)?;
        self.forward_pass();

        let last = self.topology.num_layers() - 1;
        let output = self.store.slice(self.store.layout().activations(last));
        let cost = squared_error(output, expected);
        for (d, y, e) in multizip((self.delta.iter_mut(), output.iter(), expected.iter())) {
            *d = 2.0 * (y - e);
        }

        for layer in (1..self.topology.num_layers()).rev() {
            let activator = self.topology.activators()[layer - 1];
            let view = self.store.layer_mut(layer);
            let nodes = view.activations.len();
            let (pre_activations, gradients) = match (view.pre_activations, view.gradients) {
                (Some(pre), Some(grads)) => (pre, grads),
                _ => return Err(Error::GradientsDisabled),
            };
            let delta = &mut self.delta[..nodes];
            backprop_layer(
                activator,
                view.inputs,
                pre_activations,
                view.weights,
                delta,
                gradients,
                accumulate,
            );

            if layer > 1 {
                let prev = &mut self.prev_delta[..view.inputs.len()];
                propagate_delta(view.weights, delta, prev);
                std::mem::swap(&mut self.delta, &mut self.prev_delta);
            }
        }
        Ok(cost)
    }

    /// Zeroes every weight and bias gradient.
    pub fn zero_gradients(&mut self) -> Result<()> {
        if self.store.zero_gradients() {
            Ok(())
        } else {
            Err(Error::GradientsDisabled)
        }
    }

    /// Moves every parameter against its gradient: `p -= scale * grad`.
    pub fn apply_gradients(&mut self, scale: f64) -> Result<()> {
        self.require_gradients()?;
        for layer in 1..self.topology.num_layers() {
            let (params, grads) = self
                .store
                .params_and_gradients_mut(layer)
                .ok_or(Error::GradientsDisabled)?;
            for (p, g) in params.iter_mut().zip(grads) {
                *p -= scale * g;
            }
        }
        Ok(())
    }

    /// Performs a single mini-batch gradient descent step.
    ///
    /// Every example is an `input ++ expected` span. Gradients are zeroed,
    /// accumulated over the batch, and every parameter is moved by
    /// `learning_rate` times its average gradient. Returns the average cost
    /// of the batch before the update.
    ///
    /// If an example has the wrong width no parameter is changed.
    pub fn train<I>(&mut self, batch: I, learning_rate: f64) -> Result<f64>
    where
        I: IntoIterator,
        I::Item: AsRef<[f64]>,
    {
        self.zero_gradients()?;
        let mut batch_size = 0;
        let mut total_cost = 0.0;
        for example in batch {
            let (input, expected) = self.split_example(example.as_ref())?;
            total_cost += self.backward_pass(input, expected, true)?;
            batch_size += 1;
        }
        if batch_size == 0 {
            return Err(Error::EmptyBatch);
        }
        let n = batch_size as f64;
        self.apply_gradients(learning_rate / n)?;
        Ok(total_cost / n)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Turns `delta` from dCost/dActivation into dCost/dz for one layer and
/// writes the bias and weight gradients.
fn backprop_layer(
    activator: Activator,
    inputs: &[f64],
    pre_activations: &[f64],
    weights: &[f64],
    delta: &mut [f64],
    gradients: &mut [f64],
    accumulate: bool,
) {
    let nodes = delta.len();
    let fan_in = inputs.len();
    debug_assert_eq!(weights.len(), nodes * fan_in);

    for (d, &z) in delta.iter_mut().zip(pre_activations) {
        *d *= activator.fprime(z);
    }

    let (bias_grads, weight_grads) = gradients.split_at_mut(nodes);
    for (g, &d) in bias_grads.iter_mut().zip(delta.iter()) {
        if accumulate {
            *g += d;
        } else {
            *g = d;
        }
    }
    for (row, &d) in weight_grads.chunks_exact_mut(fan_in).zip(delta.iter()) {
        for (g, &x) in row.iter_mut().zip(inputs) {
            if accumulate {
                *g += d * x;
            } else {
                *g = d * x;
            }
        }
    }
}

/// `prev[k] = sum_j delta[j] * weights[j][k]`
fn propagate_delta(weights: &[f64], delta: &[f64], prev: &mut [f64]) {
    let fan_in = prev.len();
    for p in prev.iter_mut() {
        *p = 0.0;
    }
    for (row, &d) in weights.chunks_exact(fan_in).zip(delta) {
        for (p, &w) in prev.iter_mut().zip(row) {
            *p += d * w;
        }
    }
}
