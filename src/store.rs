//! Packed storage for every value a network owns.
//!
//! All activations, pre-activations, biases and weights live in one
//! contiguous value buffer. Layer 0 contributes only its activations. Every
//! later layer `i` contributes, in order:
//!
//! ```text
//! activations      L[i]
//! pre-activations  L[i]            (training mode only)
//! biases           L[i]
//! weights          L[i] * L[i-1]   (node j's weights at j * L[i-1])
//! ```
//!
//! In training mode a second buffer holds the gradients of the biases and
//! weights, packed per layer in the same order as their values. No offsets
//! are stored: every range is recomputed from the layer sizes.

use crate::utils::ZeroOut;

use std::ops::Range;

/// Whether a network keeps the extra state needed for backpropagation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Values only. Enough to run forward passes.
    Inference,
    /// Values, pre-activations and parameter gradients.
    Training,
}

/// Closed-form offset arithmetic over a list of layer sizes.
///
/// Only the buffer lengths are public. Ranges into the buffers are handed
/// out by [`Network`](crate::Network)'s checked accessors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    sizes: Vec<usize>,
    mode: Mode,
}

impl Layout {
    pub fn new(sizes: &[usize], mode: Mode) -> Self {
        Layout {
            sizes: sizes.into(),
            mode,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn tracking(&self) -> bool {
        self.mode == Mode::Training
    }

    /// Length of layer `layer`'s whole segment in the value buffer.
    fn layer_len(&self, layer: usize) -> usize {
        let n = self.sizes[layer];
        if layer == 0 {
            return n;
        }
        let pre = if self.tracking() { n } else { 0 };
        n + pre + self.param_len(layer)
    }

    /// Number of biases plus weights owned by `layer`.
    fn param_len(&self, layer: usize) -> usize {
        let n = self.sizes[layer];
        n + n * self.sizes[layer - 1]
    }

    /// Start of `layer`'s segment in the value buffer.
    fn layer_start(&self, layer: usize) -> usize {
        (0..layer).map(|i| self.layer_len(i)).sum()
    }

    pub fn value_len(&self) -> usize {
        self.layer_start(self.sizes.len())
    }

    pub fn gradient_len(&self) -> usize {
        if self.tracking() {
            self.parameter_count()
        } else {
            0
        }
    }

    /// Total number of stored scalars across the value and gradient buffers.
    pub fn buffer_len(&self) -> usize {
        self.value_len() + self.gradient_len()
    }

    /// Number of trainable scalars.
    pub fn parameter_count(&self) -> usize {
        (1..self.sizes.len()).map(|i| self.param_len(i)).sum()
    }

    pub(crate) fn activations(&self, layer: usize) -> Range<usize> {
        let start = self.layer_start(layer);
        start..start + self.sizes[layer]
    }

    /// Only meaningful in training mode and for `layer >= 1`.
    pub(crate) fn pre_activations(&self, layer: usize) -> Range<usize> {
        debug_assert!(self.tracking() && layer >= 1);
        let start = self.layer_start(layer) + self.sizes[layer];
        start..start + self.sizes[layer]
    }

    /// The contiguous biases-then-weights block of `layer >= 1`.
    pub(crate) fn params(&self, layer: usize) -> Range<usize> {
        let n = self.sizes[layer];
        let pre = if self.tracking() { n } else { 0 };
        let start = self.layer_start(layer) + n + pre;
        start..start + self.param_len(layer)
    }

    pub(crate) fn biases(&self, layer: usize) -> Range<usize> {
        let params = self.params(layer);
        params.start..params.start + self.sizes[layer]
    }

    pub(crate) fn weights(&self, layer: usize, node: usize) -> Range<usize> {
        let fan_in = self.sizes[layer - 1];
        let start = self.biases(layer).end + node * fan_in;
        start..start + fan_in
    }

    /// The biases-then-weights block of `layer >= 1` in the gradient buffer.
    pub(crate) fn gradients(&self, layer: usize) -> Range<usize> {
        let start: usize = (1..layer).map(|i| self.param_len(i)).sum();
        start..start + self.param_len(layer)
    }

    pub(crate) fn bias_gradients(&self, layer: usize) -> Range<usize> {
        let grads = self.gradients(layer);
        grads.start..grads.start + self.sizes[layer]
    }

    pub(crate) fn weight_gradients(&self, layer: usize, node: usize) -> Range<usize> {
        let fan_in = self.sizes[layer - 1];
        let start = self.bias_gradients(layer).end + node * fan_in;
        start..start + fan_in
    }
}

/// Split borrows of everything one layer reads or writes during a pass.
pub(crate) struct LayerMut<'a> {
    /// Activations of the previous layer.
    pub inputs: &'a [f64],
    pub activations: &'a mut [f64],
    pub pre_activations: Option<&'a mut [f64]>,
    pub biases: &'a [f64],
    /// Row-major, one row of `inputs.len()` weights per node.
    pub weights: &'a [f64],
    /// Biases-then-weights gradients, matching `biases` and `weights`.
    pub gradients: Option<&'a mut [f64]>,
}

/// The value buffer and, in training mode, the gradient buffer.
#[derive(Clone, Debug)]
pub struct ParamStore {
    layout: Layout,
    values: Vec<f64>,
    gradients: Option<Vec<f64>>,
}

impl ParamStore {
    /// Allocates a zero-filled store.
    pub fn new(sizes: &[usize], mode: Mode) -> Self {
        let layout = Layout::new(sizes, mode);
        let values = vec![0.0; layout.value_len()];
        let gradients = match mode {
            Mode::Training => Some(vec![0.0; layout.gradient_len()]),
            Mode::Inference => None,
        };
        ParamStore {
            layout,
            values,
            gradients,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn gradients(&self) -> Option<&[f64]> {
        self.gradients.as_deref()
    }

    pub(crate) fn slice(&self, range: Range<usize>) -> &[f64] {
        &self.values[range]
    }

    pub(crate) fn slice_mut(&mut self, range: Range<usize>) -> &mut [f64] {
        &mut self.values[range]
    }

    pub(crate) fn gradient_slice(&self, range: Range<usize>) -> Option<&[f64]> {
        self.gradients.as_ref().map(|g| &g[range])
    }

    /// Zeroes every gradient slot. Returns false in inference mode.
    pub fn zero_gradients(&mut self) -> bool {
        match self.gradients.as_mut() {
            Some(gradients) => {
                gradients.zero_out();
                true
            }
            None => false,
        }
    }

    /// Borrows the pieces of `layer >= 1` needed by a forward or backward
    /// pass.
    pub(crate) fn layer_mut(&mut self, layer: usize) -> LayerMut<'_> {
        let layout = &self.layout;
        let n = layout.sizes[layer];
        let inputs = layout.activations(layer - 1);
        let own = layout.activations(layer);

        // Everything before `layer`'s segment, including the inputs, is
        // read-only for this layer.
        let (before, rest) = self.values.split_at_mut(own.start);
        let before: &[f64] = before;
        let (activations, rest) = rest.split_at_mut(n);
        let (pre_activations, rest) = match layout.mode {
            Mode::Training => {
                let (pre, rest) = rest.split_at_mut(n);
                (Some(pre), rest)
            }
            Mode::Inference => (None, rest),
        };
        let (params, _) = rest.split_at_mut(layout.param_len(layer));
        let params: &[f64] = params;
        let (biases, weights) = params.split_at(n);

        let gradients = self
            .gradients
            .as_mut()
            .map(|g| &mut g[layout.gradients(layer)]);

        LayerMut {
            inputs: &before[inputs],
            activations,
            pre_activations,
            biases,
            weights,
            gradients,
        }
    }

    /// Borrows `layer`'s parameter block alongside its gradient block.
    pub(crate) fn params_and_gradients_mut(
        &mut self,
        layer: usize,
    ) -> Option<(&mut [f64], &[f64])> {
        let params = self.layout.params(layer);
        let grads = self.layout.gradients(layer);
        let gradients = self.gradients.as_ref()?;
        Some((&mut self.values[params], &gradients[grads]))
    }
}
