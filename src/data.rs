//! Contiguous storage for batches of training examples.

use crate::topology::Topology;

/// A fixed number of `input ++ expected` examples packed into one buffer.
///
/// Collaborators fill it in place between training steps, so a training
/// loop allocates its batch once.
#[derive(Clone, Debug, PartialEq)]
pub struct ExampleBatch {
    input_len: usize,
    output_len: usize,
    data: Vec<f64>,
}

impl ExampleBatch {
    /// Creates a zeroed batch of `len` examples shaped for `topology`.
    pub fn new(topology: &Topology, len: usize) -> Self {
        ExampleBatch::with_widths(topology.input_len(), topology.output_len(), len)
    }

    pub fn with_widths(input_len: usize, output_len: usize, len: usize) -> Self {
        ExampleBatch {
            input_len,
            output_len,
            data: vec![0.0; len * (input_len + output_len)],
        }
    }

    /// Builds a batch of `len` examples, filling each one with `fill`.
    pub fn from_fn<F>(topology: &Topology, len: usize, mut fill: F) -> Self
    where
        F: FnMut(usize, &mut [f64], &mut [f64]),
    {
        let mut batch = ExampleBatch::new(topology, len);
        for i in 0..len {
            let (input, expected) = batch.example_mut(i);
            fill(i, input, expected);
        }
        batch
    }

    pub fn example_len(&self) -> usize {
        self.input_len + self.output_len
    }

    /// Returns the number of examples.
    pub fn len(&self) -> usize {
        match self.example_len() {
            0 => 0,
            len => self.data.len() / len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns example `i` as a single `input ++ expected` span.
    pub fn example(&self, i: usize) -> &[f64] {
        let len = self.example_len();
        &self.data[i * len..(i + 1) * len]
    }

    /// Returns the input and expected-output halves of example `i`.
    pub fn example_mut(&mut self, i: usize) -> (&mut [f64], &mut [f64]) {
        let len = self.example_len();
        self.data[i * len..(i + 1) * len].split_at_mut(self.input_len)
    }

    /// Iterates over every example span, in order.
    pub fn examples(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.example_len())
    }
}

impl<'a> IntoIterator for &'a ExampleBatch {
    type Item = &'a [f64];
    type IntoIter = std::slice::ChunksExact<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.examples()
    }
}
