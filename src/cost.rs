//! Squared-error cost and classification accuracy.

use crate::error::{Error, Result};
use crate::feed_forward::Network;
use crate::utils::{argmax, squared_error};

impl Network {
    /// Runs the network on `input` and returns `sum((predicted - expected)^2)`.
    ///
    /// Overwrites the network's activations.
    pub fn cost(&mut self, input: &[f64], expected: &[f64]) -> Result<f64> {
        if expected.len() != self.output_len() {
            return Err(Error::size_mismatch(
                "expected output",
                self.output_len(),
                expected.len(),
            ));
        }
        let output = self.run(input)?;
        Ok(squared_error(output, expected))
    }

    /// Returns the mean `cost` over `input ++ expected` example spans.
    pub fn average_cost<I>(&mut self, examples: I) -> Result<f64>
    where
        I: IntoIterator,
        I::Item: AsRef<[f64]>,
    {
        let mut total = 0.0;
        let mut count = 0;
        for example in examples {
            let (input, expected) = self.split_example(example.as_ref())?;
            total += self.cost(input, expected)?;
            count += 1;
        }
        if count == 0 {
            return Err(Error::EmptyBatch);
        }
        Ok(total / count as f64)
    }

    /// Returns the fraction of examples whose largest output is at the same
    /// position as the largest expected output.
    pub fn accuracy<I>(&mut self, examples: I) -> Result<f64>
    where
        I: IntoIterator,
        I::Item: AsRef<[f64]>,
    {
        let mut correct = 0;
        let mut count = 0;
        for example in examples {
            let (input, expected) = self.split_example(example.as_ref())?;
            let predicted = argmax(self.run(input)?);
            if predicted.is_some() && predicted == argmax(expected) {
                correct += 1;
            }
            count += 1;
        }
        if count == 0 {
            return Err(Error::EmptyBatch);
        }
        Ok(correct as f64 / count as f64)
    }
}
