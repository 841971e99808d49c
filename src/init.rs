//! Weight and bias initialization strategies.

use crate::error::{Error, Result};

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// How to fill a network's weights and biases before training.
///
/// Bias ranges are inclusive `(min, max)` pairs.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Init {
    /// Weights and biases drawn from independent uniform ranges.
    Uniform {
        weights: (f64, f64),
        biases: (f64, f64),
    },
    /// Weights drawn uniformly from `±sqrt(6 / (fan_in + fan_out))`.
    XavierUniform { biases: (f64, f64) },
    /// Weights drawn from `N(0, sqrt(2 / (fan_in + fan_out)))`.
    XavierNormal { biases: (f64, f64) },
}

/// A sampler for one kind of parameter.
pub(crate) enum Sampler {
    Uniform(Uniform<f64>),
    Normal(Normal<f64>),
}

impl Sampler {
    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Uniform(dist) => dist.sample(rng),
            Sampler::Normal(dist) => dist.sample(rng),
        }
    }
}

impl Init {
    /// Builds the weight and bias samplers.
    ///
    /// `fan_in` and `fan_out` are the widths of the whole network's input
    /// and output layers; every layer shares the same weight spread.
    pub(crate) fn samplers(&self, fan_in: usize, fan_out: usize) -> Result<(Sampler, Sampler)> {
        let fans = (fan_in + fan_out) as f64;
        match *self {
            Init::Uniform { weights, biases } => Ok((
                Sampler::Uniform(uniform("weight", weights)?),
                Sampler::Uniform(uniform("bias", biases)?),
            )),
            Init::XavierUniform { biases } => {
                let limit = (6.0 / fans).sqrt();
                Ok((
                    Sampler::Uniform(uniform("weight", (-limit, limit))?),
                    Sampler::Uniform(uniform("bias", biases)?),
                ))
            }
            Init::XavierNormal { biases } => {
                let std_dev = (2.0 / fans).sqrt();
                let normal =
                    Normal::new(0.0, std_dev).map_err(|e| Error::Distribution(e.to_string()))?;
                Ok((
                    Sampler::Normal(normal),
                    Sampler::Uniform(uniform("bias", biases)?),
                ))
            }
        }
    }
}

fn uniform(what: &str, (min, max): (f64, f64)) -> Result<Uniform<f64>> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(Error::Distribution(format!(
            "{} range [{}, {}] is empty or not finite",
            what, min, max
        )));
    }
    Ok(Uniform::new_inclusive(min, max))
}
