//! Activation function types.

use serde::{Deserialize, Serialize};

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types.
///
/// Both `f` and `fprime` take the node's *pre-activation* (its weighted sum
/// plus bias), which the network keeps around while tracking gradients.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activator {
    /// Rectified Linear Unit
    ReLU,
    /// Leaky Rectified Linear Unit
    ///
    /// Takes an `alpha` value to use for negative inputs.
    LeakyReLU(f64),
    /// Logistic sigmoid function
    Sigmoid,
    /// Hyperbolic tan function
    TanH,
    /// The identity function, for linear output layers
    Identity,
}

impl Activator {
    /// Evaluates `f(x)` for the selected the activation function.
    pub fn f(&self, x: f64) -> f64 {
        match *self {
            Activator::ReLU => if x < 0.0 { 0.0 } else { x },
            Activator::LeakyReLU(alpha) => if x < 0.0 { alpha * x } else { x },
            Activator::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activator::TanH => x.tanh(),
            Activator::Identity => x,
        }
    }

    /// Evaluates the derivative `f'(x)` at the pre-activation `x`.
    pub fn fprime(&self, x: f64) -> f64 {
        match *self {
            Activator::ReLU => if x < 0.0 { 0.0 } else { 1.0 },
            Activator::LeakyReLU(alpha) => if x < 0.0 { alpha } else { 1.0 },
            Activator::Sigmoid => {
                let s = self.f(x);
                s * (1.0 - s)
            }
            Activator::TanH => {
                let t = x.tanh();
                1.0 - t * t
            }
            Activator::Identity => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ALL: [Activator; 5] = [
        Activator::ReLU,
        Activator::LeakyReLU(0.01),
        Activator::Sigmoid,
        Activator::TanH,
        Activator::Identity,
    ];

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-6;
        for activator in ALL.iter() {
            // Stay away from the ReLU kink at zero.
            for &x in &[-2.3, -0.7, 0.4, 1.9] {
                let numeric = (activator.f(x + h) - activator.f(x - h)) / (2.0 * h);
                assert_abs_diff_eq!(activator.fprime(x), numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn rectifiers() {
        assert_eq!(Activator::ReLU.f(-3.0), 0.0);
        assert_eq!(Activator::ReLU.f(2.5), 2.5);
        assert_eq!(Activator::ReLU.fprime(0.0), 1.0);
        assert_eq!(Activator::LeakyReLU(0.1).f(-2.0), -0.2);
        assert_eq!(Activator::LeakyReLU(0.1).fprime(-2.0), 0.1);
    }

    #[test]
    fn squashing_ranges() {
        assert_abs_diff_eq!(Activator::Sigmoid.f(0.0), 0.5);
        assert_abs_diff_eq!(Activator::TanH.f(0.0), 0.0);
        assert!(Activator::Sigmoid.f(50.0) <= 1.0);
        assert!(Activator::TanH.f(-50.0) >= -1.0);
    }
}
