//! Errors reported by the network engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The layer sizes or activators describe an impossible network.
    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    /// A layer or node index was out of range.
    #[error("index out of range: {0}")]
    Index(#[from] IndexError),

    /// An input, expected output or example span had the wrong width.
    #[error("{what} has length {actual}, expected {expected}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A gradient operation was requested from an inference-only network.
    #[error("gradient tracking is disabled for this network")]
    GradientsDisabled,

    /// A training step was requested with no examples.
    #[error("a training batch must contain at least one example")]
    EmptyBatch,

    /// An initialization distribution could not be built.
    #[error("invalid distribution: {0}")]
    Distribution(String),

    /// A training hyperparameter was out of range.
    #[error("invalid hyperparameter: {0}")]
    Hyperparameter(String),

    /// The background training thread panicked.
    #[error("training worker panicked")]
    WorkerPanicked,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("a network needs at least 2 layers, got {0}")]
    TooFewLayers(usize),

    #[error("layer {0} has no nodes")]
    EmptyLayer(usize),

    #[error("expected {expected} activators (one per non-input layer), got {actual}")]
    ActivatorCount { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// `layer` is outside `min..layers`. Parameter accessors use `min = 1`
    /// since the input layer has no biases or weights.
    #[error("layer {layer} is outside {min}..{layers}")]
    Layer {
        layer: usize,
        min: usize,
        layers: usize,
    },

    #[error("node {node} is out of range for layer {layer} with {len} nodes")]
    Node { layer: usize, node: usize, len: usize },
}

impl Error {
    pub(crate) fn size_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::SizeMismatch {
            what,
            expected,
            actual,
        }
    }
}
