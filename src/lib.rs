//! A dense feed-forward neural network engine.
//!
//! Every activation, bias and weight of a [`Network`] lives in one packed
//! buffer whose layout is derived from its [`Topology`]. Networks built in
//! [`Mode::Training`] additionally keep pre-activations and a parallel
//! gradient buffer, which backpropagation fills and [`Network::train`] uses
//! for mini-batch gradient descent.

pub mod activator;
pub mod data;
pub mod error;
pub mod feed_forward;
pub mod init;
pub mod session;
pub mod store;
pub mod topology;
pub mod trainer;

mod cost;
mod utils;

pub use activator::Activator;
pub use data::ExampleBatch;
pub use error::{Error, IndexError, Result, TopologyError};
pub use feed_forward::Network;
pub use init::Init;
pub use session::TrainingSession;
pub use store::{Layout, Mode};
pub use topology::Topology;
pub use trainer::{Logging, Report, StopCondition, Trainer};
