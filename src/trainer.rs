//! Utilities for training neural networks.

use crate::data::ExampleBatch;
use crate::error::{Error, Result};
use crate::feed_forward::Network;
use crate::store::Mode;

use log::info;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A builder for mini-batch gradient descent runs.
///
/// Every step asks a sampler to refill a reusable `ExampleBatch`, then
/// performs one `Network::train` step on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trainer {
    learning_rate: f64,
    batch_size: usize,
    logging: Logging,
    stop_condition: StopCondition,
}

impl Default for Trainer {
    fn default() -> Self {
        Trainer::new()
    }
}

impl Trainer {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * A learning rate of 0.01.
    /// * A batch size of 1.
    /// * Stops after 1000 training steps.
    /// * Logs on training completion.
    pub fn new() -> Self {
        Trainer {
            learning_rate: 0.01,
            batch_size: 1,
            logging: Logging::Completion,
            stop_condition: StopCondition::Steps(1000),
        }
    }

    /// Sets the learning rate to use during gradient descent.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Sets the number of examples averaged into each step.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Sets the condition to finish training.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_condition = condition.into();
        self
    }

    /// Verifies the hyperparameters against `network`.
    pub fn validate(&self, network: &Network) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::Hyperparameter(format!(
                "learning rate must be finite and positive, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::EmptyBatch);
        }
        match network.mode() {
            Mode::Training => Ok(()),
            Mode::Inference => Err(Error::GradientsDisabled),
        }
    }

    /// Returns an empty batch shaped for `network`.
    pub fn new_batch(&self, network: &Network) -> ExampleBatch {
        ExampleBatch::new(network.topology(), self.batch_size)
    }

    /// Trains `network` until the stop condition is met.
    ///
    /// `sampler` is called once per step to refill the batch with fresh
    /// examples.
    pub fn train<F>(&self, network: &mut Network, sampler: F) -> Result<Report>
    where
        F: FnMut(&mut ExampleBatch),
    {
        let stop = AtomicBool::new(false);
        let steps = AtomicU64::new(0);
        self.train_until(network, sampler, &stop, &steps)
    }

    /// Like `train`, but also stops as soon as `stop` is raised and publishes
    /// the number of completed steps through `steps`.
    ///
    /// `stop` is only checked between steps, so the network is always left
    /// after a complete update.
    pub fn train_until<F>(
        &self,
        network: &mut Network,
        mut sampler: F,
        stop: &AtomicBool,
        steps: &AtomicU64,
    ) -> Result<Report>
    where
        F: FnMut(&mut ExampleBatch),
    {
        self.validate(network)?;
        let batch = self.new_batch(network);
        self.run(batch, &mut sampler, stop, steps, |batch, rate| {
            network.train(batch, rate)
        })
    }

    /// The step loop shared with background sessions. `step` performs one
    /// update and returns the batch cost.
    pub(crate) fn run<F, S>(
        &self,
        mut batch: ExampleBatch,
        sampler: &mut F,
        stop: &AtomicBool,
        steps: &AtomicU64,
        mut step: S,
    ) -> Result<Report>
    where
        F: FnMut(&mut ExampleBatch),
        S: FnMut(&ExampleBatch, f64) -> Result<f64>,
    {
        let mut progress = Progress::start();
        while !stop.load(Ordering::Relaxed) {
            sampler(&mut batch);
            let cost = step(&batch, self.learning_rate)?;
            steps.fetch_add(1, Ordering::Relaxed);
            progress.record(cost);

            self.logging.step(progress.steps, cost);
            if self.stop_condition.should_stop(&progress) {
                break;
            }
        }
        let report = progress.finish();
        self.logging.completion(&report);
        Ok(report)
    }
}

/// Progress of a run, used for logging and stop conditions.
#[derive(Copy, Clone, Debug)]
struct Progress {
    steps: u64,
    last_cost: f64,
    start_time: Instant,
}

impl Progress {
    fn start() -> Self {
        Progress {
            steps: 0,
            last_cost: f64::NAN,
            start_time: Instant::now(),
        }
    }

    fn record(&mut self, cost: f64) {
        self.steps += 1;
        self.last_cost = cost;
    }

    fn finish(self) -> Report {
        Report {
            steps: self.steps,
            last_cost: self.last_cost,
            elapsed: self.start_time.elapsed(),
        }
    }
}

/// A summary of a finished training run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Report {
    /// Number of gradient descent steps performed.
    pub steps: u64,
    /// Average cost of the last batch, before its update. NaN if no step ran.
    pub last_cost: f64,
    pub elapsed: Duration,
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` training steps
    Steps(u64),
}

impl Logging {
    /// Performs logging at the current `step` of training.
    fn step(&self, step: u64, cost: f64) {
        if let Logging::Steps(freq) = *self {
            if freq > 0 && step % freq == 0 {
                info!("Step {}:\tcost={}", step, cost);
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, report: &Report) {
        if let Logging::Silent = *self {
            return;
        }
        info!(
            "Ran {} steps in {:.2} seconds.",
            report.steps,
            report.elapsed.as_secs_f64()
        );
        info!("Final batch cost: {}", report.last_cost);
    }
}

/// When to stop training
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StopCondition {
    /// Stops after the provided number of training steps
    Steps(u64),
    /// Stops when the batch cost drops below the provided threshold
    CostThreshold(f64),
    /// Stops after the provided duration
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    /// Returns true if training is complete.
    fn should_stop(&self, progress: &Progress) -> bool {
        match *self {
            StopCondition::Steps(steps) => progress.steps >= steps,
            StopCondition::CostThreshold(threshold) => progress.last_cost < threshold,
            StopCondition::Duration(duration) => progress.start_time.elapsed() > duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Activator;
    use crate::init::Init;
    use crate::topology::Topology;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn network(mode: Mode) -> Network {
        let topology =
            Topology::with_activators(&[1, 4, 1], Activator::TanH, Activator::Identity).unwrap();
        let mut network = Network::new(topology, mode);
        let mut rng = StdRng::seed_from_u64(17);
        network
            .initialize(&Init::XavierNormal { biases: (-0.01, 0.01) }, &mut rng)
            .unwrap();
        network
    }

    fn constant_sampler(seed: u64) -> impl FnMut(&mut ExampleBatch) {
        let mut rng = StdRng::seed_from_u64(seed);
        move |batch: &mut ExampleBatch| {
            for i in 0..batch.len() {
                let (input, expected) = batch.example_mut(i);
                input[0] = rng.gen_range(-1.0..1.0);
                expected[0] = 0.3;
            }
        }
    }

    #[test]
    fn runs_requested_number_of_steps() {
        let mut network = network(Mode::Training);
        let report = Trainer::new()
            .batch_size(4)
            .logging(Logging::Silent)
            .stop_condition(StopCondition::Steps(25))
            .train(&mut network, constant_sampler(1))
            .unwrap();
        assert_eq!(report.steps, 25);
        assert!(report.last_cost.is_finite());
    }

    #[test]
    fn stops_below_cost_threshold() {
        let mut network = network(Mode::Training);
        // A single fixed input makes this plain regression on a constant.
        let sampler = |batch: &mut ExampleBatch| {
            for i in 0..batch.len() {
                let (input, expected) = batch.example_mut(i);
                input[0] = 0.0;
                expected[0] = 0.3;
            }
        };
        let report = Trainer::new()
            .learning_rate(0.05)
            .batch_size(8)
            .logging(Logging::Silent)
            .stop_condition(StopCondition::CostThreshold(1e-3))
            .train(&mut network, sampler)
            .unwrap();
        assert!(report.last_cost < 1e-3);
    }

    #[test]
    fn raised_stop_flag_prevents_any_step() {
        let mut network = network(Mode::Training);
        let before = network.store().values().to_vec();
        let stop = AtomicBool::new(true);
        let steps = AtomicU64::new(0);
        let report = Trainer::new()
            .logging(Logging::Silent)
            .train_until(&mut network, constant_sampler(3), &stop, &steps)
            .unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(steps.load(Ordering::Relaxed), 0);
        assert_eq!(network.store().values(), &before[..]);
    }

    #[test]
    fn rejects_bad_hyperparameters() {
        let mut network = network(Mode::Training);
        let result = Trainer::new()
            .learning_rate(-1.0)
            .train(&mut network, constant_sampler(4));
        assert!(matches!(result, Err(Error::Hyperparameter(_))));

        let result = Trainer::new().batch_size(0).train(&mut network, constant_sampler(4));
        assert_eq!(result, Err(Error::EmptyBatch));
    }

    #[test]
    fn inference_network_cannot_train() {
        let mut network = network(Mode::Inference);
        let result = Trainer::new()
            .logging(Logging::Silent)
            .train(&mut network, constant_sampler(5));
        assert_eq!(result, Err(Error::GradientsDisabled));
    }

    #[test]
    fn duration_converts_into_stop_condition() {
        let trainer = Trainer::new().stop_condition(Duration::from_millis(5));
        assert_eq!(
            trainer.stop_condition,
            StopCondition::Duration(Duration::from_millis(5))
        );
    }
}
