//! Training on a background thread.
//!
//! The network moves behind a mutex that the worker holds for exactly one
//! training step at a time. Other threads can watch the step counter, read
//! the network between steps, and stop the run cooperatively.

use crate::data::ExampleBatch;
use crate::error::{Error, Result};
use crate::feed_forward::Network;
use crate::trainer::{Report, Trainer};

use log::debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// A cancellable training run.
///
/// Dropping a session stops the worker and waits for it to exit.
pub struct TrainingSession {
    network: Arc<Mutex<Network>>,
    stop: Arc<AtomicBool>,
    steps: Arc<AtomicU64>,
    /// Taken by `join`.
    handle: Option<JoinHandle<Result<Report>>>,
}

impl TrainingSession {
    /// Starts training `network` with `trainer` on a new thread.
    ///
    /// The hyperparameters are validated up front, so a misconfigured run
    /// never starts.
    pub fn spawn<F>(network: Network, trainer: Trainer, mut sampler: F) -> Result<Self>
    where
        F: FnMut(&mut ExampleBatch) + Send + 'static,
    {
        trainer.validate(&network)?;
        let batch = trainer.new_batch(&network);

        let network = Arc::new(Mutex::new(network));
        let stop = Arc::new(AtomicBool::new(false));
        let steps = Arc::new(AtomicU64::new(0));

        let handle = {
            let network = Arc::clone(&network);
            let stop = Arc::clone(&stop);
            let steps = Arc::clone(&steps);
            thread::spawn(move || {
                debug!("Training worker started");
                let report = trainer.run(batch, &mut sampler, &stop, &steps, |batch, rate| {
                    lock(&network).train(batch, rate)
                });
                debug!("Training worker finished");
                report
            })
        };

        Ok(TrainingSession {
            network,
            stop,
            steps,
            handle: Some(handle),
        })
    }

    /// Returns the number of completed training steps.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// Returns true once the worker has exited, either because its stop
    /// condition was met or because it was stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Returns the flag that stops the worker when raised, e.g. from a signal
    /// handler.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Runs `f` on the network between two training steps.
    ///
    /// Taking `&mut Network` allows read-back operations that run forward
    /// passes, such as computing cost on a held-out set. Parameters should
    /// not be changed while the worker is running.
    pub fn inspect<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut Network) -> T,
    {
        let mut network = lock(&self.network);
        f(&mut *network)
    }

    /// Asks the worker to stop after its current step, then waits for it.
    pub fn stop(self) -> (Network, Result<Report>) {
        self.stop.store(true, Ordering::Relaxed);
        self.join()
    }

    /// Waits for the worker to finish on its own.
    ///
    /// The network comes back even when training failed, holding the
    /// parameters of the last completed step.
    pub fn join(mut self) -> (Network, Result<Report>) {
        let report = match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(Err(Error::WorkerPanicked)),
            None => Err(Error::WorkerPanicked),
        };
        let shared = Arc::clone(&self.network);
        drop(self);
        let network = match Arc::try_unwrap(shared) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            // The worker's clone is dropped once it has been joined.
            Err(shared) => lock(&shared).clone(),
        };
        match &report {
            Ok(report) => debug!("Training session joined after {} steps", report.steps),
            Err(err) => debug!("Training session failed: {}", err),
        }
        (network, report)
    }
}

impl Drop for TrainingSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.store(true, Ordering::Relaxed);
            if handle.join().is_err() {
                debug!("Dropped a training session whose worker panicked");
            }
        }
    }
}

fn lock(network: &Mutex<Network>) -> MutexGuard<'_, Network> {
    network.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Activator;
    use crate::init::Init;
    use crate::store::Mode;
    use crate::topology::Topology;
    use crate::trainer::{Logging, StopCondition};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::Duration;

    fn network(mode: Mode) -> Network {
        let topology =
            Topology::with_activators(&[1, 3, 1], Activator::TanH, Activator::Identity).unwrap();
        let mut network = Network::new(topology, mode);
        let mut rng = StdRng::seed_from_u64(5);
        network
            .initialize(&Init::XavierUniform { biases: (-0.01, 0.01) }, &mut rng)
            .unwrap();
        network
    }

    fn sampler() -> impl FnMut(&mut ExampleBatch) + Send + 'static {
        let mut rng = StdRng::seed_from_u64(8);
        move |batch: &mut ExampleBatch| {
            for i in 0..batch.len() {
                let (input, expected) = batch.example_mut(i);
                input[0] = rng.gen_range(-1.0..1.0);
                expected[0] = input[0] * 0.5;
            }
        }
    }

    #[test]
    fn runs_to_completion() {
        let trainer = Trainer::new()
            .batch_size(4)
            .logging(Logging::Silent)
            .stop_condition(StopCondition::Steps(50));
        let session = TrainingSession::spawn(network(Mode::Training), trainer, sampler()).unwrap();
        let (network, report) = session.join();
        assert_eq!(report.unwrap().steps, 50);
        assert_eq!(network.mode(), Mode::Training);
    }

    #[test]
    fn stops_between_steps() {
        let trainer = Trainer::new()
            .logging(Logging::Silent)
            .stop_condition(StopCondition::Steps(u64::MAX));
        let session = TrainingSession::spawn(network(Mode::Training), trainer, sampler()).unwrap();
        while session.steps() < 10 {
            thread::sleep(Duration::from_millis(1));
        }
        let output = session.inspect(|network| network.run(&[0.5]).unwrap()[0]);
        assert!(output.is_finite());

        let (network, report) = session.stop();
        assert!(report.unwrap().steps >= 10);
        assert_eq!(network.parameter_count(), 3 + 3 + 1 + 3);
    }

    #[test]
    fn external_stop_flag() {
        let trainer = Trainer::new()
            .logging(Logging::Silent)
            .stop_condition(StopCondition::Steps(u64::MAX));
        let session = TrainingSession::spawn(network(Mode::Training), trainer, sampler()).unwrap();
        session.stop_flag().store(true, Ordering::Relaxed);
        while !session.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        let steps = session.steps();
        let (_, report) = session.join();
        assert_eq!(report.unwrap().steps, steps);
    }

    #[test]
    fn refuses_to_start_without_gradients() {
        let result = TrainingSession::spawn(network(Mode::Inference), Trainer::new(), sampler());
        assert!(matches!(result, Err(Error::GradientsDisabled)));
    }

    #[test]
    fn dropping_stops_the_worker() {
        let trainer = Trainer::new()
            .logging(Logging::Silent)
            .stop_condition(StopCondition::Steps(u64::MAX));
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let mut inner = sampler();
        let session = TrainingSession::spawn(network(Mode::Training), trainer, move |batch| {
            counter.fetch_add(1, Ordering::Relaxed);
            inner(batch)
        })
        .unwrap();
        while session.steps() < 5 {
            thread::sleep(Duration::from_millis(1));
        }
        drop(session);

        // The worker has exited and released its sampler.
        assert_eq!(Arc::strong_count(&calls), 1);
        let after_drop = calls.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::Relaxed), after_drop);
    }

    #[test]
    fn failed_run_still_returns_the_network() {
        let trainer = Trainer::new()
            .logging(Logging::Silent)
            .stop_condition(StopCondition::Steps(u64::MAX));
        let mut calls = 0;
        let mut inner = sampler();
        let session = TrainingSession::spawn(network(Mode::Training), trainer, move |batch| {
            calls += 1;
            if calls > 3 {
                panic!("sampler ran dry");
            }
            inner(batch)
        })
        .unwrap();

        let (mut network, report) = session.join();
        assert!(matches!(report, Err(Error::WorkerPanicked)));
        assert_eq!(network.parameter_count(), 3 + 3 + 1 + 3);
        assert!(network.run(&[0.5]).unwrap()[0].is_finite());
    }
}
