use clap::{Parser, ValueEnum};
use log::LevelFilter;
use neural::{
    Activator, ExampleBatch, Init, Logging, Mode, Network, StopCondition, Topology, Trainer,
    TrainingSession,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simplelog::{Config, SimpleLogger};
use std::error::Error;
use std::sync::atomic::Ordering;

/// Fits a small network to a one-dimensional target function.
#[derive(Parser, Debug, Clone)]
#[command(name = "train")]
struct Args {
    /// Comma separated layer sizes. The first and last must be 1.
    #[arg(long, value_delimiter = ',', default_value = "1,16,16,1")]
    layers: Vec<usize>,

    /// Activation function of the hidden layers.
    #[arg(long, value_enum, default_value_t = Activation::LeakyRelu)]
    activation: Activation,

    /// Activation function of the output layer.
    #[arg(long, value_enum, default_value_t = Activation::LeakyRelu)]
    output_activation: Activation,

    /// Function to fit.
    #[arg(long, value_enum, default_value_t = Target::Gaussian)]
    target: Target,

    /// Number of gradient descent steps.
    #[arg(long, default_value_t = 100_000)]
    steps: u64,

    /// Examples per step.
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.01)]
    learning_rate: f64,

    /// Seed for initialization and sampling.
    #[arg(long, default_value_t = 2727272)]
    seed: u64,

    /// Log the batch cost every this many steps (0 disables).
    #[arg(long, default_value_t = 1000)]
    log_every: u64,

    /// Number of held-out examples used to score the network.
    #[arg(long, default_value_t = 500)]
    test_size: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Activation {
    Relu,
    LeakyRelu,
    Tanh,
    Sigmoid,
    Identity,
}

impl From<Activation> for Activator {
    fn from(activation: Activation) -> Self {
        match activation {
            Activation::Relu => Activator::ReLU,
            Activation::LeakyRelu => Activator::LeakyReLU(0.01),
            Activation::Tanh => Activator::TanH,
            Activation::Sigmoid => Activator::Sigmoid,
            Activation::Identity => Activator::Identity,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Target {
    /// A narrow bump centered on 0.5, sampled on [0, 1].
    Gaussian,
    /// 1 where `x mod 1 > 0.5`, sampled on [-6, 6].
    Step,
}

impl Target {
    fn domain(&self) -> (f64, f64) {
        match self {
            Target::Gaussian => (0.0, 1.0),
            Target::Step => (-6.0, 6.0),
        }
    }

    fn eval(&self, x: f64) -> f64 {
        match self {
            Target::Gaussian => gaussian(0.5, 0.1, x) * 0.2,
            Target::Step => if x % 1.0 > 0.5 { 1.0 } else { 0.0 },
        }
    }

    fn fill<R: Rng>(&self, rng: &mut R, batch: &mut ExampleBatch) {
        let (lo, hi) = self.domain();
        for i in 0..batch.len() {
            let (input, expected) = batch.example_mut(i);
            input[0] = rng.gen_range(lo..hi);
            expected[0] = self.eval(input[0]);
        }
    }
}

fn gaussian(mean: f64, std_dev: f64, x: f64) -> f64 {
    let a = (x - mean) / std_dev;
    (-0.5 * a * a).exp() / (std_dev * (2.0 * std::f64::consts::PI).sqrt())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    let topology = Topology::with_activators(
        &args.layers,
        args.activation.into(),
        args.output_activation.into(),
    )?;
    if topology.input_len() != 1 || topology.output_len() != 1 {
        return Err("the input and output layers must have exactly 1 node".into());
    }

    let mut network = Network::new(topology, Mode::Training);
    let mut rng = StdRng::seed_from_u64(args.seed);
    network.initialize(&Init::XavierNormal { biases: (-0.01, 0.01) }, &mut rng)?;
    log::info!(
        "Created network {:?} with {} parameters",
        args.layers,
        network.parameter_count()
    );

    let mut test_set = ExampleBatch::new(network.topology(), args.test_size);
    args.target.fill(&mut rng, &mut test_set);
    if !test_set.is_empty() {
        log::info!("Initial test cost: {:.5}", network.average_cost(&test_set)?);
    }

    let trainer = Trainer::new()
        .learning_rate(args.learning_rate)
        .batch_size(args.batch_size)
        .logging(Logging::Steps(args.log_every))
        .stop_condition(StopCondition::Steps(args.steps));
    let target = args.target;
    let mut sample_rng = StdRng::seed_from_u64(args.seed.wrapping_add(1));
    let session = TrainingSession::spawn(network, trainer, move |batch| {
        target.fill(&mut sample_rng, batch)
    })?;

    let stop_flag = session.stop_flag();
    ctrlc::set_handler(move || {
        log::info!("Received SIGINT, stopping training...");
        stop_flag.store(true, Ordering::Relaxed);
    })?;

    let (mut network, report) = session.join();
    let report = report?;
    log::info!("Trained for {} steps", report.steps);

    let (lo, hi) = args.target.domain();
    let samples = 40;
    for i in 0..=samples {
        let x = lo + (hi - lo) * i as f64 / samples as f64;
        let y = network.run(&[x])?[0];
        println!("{:.3}, {:.3}, {:.3}", x, y, args.target.eval(x));
    }

    if !test_set.is_empty() {
        println!("test cost: {:.5}", network.average_cost(&test_set)?);
    }
    Ok(())
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    SimpleLogger::init(LevelFilter::Info, Config::default())?;

    Ok(args)
}
