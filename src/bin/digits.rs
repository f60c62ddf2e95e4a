//! Trains a digit classifier on a CSV training set and reports its accuracy
//! on a CSV test set.

use clap::Parser;
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use digitnet::config::{load_config, Config};
use digitnet::data::{load_csv, LoadOptions};
use digitnet::feedforward::{accuracy, Net};

#[derive(Parser, Debug)]
#[command(
    name = "digits",
    about = "Train a sigmoid feedforward network on labeled pixel rows"
)]
struct Args {
    /// Training set, one `label,p_0,...,p_N` record per line
    #[arg(long, default_value = "mnist_train.csv")]
    train: PathBuf,

    /// Test set, same format as the training set
    #[arg(long, default_value = "mnist_test.csv")]
    test: PathBuf,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of hidden layers
    #[arg(long)]
    hidden_layers: Option<usize>,

    /// Neurons in each hidden layer
    #[arg(long)]
    neurons: Option<usize>,

    /// Mini-batch size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Gradient step multiplier
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Seed for weight initialization and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Read at most this many training records
    #[arg(long)]
    train_limit: Option<usize>,

    /// Read at most this many test records
    #[arg(long)]
    test_limit: Option<usize>,

    /// Skip the first line of both CSV files
    #[arg(long, default_value_t = false)]
    header: bool,

    /// Evaluate on the test set after every epoch
    #[arg(long, default_value_t = false)]
    eval_every_epoch: bool,
}

impl Args {
    fn config(&self) -> Result<Config, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };

        let network = &mut config.network;
        if let Some(v) = self.hidden_layers {
            network.hidden_layers = v;
        }
        if let Some(v) = self.neurons {
            network.neurons_per_hidden_layer = v;
        }

        let training = &mut config.training;
        if let Some(v) = self.batch_size {
            training.batch_size = v;
        }
        if let Some(v) = self.epochs {
            training.epochs = v;
        }
        if let Some(v) = self.learning_rate {
            training.learning_rate = v;
        }
        if self.seed.is_some() {
            training.seed = self.seed;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = args.config()?;
    info!("{:?}", config);

    let mut rng = match config.training.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let options = LoadOptions {
        pixels: config.network.input_features,
        max_records: args.train_limit,
        has_header: args.header,
    };
    let started = Instant::now();
    let mut train_samples = load_csv(&args.train, &options)?;
    info!(
        "loaded {} training samples from {} in {:.2?}",
        train_samples.len(),
        args.train.display(),
        started.elapsed()
    );

    let test_options = LoadOptions {
        max_records: args.test_limit,
        ..options
    };
    let test_samples = load_csv(&args.test, &test_options)?;
    info!(
        "loaded {} test samples from {}",
        test_samples.len(),
        args.test.display()
    );
    if test_samples.is_empty() {
        warn!("test set is empty, accuracy will be reported as 0");
    }

    let net = Net::new(&config.network, &mut rng)?;
    info!("network geometry {:?}", net.geometry());
    let mut trainer = net.build_trainer(config.training.clone())?;

    let started = Instant::now();
    let eval_every_epoch = args.eval_every_epoch;
    trainer.train_with(&mut train_samples, &mut rng, |net, report| {
        if eval_every_epoch {
            let score = accuracy(net, &test_samples)?;
            info!(
                "epoch {}: test accuracy {:.4}%",
                report.epoch + 1,
                score * 100.0
            );
        }
        Ok(())
    })?;
    info!("training took {:.2?}", started.elapsed());

    let net = trainer.teardown();
    let score = accuracy(&net, &test_samples)?;
    println!("model achieved {:.4}% accuracy", score * 100.0);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
