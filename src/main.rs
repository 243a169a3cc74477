//! Command-line host for the digit trainer.
//!
//! Reads an IDX image/label pair, trains the 784 → hidden → 10 network and
//! reports the mean absolute error (and accuracy) on an optional test pair.
//!
//! Run with:
//!   RUST_LOG=info cargo run --release -- \
//!       --train-images data/train-images.idx3-ubyte \
//!       --train-labels data/train-labels.idx1-ubyte

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use rand::{rngs::StdRng, SeedableRng};

use digit_trainer::{
    decode,
    network::network::{DEFAULT_HIDDEN_SIZE, INPUT_SIZE, OUTPUT_SIZE},
    Dataset, FeedforwardNetwork, Initialization, Result, TrainConfig,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Init {
    Uniform,
    He,
}

#[derive(Parser, Debug)]
#[command(version, about = "Train a two-layer digit classifier on IDX files")]
struct Args {
    #[arg(long)]
    train_images: PathBuf,

    #[arg(long)]
    train_labels: PathBuf,

    #[arg(long, requires = "test_labels")]
    test_images: Option<PathBuf>,

    #[arg(long, requires = "test_images")]
    test_labels: Option<PathBuf>,

    /// Width of the hidden layer
    #[arg(long, default_value_t = DEFAULT_HIDDEN_SIZE)]
    hidden: usize,

    /// JSON training config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    epochs: Option<usize>,

    /// Step size. Updates add `gradient * rate`, so a negative rate is
    /// needed for the error to fall
    #[arg(long, allow_hyphen_values = true)]
    learning_rate: Option<f32>,

    #[arg(long, value_enum, default_value_t = Init::Uniform)]
    init: Init,

    /// Seed for weight initialization
    #[arg(long)]
    seed: Option<u64>,
}

fn load(images: &Path, labels: &Path) -> Result<Dataset> {
    let image_bytes = std::fs::read(images)?;
    let label_bytes = std::fs::read(labels)?;
    let dataset = decode(&image_bytes, &label_bytes)?;
    info!(
        "loaded {} images of {}x{} from {}",
        dataset.len(), dataset.image_rows(), dataset.image_cols(), images.display()
    );
    Ok(dataset)
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrainConfig::load_json(path)?,
        None => TrainConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(lr) = args.learning_rate {
        config.learning_rate = lr;
    }

    let train_set = load(&args.train_images, &args.train_labels)?;
    let input_size = train_set.image_rows() * train_set.image_cols();
    if input_size != INPUT_SIZE {
        warn!("images have {} pixels, not the usual {}", input_size, INPUT_SIZE);
    }
    if config.learning_rate > 0.0 {
        warn!(
            "learning rate {} is positive; updates add the gradient, so the error will grow",
            config.learning_rate
        );
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let init = match args.init {
        Init::Uniform => Initialization::Uniform,
        Init::He => Initialization::He,
    };
    let mut network = FeedforwardNetwork::with_rng(
        input_size,
        args.hidden,
        OUTPUT_SIZE,
        init,
        &mut rng,
    );

    info!(
        "training {} -> {} -> {} for {} epochs, lr {}",
        network.input_size(), network.hidden_size(), network.output_size(),
        config.epochs, config.learning_rate
    );

    let mut last_tenth = None;
    network.train(
        &train_set,
        &config,
        |fraction| {
            let tenth = (fraction * 10.0) as u32;
            if last_tenth != Some(tenth) {
                last_tenth = Some(tenth);
                info!("{:.0}% of epoch", fraction * 100.0);
            }
        },
        |epoch| info!("finished epoch {}", epoch),
    )?;

    if let (Some(images), Some(labels)) = (&args.test_images, &args.test_labels) {
        let test_set = load(images, labels)?;
        let mae = network.evaluate_mean_absolute_error(&test_set, config.normalize)?;
        let accuracy = network.accuracy(&test_set, config.normalize)?;
        info!("test mean absolute error {:.4}, accuracy {:.2}%", mae, accuracy * 100.0);
        println!("{}", mae);
    }

    Ok(())
}

fn main() {
    pretty_env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
