use anyhow::{bail, Context};
use digitnet::config::Config;
use digitnet::dataset::{self, Dataset};
use digitnet::trainer::evaluate;
use digitnet::Error;
use log::{info, warn};
use std::env;
use std::time::Instant;

const USAGE: &str = "usage: train <images> <labels> [<test-images> <test-labels>] \
                     [--config <file.json>] [--custom <sample-store>]";

struct Args {
    images: String,
    labels: String,
    test: Option<(String, String)>,
    config: Option<String>,
    custom: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut custom = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(args.next().context(USAGE)?),
            "--custom" => custom = Some(args.next().context(USAGE)?),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let (images, labels) = match (positional.next(), positional.next()) {
        (Some(images), Some(labels)) => (images, labels),
        _ => bail!(USAGE),
    };
    let test = match (positional.next(), positional.next()) {
        (Some(images), Some(labels)) => Some((images, labels)),
        (None, None) => None,
        _ => bail!(USAGE),
    };
    Ok(Args {
        images,
        labels,
        test,
        config,
        custom,
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    let mut network = config.network()?;
    if let Some(path) = config.checkpoint_path() {
        match network.load(path) {
            Ok(()) => {}
            Err(Error::FileMissing { .. }) => info!("Starting from a fresh network"),
            Err(err) => return Err(err).context("failed to resume from checkpoint"),
        }
    }

    let train = Dataset::from_idx(&args.images, &args.labels, config.output_size)?;
    let trainer = config.trainer();

    let start = Instant::now();
    let report = trainer.train(&mut network, train.inputs(), train.targets())?;
    info!(
        "Training network took {:.2}s ({} batches, {} epochs in total)",
        start.elapsed().as_secs_f64(),
        report.batches,
        report.total_epochs
    );

    if let Some(store) = &args.custom {
        let samples = dataset::load_samples(store)?;
        if samples.is_empty() {
            warn!("The sample store {store} is empty");
        } else {
            let custom = Dataset::from_samples(samples, config.output_size)?;
            info!("Fine tuning on {} custom samples", custom.len());
            trainer.train(&mut network, custom.inputs(), custom.targets())?;
        }
    }

    if let Some((images, labels)) = &args.test {
        let test = Dataset::from_idx(images, labels, config.output_size)?;
        let evaluation = evaluate(&network, test.inputs(), test.labels())?;
        info!(
            "Test accuracy: {:.2}% ({}/{})",
            evaluation.accuracy(),
            evaluation.correct,
            evaluation.total
        );
    }
    Ok(())
}
