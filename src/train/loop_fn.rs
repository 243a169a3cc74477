use std::time::Instant;

use log::{debug, info};

use crate::data::encoding::label_to_one_hot;
use crate::data::idx::Dataset;
use crate::error::Result;
use crate::loss::mae::MaeLoss;
use crate::network::network::FeedforwardNetwork;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the statistics
/// of every epoch that ran.
///
/// `progress` is forwarded to `run_epoch`. `epoch_finish` receives the
/// 1-based index of each epoch that completed over the whole dataset.
///
/// # Early termination
/// When `config.stop_flag` is set the loop stops before the next sample.
/// The interrupted epoch still appears in the returned statistics but
/// `epoch_finish` is not called for it.
pub fn train<P, F>(
    network: &mut FeedforwardNetwork,
    dataset: &Dataset,
    config: &TrainConfig,
    mut progress: P,
    mut epoch_finish: F,
) -> Result<Vec<EpochStats>>
where
    P: FnMut(f32),
    F: FnMut(usize),
{
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        if config.stop_requested() {
            break;
        }

        let mut stats = run_epoch(network, dataset, config, &mut progress)?;
        stats.epoch = epoch;
        stats.total_epochs = config.epochs;

        let interrupted = stats.samples < dataset.len();
        info!(
            "epoch {}/{}: {} samples, mean abs error {:.4}, {} ms{}",
            epoch, config.epochs, stats.samples, stats.mean_absolute_error, stats.elapsed_ms,
            if interrupted { " (stopped)" } else { "" }
        );
        history.push(stats);

        if interrupted {
            break;
        }
        epoch_finish(epoch);
    }

    Ok(history)
}

/// One pass over `dataset` in stored order, one update per sample.
///
/// After the sample at `index` is trained, `progress(index / len)` is
/// called, so the last value reported is `(len - 1) / len`, never `1.0`.
///
/// The returned stats carry `epoch = 1` and `total_epochs = 1`; `train`
/// overwrites both.
pub fn run_epoch<P>(
    network: &mut FeedforwardNetwork,
    dataset: &Dataset,
    config: &TrainConfig,
    mut progress: P,
) -> Result<EpochStats>
where
    P: FnMut(f32),
{
    let t_start = Instant::now();
    let n = dataset.len();
    let mut samples = 0usize;
    let mut total_error = 0.0f32;

    for (index, sample) in dataset.iter().enumerate() {
        if config.stop_requested() {
            debug!("stop requested after {} of {} samples", index, n);
            break;
        }

        let input = sample.to_matrix(config.normalize);
        let label = label_to_one_hot(sample.label() as usize, network.output_size())?;
        let prediction = network.train_one_sample(&input, &label, config.learning_rate)?;
        total_error += MaeLoss::loss(&prediction, &label)?;
        samples += 1;

        progress(index as f32 / n as f32);
    }

    let mean_absolute_error = if samples == 0 { 0.0 } else { total_error / samples as f32 };

    Ok(EpochStats {
        epoch: 1,
        total_epochs: 1,
        samples,
        mean_absolute_error,
        elapsed_ms: t_start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::idx::LabeledImage;
    use crate::math::matrix::Matrix;
    use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

    fn dataset(labels: &[u8]) -> Dataset {
        let images = labels.iter()
            .map(|&label| LabeledImage::new(2, 2, vec![255, 0, 128, 64], label).unwrap())
            .collect();
        Dataset::new(2, 2, images).unwrap()
    }

    #[test]
    fn progress_is_index_over_len() {
        let mut network = FeedforwardNetwork::zeroed(4, 3, 10);
        let mut seen = Vec::new();
        run_epoch(&mut network, &dataset(&[1, 2, 3, 4]), &TrainConfig::default(), |f| seen.push(f)).unwrap();
        assert_eq!(seen, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn run_epoch_matches_manual_sample_loop() {
        let data = dataset(&[5, 0, 9]);
        let config = TrainConfig::new(1, 0.01);
        let start = FeedforwardNetwork::from_parameters(
            [Matrix::from_fn(4, 3, |r, c| 0.1 * (r + c) as f32), Matrix::from_fn(3, 10, |r, c| 0.05 * (r * c + 1) as f32)],
            [Matrix::zeros(1, 3), Matrix::zeros(1, 10)],
        )
        .unwrap();

        let mut manual = start.clone();
        for sample in &data {
            let label = label_to_one_hot(sample.label() as usize, 10).unwrap();
            manual.train_one_sample(&sample.to_matrix(true), &label, 0.01).unwrap();
        }

        let mut looped = start;
        let stats = run_epoch(&mut looped, &data, &config, |_| {}).unwrap();
        assert_eq!(looped, manual);
        assert_eq!(stats.samples, 3);
        assert!(stats.mean_absolute_error > 0.0);
    }

    #[test]
    fn run_epoch_feeds_raw_pixels_when_not_normalizing() {
        let data = dataset(&[2, 8]);
        let mut config = TrainConfig::new(1, 0.01);
        config.normalize = false;
        let start = FeedforwardNetwork::from_parameters(
            [Matrix::from_fn(4, 3, |r, c| 0.001 * (r + c + 1) as f32), Matrix::from_fn(3, 10, |r, c| 0.01 * (r + c) as f32)],
            [Matrix::row_vector(vec![0.5, 0.1, 0.2]), Matrix::from_fn(1, 10, |_, c| 0.1 * c as f32)],
        )
        .unwrap();

        let mut raw = start.clone();
        let mut scaled = start.clone();
        for sample in &data {
            let label = label_to_one_hot(sample.label() as usize, 10).unwrap();
            raw.train_one_sample(&sample.to_matrix(false), &label, 0.01).unwrap();
            scaled.train_one_sample(&sample.to_matrix(true), &label, 0.01).unwrap();
        }

        let mut looped = start;
        run_epoch(&mut looped, &data, &config, |_| {}).unwrap();
        assert_eq!(looped, raw);
        assert_ne!(looped, scaled);
    }

    #[test]
    fn train_reports_every_epoch() {
        let mut network = FeedforwardNetwork::zeroed(4, 3, 10);
        let mut finished = Vec::new();
        let mut progress_calls = 0;
        let history = train(
            &mut network,
            &dataset(&[1, 2]),
            &TrainConfig::new(3, 0.01),
            |_| progress_calls += 1,
            |epoch| finished.push(epoch),
        )
        .unwrap();

        assert_eq!(finished, vec![1, 2, 3]);
        assert_eq!(progress_calls, 6);
        assert_eq!(history.iter().map(|s| s.epoch).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(history.iter().all(|s| s.total_epochs == 3 && s.samples == 2));

        let json = serde_json::to_string(&history[0]).unwrap();
        let back: EpochStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history[0]);
    }

    #[test]
    fn stop_flag_halts_between_samples() {
        let mut network = FeedforwardNetwork::zeroed(4, 3, 10);
        let flag = Arc::new(AtomicBool::new(false));
        let config = TrainConfig::new(4, 0.01).with_stop_flag(flag.clone());
        let mut finished = Vec::new();

        let history = train(
            &mut network,
            &dataset(&[1, 2, 3]),
            &config,
            |fraction| {
                if fraction > 0.0 {
                    flag.store(true, Ordering::Relaxed);
                }
            },
            |epoch| finished.push(epoch),
        )
        .unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].samples, 2);
        assert!(finished.is_empty());
    }

    #[test]
    fn empty_dataset_trains_nothing() {
        let mut network = FeedforwardNetwork::zeroed(4, 3, 10);
        let before = network.clone();
        let empty = Dataset::new(2, 2, Vec::new()).unwrap();
        let mut called = false;
        let stats = run_epoch(&mut network, &empty, &TrainConfig::default(), |_| called = true).unwrap();
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.mean_absolute_error, 0.0);
        assert!(!called);
        assert_eq!(network, before);
    }
}
