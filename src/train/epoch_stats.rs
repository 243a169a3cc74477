use serde::{Deserialize, Serialize};

/// Per-epoch training statistics returned by `run_epoch` and `train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Samples actually trained on; fewer than the dataset size when the
    /// stop flag interrupted the epoch.
    pub samples: usize,
    /// Mean of `Σ|label - prediction|` over this epoch's samples, each
    /// measured before that sample's update.
    pub mean_absolute_error: f32,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
