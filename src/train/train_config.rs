use std::path::Path;
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::network::network::DEFAULT_LEARNING_RATE;

/// Configuration for a training run.
///
/// # Fields
/// - `epochs`        — total number of full passes over the dataset
/// - `learning_rate` — step size for the per-sample update
/// - `normalize`     — divide pixel bytes by 255 before feeding them
/// - `stop_flag`     — optional atomic flag; when set to `true` from another
///                     thread the loop stops before the next sample. Never
///                     serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f32,
    pub normalize: bool,
    #[serde(skip)]
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 5,
            learning_rate: DEFAULT_LEARNING_RATE,
            normalize: true,
            stop_flag: None,
        }
    }
}

impl TrainConfig {
    /// Creates a `TrainConfig` with normalized inputs and no stop flag.
    pub fn new(epochs: usize, learning_rate: f32) -> Self {
        TrainConfig { epochs, learning_rate, ..TrainConfig::default() }
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_flag
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    pub fn from_json_str(json: &str) -> Result<TrainConfig> {
        Ok(serde_json::from_str(json)?)
    }

    /// Deserializes a config from a JSON file. Missing fields take their
    /// defaults.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = TrainConfig::default();
        assert_eq!(config.epochs, 5);
        assert_eq!(config.learning_rate, 0.0005);
        assert!(config.normalize);
        assert!(!config.stop_requested());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = TrainConfig::from_json_str(r#"{ "epochs": 2 }"#).unwrap();
        assert_eq!(config.epochs, 2);
        assert_eq!(config.learning_rate, DEFAULT_LEARNING_RATE);
        assert!(config.normalize);
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let err = TrainConfig::from_json_str(r#"{ "epochs": "many" }"#).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }

    #[test]
    fn stop_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = TrainConfig::new(1, 0.1).with_stop_flag(flag.clone());
        assert!(!config.stop_requested());
        flag.store(true, Ordering::Relaxed);
        assert!(config.stop_requested());
    }

    #[test]
    fn json_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("digit-trainer-config-{}.json", std::process::id()));
        let config = TrainConfig { epochs: 3, learning_rate: 0.01, normalize: false, stop_flag: None };
        config.save_json(&path).unwrap();
        let loaded = TrainConfig::load_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.learning_rate, 0.01);
        assert!(!loaded.normalize);
    }
}
