//! Network and training configuration
//!
//! Configuration can be built in code, or parsed from a JSON file:
//!
//! ```json
//! {
//!   "network": { "hidden_layers": 2, "neurons_per_hidden_layer": 16 },
//!   "training": { "batch_size": 10, "epochs": 20, "learning_rate": 1.0, "seed": 7 }
//! }
//! ```
//!
//! Missing fields take the defaults of a 28x28 digit classifier.

use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::feedforward::{NewNetError, TrainError};

/// Pixels in a 28x28 image.
pub const DEFAULT_INPUT_FEATURES: usize = 28 * 28;
/// Digits 0 to 9.
pub const DEFAULT_OUTPUT_CLASSES: usize = 10;

/// Shape of the network.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetConfig {
    pub input_features: usize,
    pub output_classes: usize,
    pub hidden_layers: usize,
    pub neurons_per_hidden_layer: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            input_features: DEFAULT_INPUT_FEATURES,
            output_classes: DEFAULT_OUTPUT_CLASSES,
            hidden_layers: 2,
            neurons_per_hidden_layer: 16,
        }
    }
}

impl NetConfig {
    /// # Returns
    /// `Err(NewNetError::InvalidConfiguration)` naming the first zero count.
    pub fn validate(&self) -> Result<(), NewNetError> {
        let counts = [
            (self.input_features, "input feature count"),
            (self.output_classes, "output class count"),
            (self.hidden_layers, "hidden layer count"),
            (self.neurons_per_hidden_layer, "neurons per hidden layer"),
        ];
        match counts.iter().find(|(count, _)| *count == 0) {
            Some(&(_, what)) => Err(NewNetError::InvalidConfiguration(what)),
            None => Ok(()),
        }
    }
}

/// Mini-batch gradient descent parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub batch_size: usize,
    pub epochs: usize,
    /// Multiplier of the averaged batch gradient.
    pub learning_rate: f64,
    /// Seed for weight initialization and shuffling; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            epochs: 20,
            learning_rate: 1.0,
            seed: None,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.batch_size == 0 {
            return Err(TrainError::InvalidConfiguration("batch size"));
        }
        if self.epochs == 0 {
            return Err(TrainError::InvalidConfiguration("epoch count"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::InvalidConfiguration("learning rate"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub network: NetConfig,
    pub training: TrainConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        self.network.validate()?;
        self.training.validate()?;
        Ok(())
    }
}

/// Parses and validates a JSON configuration.
///
/// # Examples
/// ```
/// # use digitnet::config::parse_config;
/// let config = parse_config(r#"{ "training": { "epochs": 3 } }"#).unwrap();
/// assert_eq!(config.training.epochs, 3);
/// assert_eq!(config.network.output_classes, 10);
/// ```
pub fn parse_config(contents: &str) -> Result<Config, Box<dyn Error>> {
    let config: Config = serde_json::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads a configuration from a JSON file.
///
/// # Returns
/// `Ok(Config)` on success, or an error if the file cannot be read, the JSON
/// is invalid, or some value is out of range.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}
