//! Training configuration read from JSON.
//!
//! Every field is optional; missing fields take the values the digit
//! classifier was tuned with.
//!
//! ```json
//! { "hidden_size": 128, "epochs": 10, "checkpoint": null }
//! ```

use crate::error::{Error, Result};
use crate::network::Network;
use crate::trainer::{Checkpoint, Logging, Trainer, DEFAULT_BATCH_SIZE, DEFAULT_CHECKPOINT};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub learning_rate: f32,
    pub epochs: u32,
    pub batch_size: usize,
    /// `None` disables checkpointing.
    pub checkpoint: Option<PathBuf>,
    /// Log progress every this many epochs; zero logs only the summary.
    pub log_every: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_size: 28 * 28,
            hidden_size: 64,
            output_size: 10,
            learning_rate: 0.1,
            epochs: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            checkpoint: Some(PathBuf::from(DEFAULT_CHECKPOINT)),
            log_every: 1,
        }
    }
}

impl Config {
    /// Reads a configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::FileUnreadable {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|err| Error::InvalidConfig {
            path: path.to_owned(),
            reason: err.to_string(),
        })
    }

    /// Builds an untrained network of the configured shape.
    pub fn network(&self) -> Result<Network> {
        Network::new(self.input_size, self.hidden_size, self.output_size)
    }

    /// Builds a trainer with the configured settings.
    pub fn trainer(&self) -> Trainer {
        let checkpoint = match &self.checkpoint {
            Some(path) => Checkpoint::Path(path.clone()),
            None => Checkpoint::Disabled,
        };
        let logging = match self.log_every {
            0 => Logging::Completion,
            n => Logging::Epochs(n),
        };
        Trainer::new()
            .learning_rate(self.learning_rate)
            .epochs(self.epochs)
            .batch_size(self.batch_size)
            .checkpoint(checkpoint)
            .logging(logging)
    }

    /// Returns the checkpoint path, if checkpointing is enabled.
    pub fn checkpoint_path(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }
}
