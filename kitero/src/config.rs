//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program. Crashes are most likely
//! to originate from this code, intentionally.

use std::{io, path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{capture, source};

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
}

fn default_poll_period() -> u64 {
    5_000
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The period on which snapshots are taken from the source. Zero takes
    /// them back to back.
    #[serde(default = "default_poll_period")]
    pub poll_period_milliseconds: u64,
    /// How snapshots are turned into history
    #[serde(default)]
    pub stats: kitero_stats::Config,
    /// Where snapshots come from
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub source: source::Config,
    /// Where derived histories are written
    #[serde(default)]
    pub capture: capture::Config,
}

impl Config {
    /// Parse a [`Config`] from YAML `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error if `contents` is not a valid configuration.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Read and parse the [`Config`] at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// configuration.
    pub fn load(path: &std::path::Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        Self::from_yaml(&contents)
    }

    /// The poll period as a [`Duration`].
    #[must_use]
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_milliseconds)
    }
}
