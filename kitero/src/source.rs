//! Snapshot sources
//!
//! A [`Source`] yields one [`Snapshot`] per poll. Snapshots are read as JSON
//! Lines, one stats service document per line, either from a file recorded
//! earlier or from standard input.

use std::{io, path::PathBuf};

use kitero_stats::{Snapshot, snapshot};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::debug;

/// Errors produced by [`Source`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error opening the file backing a [`Config::JsonLines`] source
    #[error("Failed to open snapshot source {path:?}: {source}")]
    Open {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Error reading from the source
    #[error("Failed to read snapshot source: {0}")]
    Io(#[from] io::Error),
    /// A line could not be decoded into a [`Snapshot`]
    #[error("Failed to decode snapshot on line {line}: {source}")]
    Decode {
        /// One-based line number
        line: u64,
        /// Underlying decoding error
        #[source]
        source: snapshot::Error,
    },
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Configuration for [`Source`]
pub enum Config {
    /// Read snapshots from a JSON Lines file
    JsonLines {
        /// Path of the file to read
        path: PathBuf,
    },
    /// Read snapshots as JSON Lines from standard input
    Stdin,
}

/// Yields snapshots line by line.
pub struct Source {
    lines: Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>,
    line: u64,
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source").field("line", &self.line).finish()
    }
}

impl Source {
    /// Open the source described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be opened.
    pub async fn open(config: &Config) -> Result<Self, Error> {
        let reader: Box<dyn AsyncRead + Send + Unpin> = match config {
            Config::JsonLines { path } => {
                debug!("Opening snapshot source at: {}", path.display());
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| Error::Open {
                        path: path.clone(),
                        source: Box::new(source),
                    })?;
                Box::new(file)
            }
            Config::Stdin => Box::new(tokio::io::stdin()),
        };
        Ok(Self::from_reader(reader))
    }

    /// Create a new [`Source`] reading from `reader`.
    #[must_use]
    pub fn from_reader(reader: Box<dyn AsyncRead + Send + Unpin>) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line: 0,
        }
    }

    /// Read the next snapshot. Blank lines are skipped.
    ///
    /// Returns `Ok(None)` once the source is exhausted. A line that fails to
    /// decode is consumed; calling again moves on to the next line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading fails and [`Error::Decode`] if the
    /// current line is not a valid snapshot.
    pub async fn next(&mut self) -> Result<Option<Snapshot>, Error> {
        while let Some(text) = self.lines.next_line().await? {
            self.line += 1;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            return Snapshot::from_json(text)
                .map(Some)
                .map_err(|source| Error::Decode {
                    line: self.line,
                    source,
                });
        }
        Ok(None)
    }
}
