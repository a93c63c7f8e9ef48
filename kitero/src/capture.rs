//! Record derived histories
//!
//! The [`Capture`] sink is the consumer end of the poller: every [`Update`]
//! it receives is written out as one JSON line of the form
//!
//! ```text
//! {"tick": 3, "time": 10.0, "history": {"eth0": {"up": [200.0, 100.0]}}}
//! ```
//!
//! so that a chart, or a person with `jq`, can follow the history as it
//! evolves.

use std::{io, path::PathBuf};

use serde::Deserialize;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
    sync::mpsc,
};
use tracing::{debug, info};

use crate::poller::Update;

/// Errors produced by [`Capture`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error creating the capture file
    #[error("Failed to create capture file {path:?}: {source}")]
    Create {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Error writing a capture line
    #[error("Failed to write capture: {0}")]
    Io(#[from] io::Error),
    /// Error serializing an [`Update`]
    #[error("Failed to serialize capture line: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Configuration for [`Capture`]
pub struct Config {
    /// File to write capture lines to, standard output if unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Writes every received [`Update`] as a JSON line.
pub struct Capture {
    writer: BufWriter<Box<dyn AsyncWrite + Send + Unpin>>,
    receiver: mpsc::Receiver<Update>,
}

impl std::fmt::Debug for Capture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capture").finish_non_exhaustive()
    }
}

impl Capture {
    /// Create a new [`Capture`] writing to the destination in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture file cannot be created.
    pub async fn open(config: &Config, receiver: mpsc::Receiver<Update>) -> Result<Self, Error> {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = match &config.path {
            Some(path) => {
                debug!("Creating capture file at: {}", path.display());
                let file = tokio::fs::File::create(path)
                    .await
                    .map_err(|source| Error::Create {
                        path: path.clone(),
                        source: Box::new(source),
                    })?;
                Box::new(file)
            }
            None => Box::new(tokio::io::stdout()),
        };
        Ok(Self::new(writer, receiver))
    }

    /// Create a new [`Capture`] writing to `writer`.
    #[must_use]
    pub fn new(
        writer: Box<dyn AsyncWrite + Send + Unpin>,
        receiver: mpsc::Receiver<Update>,
    ) -> Self {
        Self {
            writer: BufWriter::new(writer),
            receiver,
        }
    }

    /// Run this [`Capture`] until every sender is dropped, returning the
    /// number of lines written.
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be serialized or written.
    pub async fn run(mut self) -> Result<u64, Error> {
        let mut lines = 0;
        while let Some(update) = self.receiver.recv().await {
            let mut line = serde_json::to_vec(&update)?;
            line.push(b'\n');
            self.writer.write_all(&line).await?;
            // Readers tail the capture, don't hold a line back.
            self.writer.flush().await?;
            lines += 1;
        }
        self.writer.shutdown().await?;
        info!(lines, "capture complete");
        Ok(lines)
    }
}
