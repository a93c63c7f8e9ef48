//! The stats poller
//!
//! [`Poller`] owns the derivation [`Engine`] for the whole run. Every period
//! it takes the next [`Snapshot`](kitero_stats::Snapshot) from its
//! [`Source`], applies it and hands a copy of the resulting history to
//! whoever renders it. Nothing else touches the engine.

use std::time::Duration;

use kitero_stats::{Engine, History};
use serde::Serialize;
use tokio::{sync::mpsc, time};
use tracing::{debug, info, warn};

use crate::source::{self, Source};

/// Errors produced by [`Poller`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// See [`crate::source::Error`] for details.
    #[error(transparent)]
    Source(#[from] source::Error),
}

/// The history after one poll, as published to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct Update {
    /// Number of snapshots taken so far, this one included
    pub tick: u64,
    /// Timestamp of the snapshot the history was last derived against
    pub time: Option<f64>,
    /// The derived history
    pub history: History,
}

/// Feeds snapshots from a [`Source`] into an [`Engine`] on a fixed period.
#[derive(Debug)]
pub struct Poller {
    engine: Engine,
    source: Source,
    period: Duration,
    updates: mpsc::Sender<Update>,
}

impl Poller {
    /// Create a new [`Poller`].
    ///
    /// A zero `period` polls as fast as the source and the renderer allow,
    /// which is what replaying a recorded file wants.
    #[must_use]
    pub fn new(
        engine: Engine,
        source: Source,
        period: Duration,
        updates: mpsc::Sender<Update>,
    ) -> Self {
        Self {
            engine,
            source,
            period,
            updates,
        }
    }

    /// Run this [`Poller`] until the source is exhausted or the renderer
    /// goes away, returning the number of snapshots taken.
    ///
    /// Snapshots that fail to decode are logged and skipped, the next period
    /// tries again.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read.
    pub async fn run(mut self) -> Result<u64, Error> {
        info!(
            period = ?self.period,
            keep = self.engine.keep().get(),
            "stats poller running"
        );
        let mut ticker = (!self.period.is_zero()).then(|| {
            let mut interval = time::interval(self.period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            interval
        });
        let mut tick = 0;

        loop {
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }

            let snapshot = match self.source.next().await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    info!(tick, "snapshot source exhausted");
                    break;
                }
                Err(err @ source::Error::Decode { .. }) => {
                    warn!("unable to grab stats: {err}");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            tick += 1;
            let history = self.engine.update(snapshot).clone();
            let time = self.engine.previous().map(kitero_stats::Snapshot::timestamp);
            debug!(tick, metrics = history.leaves().len(), "polled");

            let update = Update {
                tick,
                time,
                history,
            };
            if self.updates.send(update).await.is_err() {
                warn!("renderer went away, stopping poller");
                break;
            }
        }

        Ok(tick)
    }
}
