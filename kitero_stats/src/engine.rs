//! The derivation engine
//!
//! [`Engine`] turns a stream of [`Snapshot`] instances into a [`History`].
//! Every call to [`Engine::update`] derives one new sample for each metric
//! leaf by comparing the new snapshot with the previously accepted one.
//!
//! # Semantics
//!
//! Let `prev` be the last accepted snapshot and `now` the new one, with
//! `elapsed = now.time - prev.time`.
//!
//! * The first snapshot is only recorded. No interval exists yet so no sample
//!   is derived and the history stays empty.
//! * When `elapsed <= 0` the snapshot is ignored entirely: the history is
//!   untouched and `prev` is kept.
//! * Otherwise the history is merged in two passes.
//!
//! The first pass walks the paths already present in the history. A counter
//! leaf `k` gets `(now[k] - prev[k]) / elapsed` or [`Sample::NoData`] if either
//! side lacks a reading or the rate is not finite; a gauge leaf gets `now[k]`
//! or [`Sample::NoData`]. The
//! sample is prepended and the series cut back to the retention window. A
//! series made only of [`Sample::NoData`] is dropped, then any branch left
//! without children is dropped. A metric that stops reporting therefore fades
//! out after `keep` updates.
//!
//! The second pass walks paths of `now` not already in the merged result. A
//! gauge leaf starts a series with its value. A counter leaf starts a series
//! with its rate only when `prev` has a reading for it and the rate is finite;
//! a counter needs two samples. Branches recurse from an empty history.
//!
//! Children are always settled before their parent so that the merged tree is
//! the same whatever order metrics appear in.

use std::{collections::BTreeMap, num::NonZeroUsize};

use tracing::{debug, trace, warn};

use crate::{
    config::Config,
    history::{History, Node, Sample, Series},
    kind::{Classifier, MetricKind},
    snapshot::{Snapshot, Tree, Value},
};

static EMPTY: Tree = Tree::new();

fn subtree(value: Option<&Value>) -> &Tree {
    value.and_then(Value::as_map).unwrap_or(&EMPTY)
}

fn reading(tree: &Tree, key: &str) -> Option<f64> {
    tree.get(key).and_then(Value::as_number)
}

/// Parameters of one merge, fixed for the whole walk.
#[derive(Debug, Clone, Copy)]
struct Merge<'a> {
    classifier: &'a Classifier,
    keep: NonZeroUsize,
    elapsed: f64,
}

impl Merge<'_> {
    /// Rate between two readings. A rate that overflows is no data.
    fn rate(&self, now: f64, prev: f64) -> Sample {
        let rate = (now - prev) / self.elapsed;
        if rate.is_finite() {
            Sample::Value(rate)
        } else {
            Sample::NoData
        }
    }

    fn sample(&self, key: &str, now: &Tree, prev: &Tree) -> Sample {
        match self.classifier.classify(key) {
            MetricKind::Counter => match (reading(now, key), reading(prev, key)) {
                (Some(n), Some(p)) => self.rate(n, p),
                _ => Sample::NoData,
            },
            MetricKind::Gauge => reading(now, key).into(),
        }
    }

    fn merge(
        &self,
        existing: BTreeMap<String, Node>,
        now: &Tree,
        prev: &Tree,
    ) -> BTreeMap<String, Node> {
        let mut result = BTreeMap::new();

        for (key, node) in existing {
            match node {
                Node::Leaf(mut series) => {
                    series.push(self.sample(&key, now, prev), self.keep);
                    if series.has_data() {
                        result.insert(key, Node::Leaf(series));
                    } else {
                        trace!(key = %key, "metric has no data left in window, pruned");
                    }
                }
                Node::Branch(children) => {
                    let children =
                        self.merge(children, subtree(now.get(&key)), subtree(prev.get(&key)));
                    if children.is_empty() {
                        trace!(key = %key, "group has no metric left, pruned");
                    } else {
                        result.insert(key, Node::Branch(children));
                    }
                }
            }
        }

        for (key, value) in now {
            if result.contains_key(key) {
                continue;
            }
            match value {
                Value::Number(n) => {
                    let sample = match self.classifier.classify(key) {
                        MetricKind::Counter => match reading(prev, key) {
                            Some(p) => self.rate(*n, p),
                            None => continue,
                        },
                        MetricKind::Gauge => Sample::Value(*n),
                    };
                    if sample.is_no_data() {
                        continue;
                    }
                    trace!(key = %key, "new metric");
                    result.insert(key.clone(), Node::Leaf(Series::seeded(sample)));
                }
                Value::Map(children) => {
                    let children = self.merge(BTreeMap::new(), children, subtree(prev.get(key)));
                    if !children.is_empty() {
                        trace!(key = %key, "new group");
                        result.insert(key.clone(), Node::Branch(children));
                    }
                }
            }
        }

        result
    }
}

/// Stateful derivation of windowed rates and gauges from snapshots.
///
/// The engine exclusively owns the last accepted [`Snapshot`] and the
/// [`History`]; callers get read-only views or copies.
#[derive(Debug, Clone)]
pub struct Engine {
    keep: NonZeroUsize,
    classifier: Classifier,
    previous: Option<Snapshot>,
    history: History,
}

impl Engine {
    /// Create a new [`Engine`] with an empty history.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_classifier(config.keep, config.classifier())
    }

    /// Create a new [`Engine`] keeping `keep` samples per metric and
    /// classifying leaves with `classifier`.
    #[must_use]
    pub fn with_classifier(keep: NonZeroUsize, classifier: Classifier) -> Self {
        Self {
            keep,
            classifier,
            previous: None,
            history: History::new(),
        }
    }

    /// Derive one sample per metric from `snapshot`, returning the updated
    /// history.
    ///
    /// Snapshots must be given in non-decreasing timestamp order. A snapshot
    /// that is not strictly newer than the previous one is ignored.
    pub fn update(&mut self, snapshot: Snapshot) -> &History {
        let Some(previous) = &self.previous else {
            debug!(
                timestamp = snapshot.timestamp(),
                "first snapshot recorded, waiting for a second one"
            );
            self.previous = Some(snapshot);
            return &self.history;
        };

        let elapsed = snapshot.timestamp() - previous.timestamp();
        if elapsed <= 0.0 {
            if elapsed < 0.0 {
                warn!(
                    previous = previous.timestamp(),
                    timestamp = snapshot.timestamp(),
                    "snapshot older than the previous one ignored"
                );
            } else {
                debug!(timestamp = snapshot.timestamp(), "duplicate poll ignored");
            }
            return &self.history;
        }

        let merge = Merge {
            classifier: &self.classifier,
            keep: self.keep,
            elapsed,
        };
        let existing = std::mem::take(&mut self.history.root);
        self.history.root = merge.merge(existing, snapshot.tree(), previous.tree());
        trace!(
            elapsed,
            groups = self.history.root.len(),
            "history updated"
        );

        self.previous = Some(snapshot);
        &self.history
    }

    /// The current history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The last accepted snapshot, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Number of samples kept per metric.
    #[must_use]
    pub fn keep(&self) -> NonZeroUsize {
        self.keep
    }

    /// Copy of the samples at `path`, newest first. See [`History::series`].
    #[must_use]
    pub fn series(&self, path: &[&str]) -> Option<Vec<Sample>> {
        self.history.series(path)
    }

    /// Exactly `keep` samples at `path`. See [`History::window`].
    #[must_use]
    pub fn window(&self, path: &[&str]) -> Vec<Sample> {
        self.history.window(path, self.keep)
    }

    /// Newest sample at `path`. See [`History::latest`].
    #[must_use]
    pub fn latest(&self, path: &[&str]) -> Sample {
        self.history.latest(path)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
