//! Classification of metric leaves
//!
//! The stats service does not say which of its numbers are cumulative. The
//! convention is carried by the leaf key: the throughput byte counters are
//! named `up` and `down`, everything else (client counts and the like) is a
//! point-in-time reading. [`Classifier`] makes that convention explicit and
//! configurable rather than baked into the derivation walk.

use rustc_hash::FxHashSet;

/// Key names treated as counters when nothing else is configured.
pub const DEFAULT_COUNTERS: [&str; 2] = ["up", "down"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The kinds of metric leaves found in a snapshot.
pub enum MetricKind {
    /// A monotonically increasing value, recorded as its rate per second.
    Counter,
    /// A point-in-time value, recorded as-is.
    Gauge,
}

/// Decides the [`MetricKind`] of a leaf from its key name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    counters: FxHashSet<String>,
}

impl Classifier {
    /// Create a new [`Classifier`] treating exactly `counters` as counters.
    #[must_use]
    pub fn new<I, S>(counters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counters: counters.into_iter().map(Into::into).collect(),
        }
    }

    /// Classify the leaf named `key`.
    ///
    /// Only the key name matters. The value, its magnitude and the depth of
    /// the leaf in the tree are not consulted.
    #[must_use]
    pub fn classify(&self, key: &str) -> MetricKind {
        if self.counters.contains(key) {
            MetricKind::Counter
        } else {
            MetricKind::Gauge
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTERS)
    }
}
