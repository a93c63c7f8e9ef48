//! Windowed metric history
//!
//! [`History`] mirrors the shape of the snapshot trees fed to the engine, but
//! each leaf is a [`Series`]: the last N derived samples for that metric,
//! newest first. A [`Sample`] is either a finite reading or an explicit
//! [`Sample::NoData`] marker, which is never the same thing as zero.
//!
//! Serialized, a history is a nested JSON object whose leaves are arrays with
//! `null` standing in for missing samples:
//!
//! ```text
//! {"eth0": {"clients": [3, 3, 2], "up": [200.0, 100.0, null]}}
//! ```

use std::{
    collections::{BTreeMap, VecDeque},
    num::NonZeroUsize,
};

use serde::{Serialize, Serializer};

/// One derived value in a [`Series`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// A derived reading: a rate for counters, the raw value for gauges
    Value(f64),
    /// Nothing could be derived for this interval
    NoData,
}

impl Sample {
    /// Whether this is the [`Sample::NoData`] marker.
    #[must_use]
    pub fn is_no_data(self) -> bool {
        matches!(self, Sample::NoData)
    }
}

impl From<Option<f64>> for Sample {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Sample::NoData, Sample::Value)
    }
}

impl Serialize for Sample {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Sample::Value(v) => serializer.serialize_f64(*v),
            Sample::NoData => serializer.serialize_none(),
        }
    }
}

/// Bounded sequence of samples, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series {
    samples: VecDeque<Sample>,
}

impl Series {
    /// Create a series holding only `sample`.
    pub(crate) fn seeded(sample: Sample) -> Self {
        let mut samples = VecDeque::with_capacity(1);
        samples.push_back(sample);
        Self { samples }
    }

    /// Prepend `sample`, dropping the oldest samples beyond `keep`.
    pub(crate) fn push(&mut self, sample: Sample, keep: NonZeroUsize) {
        self.samples.push_front(sample);
        self.samples.truncate(keep.get());
    }

    /// Whether at least one sample is a real reading.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.samples.iter().any(|s| !s.is_no_data())
    }

    /// The newest sample, [`Sample::NoData`] if the series is empty.
    #[must_use]
    pub fn latest(&self) -> Sample {
        self.samples.front().copied().unwrap_or(Sample::NoData)
    }

    /// Iterate samples from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        self.samples.iter().copied()
    }

    /// Copy the samples out, newest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Sample> {
        self.iter().collect()
    }
}

/// A node of the [`History`] tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    /// Samples for a single metric
    Leaf(Series),
    /// A nested group of metrics, an interface for instance
    Branch(BTreeMap<String, Node>),
}

/// The windowed history of every metric seen so far.
///
/// Branches only exist while at least one leaf below them holds a real
/// reading. Paths are given as key slices, `&["eth0", "up"]`, since interface
/// names may themselves contain dots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    pub(crate) root: BTreeMap<String, Node>,
}

impl History {
    /// Create a new, empty [`History`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no metric has any history.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top level nodes, keyed by name.
    #[must_use]
    pub fn root(&self) -> &BTreeMap<String, Node> {
        &self.root
    }

    /// The node at `path`, if any. An empty path never matches.
    #[must_use]
    pub fn get(&self, path: &[&str]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.get(*first)?;
        for key in rest {
            match node {
                Node::Branch(children) => node = children.get(*key)?,
                Node::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    /// Copy of the samples at `path`, newest first, if `path` is a leaf.
    ///
    /// The returned vector is independent of later updates.
    #[must_use]
    pub fn series(&self, path: &[&str]) -> Option<Vec<Sample>> {
        match self.get(path)? {
            Node::Leaf(series) => Some(series.to_vec()),
            Node::Branch(_) => None,
        }
    }

    /// Newest sample at `path`, [`Sample::NoData`] when unknown.
    #[must_use]
    pub fn latest(&self, path: &[&str]) -> Sample {
        match self.get(path) {
            Some(Node::Leaf(series)) => series.latest(),
            _ => Sample::NoData,
        }
    }

    /// Exactly `keep` samples at `path`, newest first.
    ///
    /// Positions older than the recorded history are [`Sample::NoData`], as
    /// is every position for an unknown path.
    #[must_use]
    pub fn window(&self, path: &[&str], keep: NonZeroUsize) -> Vec<Sample> {
        let mut samples = self.series(path).unwrap_or_default();
        samples.resize(keep.get(), Sample::NoData);
        samples
    }

    /// Every leaf with its full path, in key order.
    #[must_use]
    pub fn leaves(&self) -> Vec<(Vec<String>, &Series)> {
        fn walk<'a>(
            nodes: &'a BTreeMap<String, Node>,
            prefix: &mut Vec<String>,
            out: &mut Vec<(Vec<String>, &'a Series)>,
        ) {
            for (key, node) in nodes {
                prefix.push(key.clone());
                match node {
                    Node::Leaf(series) => out.push((prefix.clone(), series)),
                    Node::Branch(children) => walk(children, prefix, out),
                }
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &mut Vec::new(), &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn keep(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("non-zero")
    }

    fn sample_history() -> History {
        let mut up = Series::seeded(Sample::Value(100.0));
        up.push(Sample::Value(200.0), keep(60));
        let mut down = Series::seeded(Sample::NoData);
        down.push(Sample::Value(5.0), keep(60));

        let mut eth0 = BTreeMap::new();
        eth0.insert("up".to_string(), Node::Leaf(up));
        eth0.insert("down".to_string(), Node::Leaf(down));
        let mut history = History::new();
        history.root.insert("eth0".to_string(), Node::Branch(eth0));
        history
    }

    #[test]
    fn series_push_respects_capacity() {
        let mut s = Series::seeded(Sample::Value(1.0));
        s.push(Sample::Value(2.0), keep(3));
        s.push(Sample::Value(3.0), keep(3));
        assert_eq!(s.iter().count(), 3);

        s.push(Sample::Value(4.0), keep(3));
        assert_eq!(s.iter().count(), 3);
        assert_eq!(
            s.to_vec(),
            vec![Sample::Value(4.0), Sample::Value(3.0), Sample::Value(2.0)]
        );
    }

    #[test]
    fn series_with_only_no_data_has_no_data() {
        let mut s = Series::seeded(Sample::NoData);
        s.push(Sample::NoData, keep(3));
        assert!(!s.has_data());
        s.push(Sample::Value(0.0), keep(3));
        assert!(s.has_data(), "zero is a real reading");
    }

    #[test]
    fn lookup_by_path() {
        let history = sample_history();
        assert_eq!(
            history.series(&["eth0", "up"]),
            Some(vec![Sample::Value(200.0), Sample::Value(100.0)])
        );
        assert_eq!(history.series(&["eth0"]), None, "branch is not a series");
        assert_eq!(history.series(&["eth0", "up", "deeper"]), None);
        assert_eq!(history.series(&["eth1", "up"]), None);
        assert_eq!(history.series(&[]), None);
    }

    #[test]
    fn latest_and_window() {
        let history = sample_history();
        assert_eq!(history.latest(&["eth0", "down"]), Sample::Value(5.0));
        assert_eq!(history.latest(&["eth0", "clients"]), Sample::NoData);

        assert_eq!(
            history.window(&["eth0", "up"], keep(4)),
            vec![
                Sample::Value(200.0),
                Sample::Value(100.0),
                Sample::NoData,
                Sample::NoData
            ]
        );
        assert_eq!(
            history.window(&["nope"], keep(2)),
            vec![Sample::NoData, Sample::NoData]
        );
    }

    #[test]
    fn leaves_are_listed_in_key_order() {
        let history = sample_history();
        let paths: Vec<Vec<String>> = history.leaves().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![
                vec!["eth0".to_string(), "down".to_string()],
                vec!["eth0".to_string(), "up".to_string()],
            ]
        );
    }

    #[test]
    fn serializes_with_null_for_missing_samples() {
        let history = sample_history();
        let value = serde_json::to_value(&history).expect("serializable");
        assert_eq!(
            value,
            json!({"eth0": {"down": [5.0, null], "up": [200.0, 100.0]}})
        );
    }
}
