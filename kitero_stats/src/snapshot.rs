//! Polled stats snapshots
//!
//! A [`Snapshot`] is one answer from the stats service: a timestamp in
//! seconds and a [`Tree`] of metrics keyed by interface and metric name. The
//! service speaks JSON of the shape
//!
//! ```text
//! {"time": 1325376000.5, "value": {"eth0": {"up": 1500, "down": 8000, "clients": 3}}}
//! ```
//!
//! Leaves must be finite numbers. Anything else is rejected here, at the
//! boundary, so that the derivation engine only ever walks well-formed trees.

use std::{collections::BTreeMap, fmt::Write as _, str::FromStr};

use serde::Deserialize;

/// Errors produced when constructing a [`Snapshot`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper around [`serde_json::Error`].
    #[error("Failed to deserialize snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    /// Snapshot time is NaN or infinite
    #[error("Snapshot timestamp is not finite: {timestamp}")]
    NonFiniteTimestamp {
        /// The rejected timestamp
        timestamp: f64,
    },
    /// The metric tree root is not a JSON object
    #[error("Snapshot value must be an object, found {found}")]
    NotAnObject {
        /// JSON type found in place of the object
        found: &'static str,
    },
    /// A metric leaf holds something other than a number
    #[error("Metric at {path} is not a number, found {found}")]
    NonNumeric {
        /// Pointer-style path of the offending leaf
        path: String,
        /// JSON type found in place of the number
        found: &'static str,
    },
    /// A metric leaf is NaN or infinite
    #[error("Metric at {path} is not finite")]
    NonFinite {
        /// Pointer-style path of the offending leaf
        path: String,
    },
}

/// A mapping from metric or interface name to a [`Value`].
pub type Tree = BTreeMap<String, Value>;

/// A node of a snapshot tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A metric reading
    Number(f64),
    /// A nested group of readings, an interface for instance
    Map(Tree),
}

impl Value {
    /// The reading held by this node, if it is a leaf.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Map(_) => None,
        }
    }

    /// The children of this node, if it is not a leaf.
    #[must_use]
    pub fn as_map(&self) -> Option<&Tree> {
        match self {
            Value::Number(_) => None,
            Value::Map(m) => Some(m),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Wire {
    time: f64,
    value: serde_json::Value,
}

/// One poll result from the stats service.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    timestamp: f64,
    tree: Tree,
}

impl Snapshot {
    /// Create a new [`Snapshot`] from an already built tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp or any leaf is not finite.
    pub fn new(timestamp: f64, tree: Tree) -> Result<Self, Error> {
        if !timestamp.is_finite() {
            return Err(Error::NonFiniteTimestamp { timestamp });
        }
        check_finite(&tree, &mut String::new())?;
        Ok(Self { timestamp, tree })
    }

    /// Create a new [`Snapshot`] from a timestamp and a JSON object tree.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not an object, if any leaf is not a
    /// number or if any number is not finite.
    pub fn from_json_value(timestamp: f64, value: serde_json::Value) -> Result<Self, Error> {
        let tree = match value {
            serde_json::Value::Object(map) => convert(map, &mut String::new())?,
            other => {
                return Err(Error::NotAnObject {
                    found: json_type(&other),
                });
            }
        };
        Self::new(timestamp, tree)
    }

    /// Decode a [`Snapshot`] from the stats service JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON, lacks `time` or
    /// `value`, or if the tree is malformed. See
    /// [`Snapshot::from_json_value`].
    pub fn from_json(document: &str) -> Result<Self, Error> {
        let wire: Wire = serde_json::from_str(document)?;
        Self::from_json_value(wire.time, wire.value)
    }

    /// Poll time of this snapshot, in seconds.
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// The metric tree of this snapshot.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

impl FromStr for Snapshot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// `path` is reused across the walk, each level truncates back to its own
// prefix before returning.
fn convert(
    map: serde_json::Map<String, serde_json::Value>,
    path: &mut String,
) -> Result<Tree, Error> {
    let mut tree = Tree::new();
    for (key, value) in map {
        let prefix = path.len();
        let _ = write!(path, "/{key}");
        let node = match value {
            serde_json::Value::Object(children) => Value::Map(convert(children, path)?),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Value::Number(f),
                None => {
                    return Err(Error::NonFinite { path: path.clone() });
                }
            },
            other => {
                return Err(Error::NonNumeric {
                    path: path.clone(),
                    found: json_type(&other),
                });
            }
        };
        path.truncate(prefix);
        tree.insert(key, node);
    }
    Ok(tree)
}

fn check_finite(tree: &Tree, path: &mut String) -> Result<(), Error> {
    for (key, value) in tree {
        let prefix = path.len();
        let _ = write!(path, "/{key}");
        match value {
            Value::Number(n) if !n.is_finite() => {
                return Err(Error::NonFinite { path: path.clone() });
            }
            Value::Number(_) => {}
            Value::Map(children) => check_finite(children, path)?,
        }
        path.truncate(prefix);
    }
    Ok(())
}
