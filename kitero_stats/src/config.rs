//! Configuration of the derivation [`Engine`](crate::Engine)

use std::num::NonZeroUsize;

use serde::Deserialize;

use crate::kind::{Classifier, DEFAULT_COUNTERS};

/// Default retention window, in samples per metric.
pub const DEFAULT_KEEP: NonZeroUsize = NonZeroUsize::new(60).expect("60 is non-zero");

fn default_keep() -> NonZeroUsize {
    DEFAULT_KEEP
}

fn default_counters() -> Vec<String> {
    DEFAULT_COUNTERS.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
/// Configuration of the derivation engine
pub struct Config {
    /// Number of samples kept per metric leaf
    #[serde(default = "default_keep")]
    pub keep: NonZeroUsize,
    /// Leaf key names holding cumulative counters, derived into rates
    #[serde(default = "default_counters")]
    pub counters: Vec<String>,
}

impl Config {
    /// The [`Classifier`] described by this configuration.
    #[must_use]
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.counters.iter().cloned())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep: default_keep(),
            counters: default_counters(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::MetricKind;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = serde_json::from_str("{}").expect("valid");
        assert_eq!(config, Config::default());
        assert_eq!(config.keep.get(), 60);
        assert_eq!(config.classifier().classify("up"), MetricKind::Counter);
    }

    #[test]
    fn zero_keep_is_rejected() {
        let res: Result<Config, _> = serde_json::from_str(r#"{"keep": 0}"#);
        assert!(res.is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<Config, _> = serde_json::from_str(r#"{"kept": 10}"#);
        assert!(res.is_err());
    }
}
