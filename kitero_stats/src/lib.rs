//! Derivation of windowed throughput history from polled stats snapshots
//!
//! The stats service reports, every few seconds, a nested tree of cumulative
//! byte counters and instantaneous gauges per interface. Charts need the
//! opposite: a short history of per-second rates and raw values for each
//! metric. This crate bridges the two. The core structure is [`Engine`].
//! Calling code is responsible for obtaining [`Snapshot`] instances and
//! feeding them to [`Engine::update`] in timestamp order; the engine keeps a
//! [`History`] of the last N derived samples per metric leaf.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::perf)]
#![deny(clippy::suspicious)]
#![deny(clippy::complexity)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod history;
pub mod kind;
pub mod snapshot;

pub use config::Config;
pub use engine::Engine;
pub use history::{History, Node, Sample, Series};
pub use kind::{Classifier, MetricKind};
pub use snapshot::{Snapshot, Tree, Value};
