//! The kitero stats poller.
//!
//! This library supports the kitero binary found elsewhere in this project.
//! It reads interface stats snapshots from a source on a fixed period, feeds
//! them through a [`kitero_stats::Engine`] and records every resulting
//! history so that it can be charted.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
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
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod config;
pub mod poller;
pub mod source;
