//! A closed-loop load generator for a bookstore.
//!
//! A run starts a fixed number of concurrent [`Worker`](worker::Worker)s against the
//! [`StockManager`](bookstore_service::StockManager) and [`BookStore`](bookstore_service::BookStore)
//! of a store. Each worker warms up, then runs a measured number of interactions, choosing between
//! three kinds by configurable percentages:
//!
//! - *rare*: add a few newly generated books to the catalog
//! - *frequent stock*: restock the books with the fewest copies
//! - *customer*: buy copies of some of the editor picks
//!
//! [`run`] waits for all workers and aggregates their results into [`AggregateMetrics`]. The binary
//! sweeps a ramp of concurrency levels and prints one report per level.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod orchestrator;
pub mod report;
pub mod sampler;
pub mod worker;
pub mod workload;

pub use crate::error::{Error, Result};
pub use crate::metrics::{AggregateMetrics, WorkerResult};
pub use crate::orchestrator::run;
pub use crate::sampler::Sampler;
pub use crate::workload::{InteractionKind, WorkloadConfiguration};
