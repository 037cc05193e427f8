//! Sweeps concurrency levels against an in-memory bookstore and reports throughput and latency.
//!
//! ```text
//! bookstore-workload -c workload.yml run
//! bookstore-workload run --concurrency 32
//! ```
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    bookstore_workload::cli::execute()
}
