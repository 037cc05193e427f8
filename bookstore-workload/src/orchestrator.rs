//! Runs a fixed number of workers concurrently and aggregates their results.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::metrics::AggregateMetrics;
use crate::worker::Worker;
use crate::workload::WorkloadConfiguration;

/// Runs `concurrency` workers sharing `config` until all of them are done.
///
/// Every worker runs in its own task on the current tokio runtime, so on a multi-threaded runtime
/// they make progress in parallel. This waits for all tasks even if one of them fails. A worker
/// that panics or fails with anything other than a store error fails the whole run with
/// [`Error::FatalTask`].
pub async fn run(concurrency: usize, config: Arc<WorkloadConfiguration>) -> Result<AggregateMetrics> {
    if concurrency == 0 {
        return Err(Error::invalid("concurrency must be at least 1"));
    }

    tracing::info!(
        concurrency,
        warm_up_runs = config.warm_up_runs(),
        measured_runs = config.measured_runs(),
        "starting workers"
    );

    let start = Instant::now();
    let tasks: Vec<_> = (0..concurrency)
        .map(|id| {
            let worker = Worker::new(id, Arc::clone(&config));
            tokio::spawn(worker.run())
        })
        .collect();

    let finished_tasks = futures::future::join_all(tasks).await;
    let wall_clock = start.elapsed();

    let mut results = Vec::with_capacity(concurrency);
    let mut fatal = None;
    for (worker, task) in finished_tasks.into_iter().enumerate() {
        let cause: Box<dyn std::error::Error + Send + Sync> = match task {
            Ok(Ok(result)) => {
                results.push(result);
                continue;
            }
            Ok(Err(error)) => Box::new(error),
            Err(join_error) => Box::new(join_error),
        };

        tracing::error!(worker, error = cause.as_ref() as &dyn std::error::Error, "worker failed");
        fatal.get_or_insert(Error::FatalTask { worker, cause });
    }

    if let Some(error) = fatal {
        return Err(error);
    }

    let metrics = AggregateMetrics::from_results(results, wall_clock)?;
    tracing::info!(
        concurrency,
        average_latency_nanos = metrics.average_latency_nanos,
        throughput_per_second = metrics.throughput_per_second(),
        wall_clock = ?wall_clock,
        "workers finished"
    );

    Ok(metrics)
}
