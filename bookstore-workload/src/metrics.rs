//! Results of single workers and their aggregation over a whole run.

use std::fmt;
use std::time::Duration;

use sketches_ddsketch::DDSketch;

use crate::error::{Error, Result};
use crate::workload::InteractionKind;

/// Latency and failures of one interaction kind.
#[derive(Default)]
pub struct KindMetrics {
    /// Latency of every interaction of this kind in seconds, failed ones included.
    pub timing: DDSketch,
    /// Number of interactions of this kind that the store rejected.
    pub failures: u64,
}

impl KindMetrics {
    /// Number of interactions of this kind.
    pub fn count(&self) -> usize {
        self.timing.count()
    }

    /// Quantile of the latency, or `None` if nothing was recorded.
    pub fn latency_quantile(&self, quantile: f64) -> Option<Duration> {
        self.timing
            .quantile(quantile)
            .ok()
            .flatten()
            .map(Duration::from_secs_f64)
    }

    /// Average latency, or `None` if nothing was recorded.
    pub fn average_latency(&self) -> Option<Duration> {
        let count = self.count();
        let sum = self.timing.sum()?;
        (count > 0).then(|| Duration::from_secs_f64(sum / count as f64))
    }

    fn merge(&mut self, other: &KindMetrics) -> Result<()> {
        self.timing
            .merge(&other.timing)
            .map_err(|err| Error::Metrics(format!("{err:?}")))?;
        self.failures += other.failures;
        Ok(())
    }
}

impl fmt::Debug for KindMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindMetrics")
            .field("count", &self.count())
            .field("failures", &self.failures)
            .finish()
    }
}

/// Per-kind metrics of all measured interactions.
#[derive(Debug, Default)]
pub struct InteractionMetrics {
    /// Metrics of rare interactions.
    pub rare: KindMetrics,
    /// Metrics of frequent stock interactions.
    pub frequent_stock: KindMetrics,
    /// Metrics of customer interactions.
    pub customer: KindMetrics,
}

impl InteractionMetrics {
    /// Returns the metrics of the given kind.
    pub fn get(&self, kind: InteractionKind) -> &KindMetrics {
        match kind {
            InteractionKind::Rare => &self.rare,
            InteractionKind::FrequentStock => &self.frequent_stock,
            InteractionKind::Customer => &self.customer,
        }
    }

    fn get_mut(&mut self, kind: InteractionKind) -> &mut KindMetrics {
        match kind {
            InteractionKind::Rare => &mut self.rare,
            InteractionKind::FrequentStock => &mut self.frequent_stock,
            InteractionKind::Customer => &mut self.customer,
        }
    }

    /// Records the outcome of one interaction.
    pub fn record(&mut self, kind: InteractionKind, latency: Duration, success: bool) {
        let metrics = self.get_mut(kind);
        metrics.timing.add(latency.as_secs_f64());
        if !success {
            metrics.failures += 1;
        }
    }

    /// Adds all metrics of `other` to this one.
    pub fn merge(&mut self, other: &InteractionMetrics) -> Result<()> {
        for kind in InteractionKind::ALL {
            self.get_mut(kind).merge(other.get(kind))?;
        }
        Ok(())
    }
}

/// The outcome of one worker's measured phase.
#[derive(Debug)]
pub struct WorkerResult {
    /// Measured iterations that succeeded, across all interaction kinds.
    pub successful_interactions: usize,
    /// Duration of the measured phase. Warm-up is excluded.
    pub elapsed: Duration,
    /// Number of measured iterations the worker was asked to run.
    pub measured_runs_requested: usize,
    /// Customer interactions that succeeded.
    pub successful_customer_interactions: usize,
    /// Customer interactions that were attempted.
    pub total_customer_interactions: usize,
    /// Latency and failures per interaction kind.
    pub interactions: InteractionMetrics,
}

impl WorkerResult {
    /// Duration of the measured phase in nanoseconds.
    pub fn elapsed_nanos(&self) -> f64 {
        self.elapsed.as_nanos() as f64
    }
}

/// Aggregated metrics of all workers of one run.
#[derive(Debug)]
pub struct AggregateMetrics {
    /// Mean of the workers' measured durations, in nanoseconds.
    pub average_latency_nanos: f64,
    /// Successful interactions of all workers divided by the sum of their measured durations.
    ///
    /// The denominator is the sum of per-worker time, not the wall-clock time of the run, so this
    /// is closer to a per-worker rate than to the throughput of the store. See
    /// [`wall_clock_throughput_per_second`](Self::wall_clock_throughput_per_second).
    pub aggregate_throughput_per_nano: f64,
    /// Time from spawning the first worker until the last one finished.
    pub wall_clock: Duration,
    /// Per-kind metrics merged over all workers.
    pub interactions: InteractionMetrics,
    /// The raw results, in worker order.
    pub worker_results: Vec<WorkerResult>,
}

impl AggregateMetrics {
    /// Aggregates the results of all workers of a run.
    pub fn from_results(worker_results: Vec<WorkerResult>, wall_clock: Duration) -> Result<Self> {
        if worker_results.is_empty() {
            return Err(Error::invalid("cannot aggregate zero worker results"));
        }

        let total_nanos: f64 = worker_results.iter().map(WorkerResult::elapsed_nanos).sum();
        let total_successful: usize = worker_results
            .iter()
            .map(|result| result.successful_interactions)
            .sum();

        let average_latency_nanos = total_nanos / worker_results.len() as f64;
        let aggregate_throughput_per_nano = if total_nanos > 0.0 {
            total_successful as f64 / total_nanos
        } else {
            0.0
        };

        let mut interactions = InteractionMetrics::default();
        for result in &worker_results {
            interactions.merge(&result.interactions)?;
        }

        Ok(Self {
            average_latency_nanos,
            aggregate_throughput_per_nano,
            wall_clock,
            interactions,
            worker_results,
        })
    }

    /// Number of workers that contributed to this run.
    pub fn workers(&self) -> usize {
        self.worker_results.len()
    }

    /// Successful interactions across all workers.
    pub fn successful_interactions(&self) -> usize {
        self.worker_results
            .iter()
            .map(|r| r.successful_interactions)
            .sum()
    }

    /// Attempted customer interactions across all workers.
    pub fn total_customer_interactions(&self) -> usize {
        self.worker_results
            .iter()
            .map(|r| r.total_customer_interactions)
            .sum()
    }

    /// Successful customer interactions across all workers.
    pub fn successful_customer_interactions(&self) -> usize {
        self.worker_results
            .iter()
            .map(|r| r.successful_customer_interactions)
            .sum()
    }

    /// [`aggregate_throughput_per_nano`](Self::aggregate_throughput_per_nano) scaled to seconds.
    pub fn throughput_per_second(&self) -> f64 {
        self.aggregate_throughput_per_nano * 1e9
    }

    /// Successful interactions per second of wall-clock time.
    pub fn wall_clock_throughput_per_second(&self) -> f64 {
        let secs = self.wall_clock.as_secs_f64();
        if secs > 0.0 {
            self.successful_interactions() as f64 / secs
        } else {
            0.0
        }
    }

    /// Ratio of successful customer interactions, or `None` if there were none.
    pub fn customer_success_rate(&self) -> Option<f64> {
        let total = self.total_customer_interactions();
        (total > 0).then(|| self.successful_customer_interactions() as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(successful: usize, elapsed_ms: u64) -> WorkerResult {
        let mut interactions = InteractionMetrics::default();
        for _ in 0..successful {
            interactions.record(InteractionKind::Customer, Duration::from_millis(1), true);
        }
        interactions.record(InteractionKind::Rare, Duration::from_millis(3), false);

        WorkerResult {
            successful_interactions: successful,
            elapsed: Duration::from_millis(elapsed_ms),
            measured_runs_requested: successful + 1,
            successful_customer_interactions: successful,
            total_customer_interactions: successful,
            interactions,
        }
    }

    #[test]
    fn aggregates_per_worker_sums() {
        let metrics = AggregateMetrics::from_results(
            vec![result(10, 100), result(30, 300)],
            Duration::from_millis(300),
        )
        .unwrap();

        // (100ms + 300ms) / 2 workers
        assert_eq!(metrics.average_latency_nanos, 200_000_000.0);
        // 40 successes over 400ms of summed worker time
        assert_eq!(metrics.aggregate_throughput_per_nano, 40.0 / 400_000_000.0);
        assert!((metrics.throughput_per_second() - 100.0).abs() < 1e-9);
        assert!((metrics.wall_clock_throughput_per_second() - 40.0 / 0.3).abs() < 1e-9);

        assert_eq!(metrics.workers(), 2);
        assert_eq!(metrics.successful_interactions(), 40);
        assert_eq!(metrics.customer_success_rate(), Some(1.0));

        assert_eq!(metrics.interactions.customer.count(), 40);
        assert_eq!(metrics.interactions.rare.count(), 2);
        assert_eq!(metrics.interactions.rare.failures, 2);
        assert_eq!(metrics.interactions.frequent_stock.count(), 0);
    }

    #[test]
    fn zero_elapsed_has_zero_throughput() {
        let metrics = AggregateMetrics::from_results(vec![result(0, 0)], Duration::ZERO).unwrap();
        assert_eq!(metrics.average_latency_nanos, 0.0);
        assert_eq!(metrics.aggregate_throughput_per_nano, 0.0);
        assert_eq!(metrics.customer_success_rate(), None);
    }

    #[test]
    fn empty_results_are_rejected() {
        let result = AggregateMetrics::from_results(vec![], Duration::ZERO);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn kind_latencies() {
        let mut metrics = InteractionMetrics::default();
        assert_eq!(metrics.customer.average_latency(), None);
        assert_eq!(metrics.customer.latency_quantile(0.5), None);

        metrics.record(InteractionKind::Customer, Duration::from_millis(10), true);
        metrics.record(InteractionKind::Customer, Duration::from_millis(30), true);

        let avg = metrics.customer.average_latency().unwrap();
        assert!((avg.as_secs_f64() - 0.02).abs() < 1e-9);
        assert!(metrics.customer.latency_quantile(0.99).is_some());
    }
}
