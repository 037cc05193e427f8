//! Printing and persisting the metrics of a concurrency level.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use yansi::Paint;

use crate::metrics::{AggregateMetrics, KindMetrics};
use crate::workload::InteractionKind;

/// Prints a human readable summary of one level to stdout.
pub fn print_level(concurrency: usize, metrics: &AggregateMetrics) -> io::Result<()> {
    write_level(&mut io::stdout().lock(), concurrency, metrics)
}

/// Writes the summary printed by [`print_level`] to `out`.
///
/// Kinds without measured interactions are left out.
pub fn write_level(
    out: &mut impl Write,
    concurrency: usize,
    metrics: &AggregateMetrics,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{} {} (workers: {}, wall clock: {:.2?})",
        "## Level".bold(),
        concurrency.bold().blue(),
        metrics.workers().bold(),
        metrics.wall_clock
    )?;

    let average = Duration::from_nanos(metrics.average_latency_nanos as u64);
    writeln!(out, "  average worker latency: {:.2?}", average.bold())?;
    writeln!(
        out,
        "  aggregate throughput: {} interactions/s",
        format!("{:.2}", metrics.throughput_per_second()).bold()
    )?;
    writeln!(
        out,
        "  wall clock throughput: {:.2} interactions/s",
        metrics.wall_clock_throughput_per_second()
    )?;

    match metrics.customer_success_rate() {
        Some(rate) => writeln!(
            out,
            "  customers: {}/{} successful ({:.1}%)",
            metrics.successful_customer_interactions(),
            metrics.total_customer_interactions(),
            rate * 100.0
        )?,
        None => writeln!(out, "  customers: none")?,
    }

    for kind in InteractionKind::ALL {
        write_interactions(out, kind, metrics.interactions.get(kind))?;
    }

    Ok(())
}

fn write_interactions(
    out: &mut impl Write,
    kind: InteractionKind,
    metrics: &KindMetrics,
) -> io::Result<()> {
    if metrics.count() == 0 {
        return Ok(());
    }

    write!(
        out,
        "{} ({} ops",
        format!("{}:", kind.name().to_uppercase()).bold().green(),
        metrics.count().bold()
    )?;
    if metrics.failures > 0 {
        write!(
            out,
            ", {}",
            format!("{} FAILURES", metrics.failures).bold().red()
        )?;
    }
    writeln!(out, ")")?;
    write_percentiles(out, metrics)
}

fn write_percentiles(out: &mut impl Write, metrics: &KindMetrics) -> io::Result<()> {
    let (Some(avg), Some(p50), Some(p90), Some(p99)) = (
        metrics.average_latency(),
        metrics.latency_quantile(0.5),
        metrics.latency_quantile(0.9),
        metrics.latency_quantile(0.99),
    ) else {
        return Ok(());
    };

    writeln!(
        out,
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    )
}

/// Per-kind entry of a [`LevelReport`].
#[derive(Debug, Serialize)]
pub struct KindReport {
    /// Number of measured interactions of this kind.
    pub count: usize,
    /// Interactions of this kind the store rejected.
    pub failures: u64,
    /// Median latency in seconds.
    pub p50_secs: Option<f64>,
    /// 99th percentile latency in seconds.
    pub p99_secs: Option<f64>,
}

impl From<&KindMetrics> for KindReport {
    fn from(metrics: &KindMetrics) -> Self {
        Self {
            count: metrics.count(),
            failures: metrics.failures,
            p50_secs: metrics.latency_quantile(0.5).map(|d| d.as_secs_f64()),
            p99_secs: metrics.latency_quantile(0.99).map(|d| d.as_secs_f64()),
        }
    }
}

/// One line of the JSON report, describing a single concurrency level.
#[derive(Debug, Serialize)]
pub struct LevelReport {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Mean measured duration of the workers, in nanoseconds.
    pub average_latency_nanos: f64,
    /// Successful interactions over the summed worker time, per second.
    pub throughput_per_second: f64,
    /// Successful interactions over the wall-clock time, per second.
    pub wall_clock_throughput_per_second: f64,
    /// Duration of the whole level in seconds.
    pub wall_clock_secs: f64,
    /// Successful interactions of all workers.
    pub successful_interactions: usize,
    /// Ratio of successful customer interactions.
    pub customer_success_rate: Option<f64>,
    /// Per-kind counts and latencies, keyed by [`InteractionKind::name`].
    pub interactions: BTreeMap<&'static str, KindReport>,
}

impl LevelReport {
    /// Summarizes the metrics of one level.
    pub fn new(concurrency: usize, metrics: &AggregateMetrics) -> Self {
        let interactions: BTreeMap<_, _> = InteractionKind::ALL
            .into_iter()
            .map(|kind| (kind.name(), KindReport::from(metrics.interactions.get(kind))))
            .collect();

        Self {
            concurrency,
            average_latency_nanos: metrics.average_latency_nanos,
            throughput_per_second: metrics.throughput_per_second(),
            wall_clock_throughput_per_second: metrics.wall_clock_throughput_per_second(),
            wall_clock_secs: metrics.wall_clock.as_secs_f64(),
            successful_interactions: metrics.successful_interactions(),
            customer_success_rate: metrics.customer_success_rate(),
            interactions,
        }
    }
}

/// Appends [`LevelReport`]s to a file, one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesWriter {
    writer: BufWriter<File>,
}

impl JsonLinesWriter {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Writes one report and flushes it, so partial sweeps leave complete lines behind.
    pub fn write(&mut self, report: &LevelReport) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use crate::metrics::{InteractionMetrics, WorkerResult};

    use super::*;

    fn metrics() -> AggregateMetrics {
        let mut interactions = InteractionMetrics::default();
        interactions.record(InteractionKind::Customer, Duration::from_millis(2), true);
        interactions.record(InteractionKind::Customer, Duration::from_millis(4), false);
        interactions.record(InteractionKind::Rare, Duration::from_millis(8), true);

        let result = WorkerResult {
            successful_interactions: 2,
            elapsed: Duration::from_millis(20),
            measured_runs_requested: 3,
            successful_customer_interactions: 1,
            total_customer_interactions: 2,
            interactions,
        };

        AggregateMetrics::from_results(vec![result], Duration::from_millis(25)).unwrap()
    }

    #[test]
    fn summarizes_level() {
        let report = LevelReport::new(1, &metrics());

        assert_eq!(report.concurrency, 1);
        assert_eq!(report.successful_interactions, 2);
        assert_eq!(report.customer_success_rate, Some(0.5));
        assert_eq!(report.average_latency_nanos, 20_000_000.0);
        assert!((report.throughput_per_second - 100.0).abs() < 1e-6);

        let customer = &report.interactions["customer"];
        assert_eq!(customer.count, 2);
        assert_eq!(customer.failures, 1);
        assert!(customer.p50_secs.is_some());

        let frequent = &report.interactions["frequent-stock"];
        assert_eq!(frequent.count, 0);
        assert_eq!(frequent.p99_secs, None);
    }

    #[test]
    fn appends_json_lines() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let metrics = metrics();

        let mut writer = JsonLinesWriter::open(file.path()).unwrap();
        writer.write(&LevelReport::new(1, &metrics)).unwrap();
        writer.write(&LevelReport::new(2, &metrics)).unwrap();
        drop(writer);

        let mut writer = JsonLinesWriter::open(file.path()).unwrap();
        writer.write(&LevelReport::new(3, &metrics)).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let levels: Vec<u64> = contents
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["concurrency"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(levels, [1, 2, 3]);
    }

    #[test]
    fn writes_only_measured_kinds() {
        let mut out = Vec::new();
        write_level(&mut out, 1, &metrics()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("customers: 1/2 successful (50.0%)"), "{text}");
        assert!(text.contains("CUSTOMER:"), "{text}");
        assert!(text.contains("1 FAILURES"), "{text}");
        assert!(text.contains("RARE:"), "{text}");
        assert!(text.contains("p99:"), "{text}");
        assert!(!text.contains("FREQUENT-STOCK:"), "{text}");
    }
}
