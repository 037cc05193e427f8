//! Configuration for the bookstore workload driver.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Environment variables (prefixed with `BW__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `BW__` as a prefix and double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `BW__CONCURRENCY__END=50` stops the ramp at 50 workers
//! - `BW__WORKLOAD__MEASURED_RUNS=1000` sets the number of timed iterations per worker
//! - `BW__LOGGING__FORMAT=json` switches to JSON logs
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! concurrency:
//!   end: 50
//!
//! workload:
//!   measured_runs: 1000
//!
//! logging:
//!   format: json
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bookstore_service::{SharedBookStore, SharedStockManager};
use bookstore_types::StockBook;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::{Error, Result};
use crate::sampler::Sampler;
use crate::workload::WorkloadConfiguration;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "BW__";

/// The concurrency levels to sweep.
///
/// The driver runs one level after another, starting at `start` workers and increasing by `step`
/// until `end` is exceeded.
///
/// Used in: [`Config::concurrency`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ConcurrencyRamp {
    /// Number of workers of the first level.
    ///
    /// # Default
    ///
    /// `10`
    ///
    /// # Environment Variable
    ///
    /// `BW__CONCURRENCY__START`
    pub start: usize,

    /// Largest number of workers. Included if reachable from `start` in steps of `step`.
    ///
    /// # Default
    ///
    /// `200`
    ///
    /// # Environment Variable
    ///
    /// `BW__CONCURRENCY__END`
    pub end: usize,

    /// Increment between two levels.
    ///
    /// # Default
    ///
    /// `10`
    ///
    /// # Environment Variable
    ///
    /// `BW__CONCURRENCY__STEP`
    pub step: usize,
}

impl ConcurrencyRamp {
    /// Returns all concurrency levels of the ramp in ascending order.
    pub fn levels(&self) -> Result<Vec<usize>> {
        if self.start == 0 || self.step == 0 {
            return Err(Error::invalid(format!(
                "concurrency ramp needs a positive start and step, got start {} and step {}",
                self.start, self.step
            )));
        }
        if self.start > self.end {
            return Err(Error::invalid(format!(
                "concurrency ramp starts at {} beyond its end {}",
                self.start, self.end
            )));
        }

        Ok((self.start..=self.end).step_by(self.step).collect())
    }
}

impl Default for ConcurrencyRamp {
    fn default() -> Self {
        Self {
            start: 10,
            end: 200,
            step: 10,
        }
    }
}

/// Runtime configuration for the Tokio async runtime.
///
/// Used in: [`Config::runtime`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Runtime {
    /// Number of worker threads of the runtime the workers are spawned on.
    ///
    /// Workers only run in parallel up to this number. Levels with more workers than threads
    /// interleave them.
    ///
    /// # Default
    ///
    /// The available parallelism of the host.
    ///
    /// # Environment Variable
    ///
    /// `BW__RUNTIME__WORKER_THREADS`
    pub worker_threads: usize,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2025-06-04T12:10:32Z  INFO bookstore_workload::orchestrator: starting workers concurrency=10
    /// ```
    Simplified,

    /// Dump out JSON lines.
    Json,
}

/// The logging format parse error.
#[derive(Clone, Debug)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of "auto", "pretty", "simplified", "json""#,
            self.0
        )
    }
}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

impl std::error::Error for FormatParseError {}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr, so they never mix with the report on stdout.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// The `RUST_LOG` environment variable overrides this and allows per-module directives.
    /// `DEBUG` logs one line per failed interaction, which slows down the workers noticeably.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `BW__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format. See [`LogFormat`] for available options.
    ///
    /// # Default
    ///
    /// `Auto` (pretty for TTY, simplified otherwise)
    ///
    /// # Environment Variable
    ///
    /// `BW__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Parameters shared by all workers of a level.
///
/// Used in: [`Config::workload`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Workload {
    /// Iterations per worker before measuring (`BW__WORKLOAD__WARM_UP_RUNS`, default `100`).
    pub warm_up_runs: usize,
    /// Timed iterations per worker (`BW__WORKLOAD__MEASURED_RUNS`, default `500`).
    pub measured_runs: usize,
    /// Percentage of rare interactions (`BW__WORKLOAD__RARE_THRESHOLD`, default `10`).
    pub rare_threshold: f64,
    /// Cumulative percentage of rare and frequent stock interactions
    /// (`BW__WORKLOAD__FREQUENT_THRESHOLD`, default `30`).
    pub frequent_threshold: f64,
    /// Books generated by a rare interaction (default `5`).
    pub num_books_to_add: usize,
    /// Books restocked by a frequent stock interaction (default `5`).
    pub num_books_with_least_copies: usize,
    /// Copies added to each restocked book (default `10`).
    pub num_copies_to_add: u64,
    /// Editor picks a customer samples (default `10`).
    pub num_editor_picks_to_sample: usize,
    /// Copies a customer buys of each sampled book (default `1`).
    pub num_copies_to_buy: u64,

    /// Base seed of the workers' random number generators.
    ///
    /// Worker `i` is seeded with `seed + i`. When unset, every level picks a random seed and logs
    /// it.
    ///
    /// # Environment Variable
    ///
    /// `BW__WORKLOAD__SEED`
    pub seed: Option<u64>,
}

impl Workload {
    /// Creates the configuration of one level running against the given store.
    pub fn configure(
        &self,
        stock_manager: SharedStockManager,
        book_store: SharedBookStore,
        sampler: Sampler,
    ) -> Result<WorkloadConfiguration> {
        let mut builder = WorkloadConfiguration::builder(stock_manager, book_store)
            .sampler(sampler)
            .warm_up_runs(self.warm_up_runs)
            .measured_runs(self.measured_runs)
            .interaction_mix(self.rare_threshold, self.frequent_threshold)
            .num_books_to_add(self.num_books_to_add)
            .num_books_with_least_copies(self.num_books_with_least_copies)
            .num_copies_to_add(self.num_copies_to_add)
            .num_editor_picks_to_sample(self.num_editor_picks_to_sample)
            .num_copies_to_buy(self.num_copies_to_buy);

        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }

        builder.build()
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            warm_up_runs: 100,
            measured_runs: 500,
            rare_threshold: 10.0,
            frequent_threshold: 30.0,
            num_books_to_add: 5,
            num_books_with_least_copies: 5,
            num_copies_to_add: 10,
            num_editor_picks_to_sample: 10,
            num_copies_to_buy: 1,
            seed: None,
        }
    }
}

/// Generator of the new books added by rare interactions.
///
/// Used in: [`Config::generator`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Generator {
    /// Smallest ISBN of generated books (`BW__GENERATOR__ISBN_START`, default `1`).
    pub isbn_start: u64,
    /// Largest ISBN of generated books (`BW__GENERATOR__ISBN_END`, default `1000000`).
    pub isbn_end: u64,
    /// Median number of copies of a generated book (default `10`).
    pub p50_copies: u64,
    /// 99th percentile of the number of copies of a generated book (default `100`).
    pub p99_copies: u64,
    /// Upper bound of the price of a generated book (default `100`).
    pub max_price: f32,
    /// Probability that a generated book is an editor pick (default `0.5`).
    pub editor_pick_ratio: f64,
}

impl Generator {
    /// Builds the sampler described by this section.
    pub fn sampler(&self) -> Result<Sampler> {
        Sampler::builder()
            .isbns(self.isbn_start..=self.isbn_end)
            .copies_distribution(self.p50_copies, self.p99_copies)
            .max_price(self.max_price)
            .editor_pick_ratio(self.editor_pick_ratio)
            .build()
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            isbn_start: 1,
            isbn_end: 1_000_000,
            p50_copies: 10,
            p99_copies: 100,
            max_price: 100.0,
            editor_pick_ratio: 0.5,
        }
    }
}

/// The in-memory store every level runs against.
///
/// Used in: [`Config::store`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Store {
    /// Books loaded into a fresh store before each level.
    ///
    /// Books only need `isbn`, `title`, `author`, `price` and `num_copies`. Set `editor_pick` to
    /// make a book available to customers.
    pub initial_inventory: Vec<StockBook>,
}

impl Default for Store {
    fn default() -> Self {
        let initial_inventory = vec![
            StockBook::new(3044560, "Test of Thrones", "George RR Testin'", 10.0, 100)
                .editor_pick(true),
            StockBook::new(3044561, "Harry Potter and JUnit", "JK Unit", 10.0, 100)
                .editor_pick(true),
            StockBook::new(3044566, "Interstellar", "So great", 10.0, 100).editor_pick(true),
            StockBook::new(3044567, "Blah", "Blah Author", 10.0, 100),
            StockBook::new(
                3044599,
                "This Book Has a Really Really Long Title For Testing Purposes and Such",
                "Blah Author",
                10.0,
                300,
            ),
        ];

        Self { initial_inventory }
    }
}

/// Main configuration struct for the workload driver.
///
/// See individual field documentation for details on each configuration option, including
/// defaults and environment variables.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Concurrency levels to sweep. See [`ConcurrencyRamp`].
    pub concurrency: ConcurrencyRamp,

    /// Tokio runtime configuration. See [`Runtime`].
    pub runtime: Runtime,

    /// Logging configuration. See [`Logging`].
    pub logging: Logging,

    /// Workload parameters. See [`Workload`].
    pub workload: Workload,

    /// Generator of new books. See [`Generator`].
    pub generator: Generator,

    /// Store setup. See [`Store`].
    pub store: Store,

    /// Path of a file to append one JSON line per level to.
    ///
    /// # Default
    ///
    /// None, reports are only printed.
    ///
    /// # Environment Variable
    ///
    /// `BW__OUTPUT`
    pub output: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from the provided arguments.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if provided)
    /// 3. Environment variables (prefixed with `BW__`)
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML configuration file cannot be read or parsed, if environment
    /// variables contain invalid values, or if the runtime is configured without worker threads.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        if config.runtime.worker_threads == 0 {
            anyhow::bail!("runtime.worker_threads must be at least 1");
        }

        Ok(config)
    }

    /// Creates the configuration of one level running against the given store.
    pub fn workload_configuration<S>(&self, store: Arc<S>) -> Result<WorkloadConfiguration>
    where
        S: bookstore_service::StockManager + bookstore_service::BookStore,
    {
        let sampler = self.generator.sampler()?;
        self.workload.configure(store.clone(), store, sampler)
    }
}
