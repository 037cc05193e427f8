use tracing_subscriber::EnvFilter;

/// Crates whose events show up in test output unless `RUST_LOG` says otherwise.
const WORKLOAD_CRATES: &[&str] = &["bookstore_workload", "bookstore_service", "bookstore_types"];

/// Routes workload, store and type events into the captured output of the running test.
///
/// Output only appears for failing tests or with `--nocapture`. Without `RUST_LOG`, every event of
/// the bookstore crates is shown, including the per-iteration debug lines of the workers, while
/// dependencies only report errors. Calling this more than once is harmless.
///
/// # Example
///
/// ```
/// bookstore_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        WORKLOAD_CRATES
            .iter()
            .filter_map(|name| format!("{name}=TRACE").parse().ok())
            .fold(EnvFilter::new("ERROR"), EnvFilter::add_directive)
    });

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}
