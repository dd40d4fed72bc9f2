use tracing_subscriber::EnvFilter;

/// Routes log output through the test harness so it shows up only for failing
/// tests. Repeated calls are no-ops. `RUST_LOG` overrides the default `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
