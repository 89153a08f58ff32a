pub mod builders;
pub mod fake_executor;
pub mod sinks;

use std::sync::{Arc, Once};

use taskunit::exec::Executor;
use taskunit::task::TaskDeps;
use tracing_subscriber::{fmt, EnvFilter};

use crate::sinks::{MemoryLogSink, RecordingStatusSink};

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary.
///
/// Output goes through the test writer, so it only shows up for failing
/// tests. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Task dependencies wired to in-memory sinks, returned alongside the sinks.
pub fn recording_deps(executor: Arc<dyn Executor>) -> (TaskDeps, MemoryLogSink, RecordingStatusSink) {
    let logs = MemoryLogSink::new();
    let statuses = RecordingStatusSink::new();
    let deps = TaskDeps {
        executor,
        log_sink: Arc::new(logs.clone()),
        status_sink: Arc::new(statuses.clone()),
    };
    (deps, logs, statuses)
}

/// Await `f`, panicking if it takes longer than five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(std::time::Duration::from_secs(5), f).await {
        Ok(value) => value,
        Err(_) => panic!("future did not complete within 5 seconds"),
    }
}
