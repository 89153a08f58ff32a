#![allow(dead_code)]

pub use taskunit_test_utils::builders;
pub use taskunit_test_utils::fake_executor::{FakeBehaviour, FakeExecutor};
pub use taskunit_test_utils::sinks::{MemoryLogSink, RecordingStatusSink};
pub use taskunit_test_utils::{init_tracing, recording_deps, with_timeout};
