use std::{io::Write, sync::LazyLock};

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Serializes tests that share the key vault or a test collection.
#[derive(Debug, Default)]
pub struct TestLock {
    inner: RwLock<()>,
}

impl TestLock {
    /// Creates an unlocked lock.
    pub fn new() -> Self {
        Default::default()
    }

    /// Tests that only read shared state can hold this guard.
    pub async fn run_concurrently(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.read().await
    }

    /// Provisioning (key vault resets, collection recreation) must hold this guard.
    pub async fn run_exclusively(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write().await
    }
}

/// The process-wide provisioning lock.
pub static LOCK: LazyLock<TestLock> = LazyLock::new(TestLock::new);

/// Writes a line to stderr and to the `LOG_UNCAPTURED` sink (default `/dev/tty`), bypassing the
/// test harness output capture.
pub fn log_uncaptured<S: AsRef<str>>(text: S) {
    let mut stderr = std::io::stderr();
    let mut sinks = vec![&mut stderr as &mut dyn Write];
    let mut other;
    let other_path = std::env::var("LOG_UNCAPTURED").unwrap_or("/dev/tty".to_string());
    if let Ok(f) = std::fs::OpenOptions::new().append(true).open(other_path) {
        other = f;
        sinks.push(&mut other);
    }

    for sink in sinks {
        let _ = sink.write_all(text.as_ref().as_bytes());
        let _ = sink.write_all(b"\n");
    }
}
