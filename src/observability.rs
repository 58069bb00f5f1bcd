//! Process-wide counters (no exporter; snapshots for logs and tests)

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    boards_started: AtomicU64,
    boards_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board_started(&self) {
        self.boards_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn board_failed(&self) {
        self.boards_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            boards_started: self.boards_started.load(Ordering::Relaxed),
            boards_failed: self.boards_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub boards_started: u64,
    pub boards_failed: u64,
}
