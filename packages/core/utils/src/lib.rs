use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

pub mod error_handle;
pub mod random;

pub trait Timer: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Default)]
pub struct SystemTimer();

impl Timer for SystemTimer {
    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }
}

/// Manual clock for tests, time only moves when `fake` or `advance` is called
#[derive(Default)]
pub struct MockTimer {
    now_ms: AtomicU64,
}

impl MockTimer {
    pub fn fake(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }
}

impl Timer for MockTimer {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}
