// src/cancel.rs
//! Cooperative cancellation for long-running calibration and Monte Carlo loops.
//!
//! Grid-search calibration and path simulation are the only unbounded-duration
//! operations in the crate. Both check a shared token between units of work and
//! bail out with [`EngineError::Cancelled`](crate::error::EngineError::Cancelled).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheaply clonable cancellation flag shared between a caller and a worker.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; safe to call from any thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
