//! Cooperative cancellation flag shared with the transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set once by the owner of an operation; polled by the transport.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
