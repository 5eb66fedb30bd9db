pub mod pipeline;

pub use pipeline::{scan_bodies, scan_bodies_file, ScanOutcome};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle an outside caller keeps to abort a running scan.
#[derive(Clone, Debug, Default)]
pub struct ScanControl {
    pub cancel: Arc<AtomicBool>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}
