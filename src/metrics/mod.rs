//! Run-scoped counters and progress reporting for a scan.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub mod memory;

pub use memory::memory_stats_mb;

/// Counters shared by reference between the stages of one run.
#[derive(Debug, Default)]
pub struct ScanCounters {
    pub records_read: AtomicU64,
    pub malformed: AtomicU64,
    pub distance_misses: AtomicU64,
    pub candidates: AtomicU64,
    pub category_signals: AtomicU64,
}

impl ScanCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Summary of a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub records_read: u64,
    pub malformed: u64,
    pub distance_misses: u64,
    pub candidates_collected: u64,
    /// Category sightings before de-duplication by key.
    pub category_signals: u64,
    pub category_members: u64,
    pub candidates_kept: u64,
    pub scan_ms: u64,
    pub finalize_ms: u64,
}

impl ScanStats {
    pub fn records_per_second(&self) -> f64 {
        if self.scan_ms > 0 {
            (self.records_read as f64 * 1000.0) / self.scan_ms as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        log::info!("=== Scan Summary ===");
        log::info!("Records: {} read, {} malformed, {} without distance", self.records_read, self.malformed, self.distance_misses);
        log::info!("Candidates: {} collected, {} kept after parent join ({} category members from {} sightings)",
            self.candidates_collected, self.candidates_kept, self.category_members, self.category_signals);
        log::info!("Timing: scan {} ms ({:.0} records/sec), join+sort {} ms",
            self.scan_ms, self.records_per_second(), self.finalize_ms);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    pub update_every: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { update_every: 100_000 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub records_read: u64,
    pub queued: usize,
    pub candidates: u64,
    /// Share of the record limit consumed; `None` when reading to the end.
    pub percent: Option<f32>,
    pub records_per_sec: f64,
    pub mem_used_mb: u64,
    pub mem_avail_mb: u64,
    pub stage: &'static str,
}

/// Emits a `ProgressUpdate` every `update_every` records.
pub struct ProgressMonitor {
    start: Instant,
    every: u64,
    limit: u64,
    last_emit: u64,
}

impl ProgressMonitor {
    pub fn new(cfg: ProgressConfig, limit: u64) -> Self {
        Self { start: Instant::now(), every: cfg.update_every.max(1), limit, last_emit: 0 }
    }

    pub fn due(&self, records_read: u64) -> bool {
        records_read - self.last_emit >= self.every
    }

    pub fn update(&mut self, stage: &'static str, records_read: u64, queued: usize, candidates: u64) -> ProgressUpdate {
        self.last_emit = records_read;
        let elapsed = self.start.elapsed();
        let mem = memory_stats_mb();
        ProgressUpdate {
            records_read,
            queued,
            candidates,
            percent: (self.limit > 0).then(|| (records_read as f32 / self.limit as f32 * 100.0).clamp(0.0, 100.0)),
            records_per_sec: rate(records_read, elapsed),
            mem_used_mb: mem.used_mb,
            mem_avail_mb: mem.avail_mb,
            stage,
        }
    }
}

fn rate(records: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { records as f64 / secs } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_emits_on_interval() {
        let mut m = ProgressMonitor::new(ProgressConfig { update_every: 10 }, 40);
        assert!(!m.due(9));
        assert!(m.due(10));
        let u = m.update("scanning", 10, 3, 1);
        assert_eq!(u.percent, Some(25.0));
        assert!(!m.due(19));
        assert!(m.due(20));
    }

    #[test]
    fn unlimited_has_no_percent() {
        let mut m = ProgressMonitor::new(ProgressConfig::default(), 0);
        assert!(m.update("scanning", 5, 0, 0).percent.is_none());
    }

    #[test]
    fn stats_rate() {
        let s = ScanStats { records_read: 3000, scan_ms: 300, ..Default::default() };
        assert!((s.records_per_second() - 10_000.0).abs() < 1.0);
        assert_eq!(ScanStats::default().records_per_second(), 0.0);
    }
}
