//! Concurrent body scan.
//!
//! ```text
//! reader --raw--> worker x N --candidates--> match collector ----\
//!                            \--category keys--> registry builder --+--> barrier --> post-join --> sort
//! ```
//!
//! The raw queue is bounded and is the only backpressure on the reader.
//! Each aggregator owns its output outright and hands it back through its
//! join handle, so the coordinator cannot look at the category registry
//! until every worker has exited and the builder has drained its channel.

use super::ScanControl;
use crate::config::ScanConfig;
use crate::distances::DistanceTable;
use crate::error::{DecodeError, FramingError, ScanError};
use crate::filter::{self, CategoryRegistry, CompiledCriteria, FilterCriteria, RegistryBuilder};
use crate::metrics::{ProgressConfig, ProgressMonitor, ProgressUpdate, ScanCounters, ScanStats};
use crate::models::{Body, Candidate, CategoryKey};
use crate::source::{self, RawRecord, RecordDecoder};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::any::Any;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

/// How long a blocked stage waits before re-checking for cancellation.
const POLL: Duration = Duration::from_millis(50);

/// Malformed records reported at warn level before dropping to debug.
const MALFORMED_WARN_LIMIT: u64 = 5;

#[derive(Debug)]
pub struct ScanOutcome {
    /// Survivors of the parent join, in final order.
    pub candidates: Vec<Candidate>,
    pub registry: CategoryRegistry,
    pub stats: ScanStats,
}

#[derive(Clone, Copy)]
struct Stop<'a> {
    ctrl: Option<&'a ScanControl>,
    abort: &'a AtomicBool,
}

impl Stop<'_> {
    fn requested(&self) -> bool {
        self.abort.load(Ordering::Relaxed) || self.cancelled()
    }

    fn cancelled(&self) -> bool {
        self.ctrl.is_some_and(ScanControl::is_cancelled)
    }

    fn trip(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }
}

/// Scan an already-opened body dump.
pub fn scan_bodies<R, F>(
    reader: R,
    table: &DistanceTable,
    criteria: &FilterCriteria,
    cfg: &ScanConfig,
    on_progress: F,
    ctrl: Option<&ScanControl>,
) -> Result<ScanOutcome, ScanError>
where
    R: BufRead + Send,
    F: Fn(ProgressUpdate) + Sync,
{
    cfg.validate()?;
    let compiled = criteria.compile()?;
    let compiled = &compiled;
    let counters = &ScanCounters::default();
    let abort = AtomicBool::new(false);
    let stop = Stop { ctrl, abort: &abort };
    let on_progress = &on_progress;
    let progress = ProgressConfig { update_every: cfg.update_every };
    let mut phase = ProgressMonitor::new(progress, cfg.limit);
    let started = Instant::now();

    log::info!(
        "scanning with {} workers (queue capacity {}, limit {})",
        cfg.workers, cfg.queue_capacity, cfg.limit
    );

    let (raw_tx, raw_rx) = bounded::<RawRecord>(cfg.queue_capacity);
    let (match_tx, match_rx) = bounded::<Candidate>(cfg.result_capacity);
    let (member_tx, member_rx) = bounded::<CategoryKey>(cfg.result_capacity);

    let (read_result, collected, registry) = thread::scope(|s| {
        let registry_h = spawn_named(s, "category-registry".into(), stop, move || build_registry(member_rx, stop))?;
        let collector_h = spawn_named(s, "match-collector".into(), stop, move || collect_matches(match_rx, stop))?;

        let mut workers = Vec::with_capacity(cfg.workers);
        for id in 0..cfg.workers {
            let rx = raw_rx.clone();
            let matches = match_tx.clone();
            let members = member_tx.clone();
            workers.push(spawn_named(s, format!("scan-worker-{id}"), stop, move || {
                filter_worker(id, rx, matches, members, table, compiled, counters, stop)
            })?);
        }
        // Workers now hold the only senders, so each aggregator's input
        // closes exactly when the last worker exits.
        drop(raw_rx);
        drop(match_tx);
        drop(member_tx);

        let reader_h = spawn_named(s, "scan-reader".into(), stop, move || {
            read_records(reader, cfg.limit, raw_tx, counters, stop, progress, on_progress)
        })?;

        let read_result = join(reader_h, stop)?;
        for w in workers {
            join(w, stop)?;
        }
        let registry = join(registry_h, stop)?;
        let collected = join(collector_h, stop)?;
        Ok::<_, ScanError>((read_result, collected, registry))
    })?;

    let records_read = ScanCounters::get(&counters.records_read);
    read_result.map_err(|e| e.into_scan_error(records_read))?;
    if stop.cancelled() {
        log::warn!("scan cancelled after {} records", records_read);
        return Err(ScanError::Cancelled { records_read });
    }
    let scan_ms = started.elapsed().as_millis() as u64;
    log::info!(
        "scan phase done: {} records, {} candidates, {} category members",
        records_read, collected.len(), registry.len()
    );

    let finalize_start = Instant::now();
    let candidates_collected = collected.len() as u64;
    on_progress(phase.update("joining", records_read, 0, candidates_collected));
    let mut kept = filter::post_join(collected, &registry, &criteria.parent_label);
    on_progress(phase.update("sorting", records_read, 0, kept.len() as u64));
    filter::sort_candidates(&mut kept);

    let stats = ScanStats {
        records_read,
        malformed: ScanCounters::get(&counters.malformed),
        distance_misses: ScanCounters::get(&counters.distance_misses),
        candidates_collected,
        category_signals: ScanCounters::get(&counters.category_signals),
        category_members: registry.len() as u64,
        candidates_kept: kept.len() as u64,
        scan_ms,
        finalize_ms: finalize_start.elapsed().as_millis() as u64,
    };
    on_progress(phase.update("done", records_read, 0, stats.candidates_kept));
    Ok(ScanOutcome { candidates: kept, registry, stats })
}

/// Open a gzip body dump and scan it.
pub fn scan_bodies_file<F>(
    path: impl AsRef<Path>,
    table: &DistanceTable,
    criteria: &FilterCriteria,
    cfg: &ScanConfig,
    on_progress: F,
    ctrl: Option<&ScanControl>,
) -> anyhow::Result<ScanOutcome>
where
    F: Fn(ProgressUpdate) + Sync,
{
    let reader = source::open_gz(path)?;
    Ok(scan_bodies(reader, table, criteria, cfg, on_progress, ctrl)?)
}

fn read_records<R, F>(
    reader: R,
    limit: u64,
    tx: Sender<RawRecord>,
    counters: &ScanCounters,
    stop: Stop<'_>,
    progress: ProgressConfig,
    on_progress: &F,
) -> Result<(), FramingError>
where
    R: BufRead,
    F: Fn(ProgressUpdate),
{
    let mut decoder = RecordDecoder::with_limit(reader, limit);
    let mut monitor = ProgressMonitor::new(progress, limit);
    while let Some(next) = decoder.next() {
        let raw = match next {
            Ok(raw) => raw,
            Err(e) => {
                stop.trip();
                log::error!("aborting scan: {}", e);
                return Err(e);
            }
        };
        if !send_until_stopped(&tx, raw, stop) {
            log::debug!("reader stopping early at byte {}", decoder.offset());
            return Ok(());
        }
        let n = counters.records_read.fetch_add(1, Ordering::Relaxed) + 1;
        if monitor.due(n) {
            on_progress(monitor.update("scanning", n, tx.len(), ScanCounters::get(&counters.candidates)));
        }
    }
    log::debug!("reader finished after {} records ({} bytes)", decoder.records_read(), decoder.offset());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn filter_worker(
    id: usize,
    rx: Receiver<RawRecord>,
    matches: Sender<Candidate>,
    members: Sender<CategoryKey>,
    table: &DistanceTable,
    criteria: &CompiledCriteria<'_>,
    counters: &ScanCounters,
    stop: Stop<'_>,
) {
    log::debug!("worker {} starting", id);
    let mut handled = 0u64;
    while let Some(raw) = recv_until_stopped(&rx, stop) {
        handled += 1;
        let body: Body = match serde_json::from_slice(&raw.bytes) {
            Ok(body) => body,
            Err(source) => {
                note_malformed(counters, DecodeError { index: raw.index, source });
                continue;
            }
        };
        let Some(distance) = table.get(body.system_id) else {
            ScanCounters::bump(&counters.distance_misses);
            continue;
        };
        if criteria.is_category_member(&body) {
            ScanCounters::bump(&counters.category_signals);
            if !send_until_stopped(&members, CategoryKey::of(&body), stop) {
                break;
            }
        }
        if criteria.is_candidate(&body) {
            ScanCounters::bump(&counters.candidates);
            if !send_until_stopped(&matches, Candidate::new(body, distance), stop) {
                break;
            }
        }
    }
    log::debug!("worker {} done after {} records", id, handled);
}

fn build_registry(rx: Receiver<CategoryKey>, stop: Stop<'_>) -> CategoryRegistry {
    let mut builder = RegistryBuilder::default();
    while let Some(key) = recv_until_stopped(&rx, stop) {
        builder.insert(key);
    }
    builder.finish()
}

fn collect_matches(rx: Receiver<Candidate>, stop: Stop<'_>) -> Vec<Candidate> {
    let mut out = Vec::new();
    while let Some(c) = recv_until_stopped(&rx, stop) {
        out.push(c);
    }
    out
}

fn note_malformed(counters: &ScanCounters, err: DecodeError) {
    let seen = counters.malformed.fetch_add(1, Ordering::Relaxed) + 1;
    if seen <= MALFORMED_WARN_LIMIT {
        log::warn!("skipping {}", err);
    } else {
        log::debug!("skipping {}", err);
    }
}

/// Returns false when the item could not be delivered.
fn send_until_stopped<T>(tx: &Sender<T>, mut item: T, stop: Stop<'_>) -> bool {
    loop {
        if stop.requested() {
            return false;
        }
        match tx.send_timeout(item, POLL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => item = back,
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

/// `None` once the channel is closed and drained, or a stop was requested.
fn recv_until_stopped<T>(rx: &Receiver<T>, stop: Stop<'_>) -> Option<T> {
    loop {
        if stop.requested() {
            return None;
        }
        match rx.recv_timeout(POLL) {
            Ok(item) => return Some(item),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn spawn_named<'scope, 'env, T, F>(
    s: &'scope Scope<'scope, 'env>,
    name: String,
    stop: Stop<'_>,
    f: F,
) -> Result<ScopedJoinHandle<'scope, T>, ScanError>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new().name(name).spawn_scoped(s, f).map_err(|e| {
        stop.trip();
        ScanError::Spawn(e)
    })
}

fn join<T>(handle: ScopedJoinHandle<'_, T>, stop: Stop<'_>) -> Result<T, ScanError> {
    handle.join().map_err(|payload| {
        stop.trip();
        ScanError::WorkerPanicked(panic_message(&*payload))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
