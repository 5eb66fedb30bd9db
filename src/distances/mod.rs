//! System distance table: built once from the systems dump, then shared
//! read-only by every scan worker.

use crate::error::{DecodeError, ScanError};
use crate::models::StarSystem;
use crate::source::RecordDecoder;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceTable {
    distances: HashMap<i64, f64>,
}

impl DistanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, system_id: i64) -> Option<f64> {
        self.distances.get(&system_id).copied()
    }

    pub fn insert(&mut self, system_id: i64, distance: f64) {
        self.distances.insert(system_id, distance);
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening distance table {}", path.display()))?;
        let table: Self = bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("decoding distance table {}", path.display()))?;
        log::info!("loaded {} system distances from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        bincode::serialize_into(BufWriter::new(file), self)
            .with_context(|| format!("writing distance table {}", path.display()))?;
        log::info!("wrote {} system distances to {}", self.len(), path.display());
        Ok(())
    }
}

impl FromIterator<(i64, f64)> for DistanceTable {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self { distances: iter.into_iter().collect() }
    }
}

/// Shell kept by the precompute pass: `min < d <= max`, each side optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistanceBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DistanceBounds {
    pub fn contains(&self, d: f64) -> bool {
        self.max.map_or(true, |max| d <= max) && self.min.map_or(true, |min| d > min)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrecomputeStats {
    pub systems_read: u64,
    pub kept: u64,
    pub malformed: u64,
}

/// Single pass over a systems dump computing each system's distance from the origin.
pub fn compute_distances<R: BufRead>(reader: R, bounds: DistanceBounds) -> Result<(DistanceTable, PrecomputeStats), ScanError> {
    let mut table = DistanceTable::new();
    let mut stats = PrecomputeStats::default();
    let mut decoder = RecordDecoder::new(reader);
    while let Some(next) = decoder.next() {
        let raw = next.map_err(|e| e.into_scan_error(decoder.records_read()))?;
        stats.systems_read += 1;
        let system: StarSystem = match serde_json::from_slice(&raw.bytes) {
            Ok(s) => s,
            Err(source) => {
                stats.malformed += 1;
                log::debug!("{}", DecodeError { index: raw.index, source });
                continue;
            }
        };
        let d = system.coords.norm();
        if bounds.contains(d) {
            table.insert(system.id, d);
            stats.kept += 1;
        }
        if stats.systems_read % 1_000_000 == 0 {
            log::info!("processed {} systems, kept {}", stats.systems_read, stats.kept);
        }
    }
    log::info!(
        "distance precompute done: {} systems read, {} kept, {} malformed",
        stats.systems_read, stats.kept, stats.malformed
    );
    Ok((table, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SYSTEMS: &str = r#"[
        {"id":1,"id64":10,"name":"Sol","coords":{"x":0,"y":0,"z":0},"date":"2015-05-12 15:29:33"},
        {"id":2,"id64":20,"name":"Near","coords":{"x":3,"y":4,"z":0}},
        {"id":3,"id64":30,"name":"Far","coords":{"x":0,"y":0,"z":500}},
        {"id":"broken"}
    ]"#;

    #[test]
    fn bounds_are_half_open() {
        let b = DistanceBounds { min: Some(0.0), max: Some(5.0) };
        assert!(!b.contains(0.0));
        assert!(b.contains(5.0));
        assert!(!b.contains(5.1));
        assert!(DistanceBounds::default().contains(0.0));
    }

    #[test]
    fn computes_and_filters() {
        let bounds = DistanceBounds { min: Some(0.0), max: Some(100.0) };
        let (table, stats) = compute_distances(Cursor::new(SYSTEMS.as_bytes().to_vec()), bounds).unwrap();
        assert_eq!(stats, PrecomputeStats { systems_read: 4, kept: 1, malformed: 1 });
        assert_eq!(table.get(2), Some(5.0));
        assert_eq!(table.get(1), None);
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distances.bin");
        let table: DistanceTable = [(1, 42.0), (7, 0.5)].into_iter().collect();
        table.save(&path).unwrap();
        assert_eq!(DistanceTable::load(&path).unwrap(), table);
    }

    #[test]
    fn truncated_dump_reports_framing() {
        let err = compute_distances(Cursor::new(b"[{\"id\":1},".to_vec()), DistanceBounds::default()).unwrap_err();
        assert!(matches!(err, ScanError::Framing { records_read: 1, .. }));
    }
}
