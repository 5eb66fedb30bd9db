use crate::models::Candidate;
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Read, Write};

/// Whole candidate list as one gzip-compressed JSON array.
pub fn export_to_json(candidates: &[Candidate], path: &str) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path))?;
    let mut enc = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut enc, candidates)?;
    enc.finish()?.flush()?;
    log::info!("wrote {} candidates to {}", candidates.len(), path);
    Ok(())
}

/// Read back a dump written by `export_to_json`, for re-export in another format.
pub fn load_dump(path: &str) -> Result<Vec<Candidate>> {
    let mut data = Vec::new();
    crate::source::open_gz(path)?
        .read_to_end(&mut data)
        .with_context(|| format!("reading {}", path))?;
    let candidates: Vec<Candidate> = serde_json::from_slice(&data).with_context(|| format!("parsing {}", path))?;
    log::info!("loaded {} candidates from dump", candidates.len());
    Ok(candidates)
}
