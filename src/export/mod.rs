pub mod csv_export;
pub mod es_export;
pub mod json_export;

use crate::config::{ExportConfig, OutputFormat};
use crate::models::Candidate;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

fn ensure_parent_dir(path: &str) -> Result<()> {
    let p = Path::new(path);
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write the final candidate list to the configured sink.
pub fn write_candidates(candidates: &[Candidate], export: &ExportConfig) -> Result<()> {
    match export.format.context("no output format configured")? {
        OutputFormat::Csv => csv_export::export_to_csv(candidates, prepared_path(export)?),
        OutputFormat::Json => json_export::export_to_json(candidates, prepared_path(export)?),
        OutputFormat::Es => es_export::export_to_es(candidates, &export.es_url, &export.es_index).map(|_| ()),
    }
}

fn prepared_path(export: &ExportConfig) -> Result<&str> {
    let path = export.out_path.as_deref().context("no output path configured")?;
    ensure_parent_dir(path)?;
    Ok(path)
}
