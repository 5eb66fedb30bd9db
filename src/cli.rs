use crate::config::{AppConfig, ExportConfig, OutputFormat, ScanConfig, DEFAULT_ES_INDEX, DEFAULT_ES_URL};
use crate::distances::DistanceBounds;
use crate::error::ConfigError;
use crate::filter::FilterCriteria;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, ValueEnum, Debug)]
pub enum FormatOpt { Csv, Json, Es }

impl From<FormatOpt> for OutputFormat {
    fn from(f: FormatOpt) -> Self {
        match f {
            FormatOpt::Csv => OutputFormat::Csv,
            FormatOpt::Json => OutputFormat::Json,
            FormatOpt::Es => OutputFormat::Es,
        }
    }
}

impl std::fmt::Display for FormatOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", OutputFormat::from(*self).as_str())
    }
}

#[derive(Parser, Debug)]
#[command(name = "shard_finder", version, about = "Find crystalline shard candidates in EDSM dumps", disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pre-compute system distances from Sol into a table file
    ComputeDistances(DistanceArgs),
    /// Scan a bodies dump for candidates orbiting gas giants
    FilterBodies(FilterArgs),
    /// Convert a previous JSON candidates dump to another format
    Reexport(ReexportArgs),
}

#[derive(Args, Debug)]
pub struct DistanceArgs {
    /// Gzipped EDSM systems-with-coordinates dump
    #[arg(short = 's', long = "systems-file", env = "SHARD_FINDER_SYSTEMS_FILE")]
    pub systems_file: PathBuf,
    /// Distance table to write
    #[arg(short = 'g', long = "table", env = "SHARD_FINDER_TABLE")]
    pub table: PathBuf,
    /// Keep systems strictly farther than this (ly)
    #[arg(long = "min-distance")]
    pub min_distance: Option<f64>,
    /// Keep systems at most this far (ly)
    #[arg(long = "max-distance")]
    pub max_distance: Option<f64>,
}

impl DistanceArgs {
    pub fn bounds(&self) -> Result<DistanceBounds, ConfigError> {
        if let (Some(min), Some(max)) = (self.min_distance, self.max_distance) {
            if min >= max {
                return Err(ConfigError::OutOfRange { field: "min-distance", detail: format!("{} is not below max-distance {}", min, max) });
            }
        }
        Ok(DistanceBounds { min: self.min_distance, max: self.max_distance })
    }
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Gzipped EDSM bodies dump
    #[arg(short = 'b', long = "bodies-file", env = "SHARD_FINDER_BODIES_FILE")]
    pub bodies_file: PathBuf,
    /// Distance table written by compute-distances
    #[arg(short = 'g', long = "table", env = "SHARD_FINDER_TABLE")]
    pub table: PathBuf,
    #[command(flatten)]
    pub sink: SinkArgs,
    /// Stop after this many bodies (0 = whole dump)
    #[arg(short = 'l', long = "limit", default_value_t = 0)]
    pub limit: u64,
    /// Filter worker threads
    #[arg(short = 'w', long = "workers", env = "SHARD_FINDER_WORKERS", default_value_t = 3)]
    pub workers: usize,
    /// Bodies buffered between the reader and the workers
    #[arg(long = "queue-capacity", env = "SHARD_FINDER_QUEUE_CAPACITY", default_value_t = 100_000)]
    pub queue_capacity: usize,
    /// JSON file overriding the default filter criteria
    #[arg(long = "criteria", env = "SHARD_FINDER_CRITERIA")]
    pub criteria: Option<PathBuf>,
}

impl FilterArgs {
    pub fn to_app_config(&self) -> Result<AppConfig, ConfigError> {
        let criteria = match &self.criteria {
            Some(path) => load_criteria(path)?,
            None => FilterCriteria::default(),
        };
        let cfg = AppConfig {
            scan: ScanConfig { workers: self.workers, queue_capacity: self.queue_capacity, limit: self.limit, ..ScanConfig::default() },
            criteria,
            export: self.sink.to_export_config(),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Where the final candidate list goes.
#[derive(Args, Debug)]
pub struct SinkArgs {
    /// Output path (csv and json)
    #[arg(short = 'o', long = "output", env = "SHARD_FINDER_OUTPUT")]
    pub output: Option<String>,
    #[arg(short = 'f', long = "format", default_value_t = FormatOpt::Csv)]
    pub format: FormatOpt,
    /// Elasticsearch base URL (es)
    #[arg(long = "es-url", env = "SHARD_FINDER_ES_URL", default_value = DEFAULT_ES_URL)]
    pub es_url: String,
    #[arg(long = "es-index", env = "SHARD_FINDER_ES_INDEX", default_value = DEFAULT_ES_INDEX)]
    pub es_index: String,
}

impl SinkArgs {
    pub fn to_export_config(&self) -> ExportConfig {
        ExportConfig {
            out_path: self.output.clone(),
            format: Some(self.format.into()),
            es_url: self.es_url.clone(),
            es_index: self.es_index.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ReexportArgs {
    /// Gzipped JSON dump written by filter-bodies
    #[arg(short = 'r', long = "dump")]
    pub dump: String,
    #[command(flatten)]
    pub sink: SinkArgs,
}

impl ReexportArgs {
    pub fn to_export_config(&self) -> Result<ExportConfig, ConfigError> {
        let export = self.sink.to_export_config();
        export.validate()?;
        Ok(export)
    }
}

fn load_criteria(path: &Path) -> Result<FilterCriteria, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid { field: "criteria", detail: format!("{}: {}", path.display(), e) })?;
    serde_json::from_str(&raw)
        .map_err(|e| ConfigError::Invalid { field: "criteria", detail: format!("{}: {}", path.display(), e) })
}
