use crate::error::ConfigError;
use crate::filter::FilterCriteria;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub workers: usize,
    /// Capacity of the dispatch queue between the reader and the workers.
    pub queue_capacity: usize,
    /// Capacity of the candidate and category channels.
    pub result_capacity: usize,
    /// Raw records to read before stopping; 0 reads everything.
    pub limit: u64,
    pub update_every: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { workers: 3, queue_capacity: 100_000, result_capacity: 100_000, limit: 0, update_every: 100_000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    /// Index each candidate into Elasticsearch instead of writing a file.
    Es,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Es => "es",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const DEFAULT_ES_URL: &str = "http://localhost:9200";
pub const DEFAULT_ES_INDEX: &str = "candidates";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output file; unused for `es`.
    pub out_path: Option<String>,
    pub format: Option<OutputFormat>,
    pub es_url: String,
    pub es_index: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { out_path: None, format: None, es_url: DEFAULT_ES_URL.into(), es_index: DEFAULT_ES_INDEX.into() }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.format {
            None => Err(ConfigError::Missing("export.format")),
            Some(OutputFormat::Es) => {
                if self.es_url.trim().is_empty() {
                    return Err(ConfigError::Missing("export.es_url"));
                }
                if self.es_index.trim().is_empty() {
                    return Err(ConfigError::Missing("export.es_index"));
                }
                Ok(())
            }
            Some(_) => match &self.out_path {
                Some(p) if !p.trim().is_empty() => Ok(()),
                _ => Err(ConfigError::Missing("export.out_path")),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub criteria: FilterCriteria,
    pub export: ExportConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        self.criteria.validate()?;
        self.export.validate()
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 || self.workers > 256 {
            return Err(ConfigError::OutOfRange { field: "scan.workers", detail: format!("{} (expected 1..=256)", self.workers) });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::OutOfRange { field: "scan.queue_capacity", detail: "must be positive".into() });
        }
        if self.result_capacity == 0 {
            return Err(ConfigError::OutOfRange { field: "scan.result_capacity", detail: "must be positive".into() });
        }
        Ok(())
    }
}
