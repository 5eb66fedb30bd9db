use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    Missing(&'static str),
    #[error("value out of range for {field}: {detail}")]
    OutOfRange { field: &'static str, detail: String },
    #[error("invalid value for {field}: {detail}")]
    Invalid { field: &'static str, detail: String },
}

/// Failures that abort a whole scan. Per-record problems are `DecodeError`s
/// and never end up here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("framing error at byte {offset}: {reason} ({records_read} records read)")]
    Framing { offset: u64, reason: String, records_read: u64 },
    #[error("read failed after {records_read} records: {source}")]
    Io {
        records_read: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("scan cancelled after {records_read} records")]
    Cancelled { records_read: u64 },
    #[error("pipeline thread panicked: {0}")]
    WorkerPanicked(String),
    #[error("failed to start pipeline thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Structural problem in the array framing, before the record count is known.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("framing error at byte {offset}: {reason}")]
    Malformed { offset: u64, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FramingError {
    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Self::Malformed { offset, reason: reason.into() }
    }

    pub fn into_scan_error(self, records_read: u64) -> ScanError {
        match self {
            Self::Malformed { offset, reason } => ScanError::Framing { offset, reason, records_read },
            Self::Io(source) => ScanError::Io { records_read, source },
        }
    }
}

/// A single payload that could not be parsed into a record.
#[derive(Debug, Error)]
#[error("record #{index} could not be decoded: {source}")]
pub struct DecodeError {
    pub index: u64,
    #[source]
    pub source: serde_json::Error,
}
