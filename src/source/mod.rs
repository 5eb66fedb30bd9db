pub mod decoder;

pub use decoder::{RawRecord, RecordDecoder};

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read buffer in front of the gzip stream. Dumps are tens of GB uncompressed.
pub const READ_BUFFER_BYTES: usize = 1 << 20;

pub type GzReader<R> = BufReader<MultiGzDecoder<R>>;

pub fn gz_reader<R: Read>(inner: R) -> GzReader<R> {
    BufReader::with_capacity(READ_BUFFER_BYTES, MultiGzDecoder::new(inner))
}

/// Open a gzip-compressed dump for streaming.
pub fn open_gz(path: impl AsRef<Path>) -> Result<GzReader<File>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    log::info!("opened {}", path.display());
    Ok(gz_reader(file))
}
