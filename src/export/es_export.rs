use crate::models::Candidate;
use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use std::time::Duration;

/// Outcome of one indexing run. Rejected documents are logged, not fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub indexed: usize,
    pub rejected: usize,
}

/// Writes candidates into an Elasticsearch index, one document per candidate.
pub struct EsSink {
    client: HttpClient,
    base_url: String,
    index: String,
}

impl EsSink {
    pub fn new(base_url: &str, index: &str) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building Elasticsearch HTTP client")?;
        Ok(Self::with_client(client, base_url, index))
    }

    pub fn with_client(client: HttpClient, base_url: &str, index: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string(), index: index.to_string() }
    }

    /// Document ids follow the final candidate order, starting at 1.
    pub fn document_url(&self, position: usize) -> String {
        format!("{}/{}/_doc/{}?refresh=true", self.base_url, self.index, position + 1)
    }

    /// A transport failure aborts the run; a non-2xx answer only skips that document.
    pub fn index_all(&self, candidates: &[Candidate]) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        for (i, candidate) in candidates.iter().enumerate() {
            let url = self.document_url(i);
            let response = self
                .client
                .put(&url)
                .json(candidate)
                .send()
                .with_context(|| format!("indexing document id={} at {}", i + 1, url))?;
            let status = response.status();
            if status.is_success() {
                report.indexed += 1;
            } else {
                log::warn!("[{}] error indexing document id={}", status, i + 1);
                report.rejected += 1;
            }
        }
        log::info!(
            "indexed {} candidates into {}/{} ({} rejected)",
            report.indexed, self.base_url, self.index, report.rejected
        );
        Ok(report)
    }
}

pub fn export_to_es(candidates: &[Candidate], base_url: &str, index: &str) -> Result<IndexReport> {
    EsSink::new(base_url, index)?.index_all(candidates)
}
