//! Remote table retrieval.
//!
//! A [`TableFetcher`] turns a [`SourceRef`] into raw rows. The HTTP
//! implementation reads CSV (a Google Sheets export or any CSV URL) and picks
//! the two configured columns by header name.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use lexis_core::error::{LexisError, Result};
use lexis_core::normalize::normalize;
use lexis_core::types::{RawRow, SourceRef};

/// Source of raw table rows. Implementations perform one read per call and
/// never retry.
#[async_trait]
pub trait TableFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceRef) -> Result<Vec<RawRow>>;
}

// =============================================================================
// HttpTableFetcher
// =============================================================================

/// Fetches CSV over HTTP(S) with a whole-request deadline.
#[derive(Debug, Clone)]
pub struct HttpTableFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTableFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lexis/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LexisError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    fn unavailable(&self, url: &str, err: reqwest::Error) -> LexisError {
        if err.is_timeout() {
            LexisError::SourceUnavailable(format!(
                "{} did not answer within {:?}",
                url, self.timeout
            ))
        } else {
            LexisError::SourceUnavailable(format!("{}: {}", url, err))
        }
    }
}

#[async_trait]
impl TableFetcher for HttpTableFetcher {
    async fn fetch(&self, source: &SourceRef) -> Result<Vec<RawRow>> {
        debug!(url = %source.url, "Fetching table");

        let resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| self.unavailable(&source.url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LexisError::SourceUnavailable(format!(
                "{} answered HTTP {}",
                source.url, status
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| self.unavailable(&source.url, e))?;

        debug!(url = %source.url, bytes = body.len(), "Table body received");
        parse_csv(&body, &source.key_column, &source.value_column)
    }
}

// =============================================================================
// CSV parsing
// =============================================================================

/// Extract the key and value columns from a CSV body with a header row.
///
/// Headers match after normalization, ignoring ASCII case. Short rows yield
/// empty fields; rows that are not valid UTF-8 are skipped. A missing header
/// fails the whole parse.
pub fn parse_csv(body: &[u8], key_column: &str, value_column: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(body);

    let headers = reader
        .headers()
        .map_err(|e| LexisError::MalformedSource(format!("unreadable header row: {}", e)))?
        .clone();

    let key_idx = find_column(&headers, key_column)?;
    let value_idx = find_column(&headers, value_column)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                // Header is row 1.
                warn!(row = idx + 2, error = %e, "Skipping unreadable row");
                skipped += 1;
                continue;
            }
        };
        rows.push(RawRow::new(
            record.get(key_idx).unwrap_or_default(),
            record.get(value_idx).unwrap_or_default(),
        ));
    }

    debug!(rows = rows.len(), skipped, "CSV parsed");
    Ok(rows)
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    let wanted = normalize(name);
    headers
        .iter()
        .position(|h| normalize(h).eq_ignore_ascii_case(&wanted))
        .ok_or_else(|| {
            LexisError::MalformedSource(format!(
                "required column '{}' not found (headers: {})",
                name,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })
}
