//! Transport seam for file downloads.

use std::fs::File;
use std::io::Write;

use thiserror::Error;

use super::CancelToken;

/// Why fetching a single file failed.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The download was cancelled by the user.
    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(String),

    #[error("server answered HTTP {0}")]
    Status(u16),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Streams a remote file into a local destination.
///
/// The orchestrator owns destination naming and atomic placement; a
/// fetcher only moves bytes and honors the cancel token mid-stream.
#[allow(async_fn_in_trait)]
pub trait FileFetcher {
    /// Stream `url` into `dest`, returning the byte count written.
    async fn fetch_to(
        &self,
        url: &str,
        dest: &mut File,
        cancel: &CancelToken,
    ) -> Result<u64, FetchFailure>;
}

/// Reqwest-backed fetcher, chunk-streaming so large jars never sit in
/// memory whole.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl FileFetcher for HttpFetcher {
    async fn fetch_to(
        &self,
        url: &str,
        dest: &mut File,
        cancel: &CancelToken,
    ) -> Result<u64, FetchFailure> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchFailure::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let mut written = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Err(FetchFailure::Cancelled);
            }
            let chunk = response
                .chunk()
                .await
                .map_err(|err| FetchFailure::Network(err.to_string()))?;
            let Some(chunk) = chunk else { break };
            dest.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        dest.flush()?;
        Ok(written)
    }
}
