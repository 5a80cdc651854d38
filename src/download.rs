//! Downloads remote grid files into the on-disk cache.
//!
//! The cache is content addressed by file name: a file that already exists is
//! trusted unless the source asks for a refresh. Partially written files never
//! carry the final name.

use std::{
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use futures::{stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    cli::create_progress_bar,
    error::{Error, Result},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How a remote payload is compressed.
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bzip2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Whether files already in the cache are reused.
pub enum CachePolicy {
    #[default]
    Trust,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A remote file and where its decompressed payload lands.
pub struct FileRequest {
    pub url: String,
    pub dest: PathBuf,
    pub compression: Compression,
}

/// Retrieves one remote file into the cache.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FileRequest) -> Result<()>;
}

/// Fetches over HTTP(S).
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| Error::Download {
                url: String::new(),
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FileRequest) -> Result<()> {
        let failed = |reason: String| Error::Download {
            url: request.url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let mut payload = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| failed(format!("error reading chunk: {e}")))?;
            payload.extend_from_slice(&chunk);
        }

        let data = decompress(&payload, request.compression)
            .map_err(|e| failed(format!("cannot decompress payload: {e}")))?;
        write_file(&request.dest, &data).await
    }
}

/// Decompresses a payload held in memory.
pub fn decompress(payload: &[u8], compression: Compression) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    match compression {
        Compression::None => data.extend_from_slice(payload),
        Compression::Gzip => {
            GzDecoder::new(payload).read_to_end(&mut data)?;
        }
        Compression::Bzip2 => {
            BzDecoder::new(payload).read_to_end(&mut data)?;
        }
    }
    Ok(data)
}

/// Writes `data` next to `dest` and renames it into place.
pub async fn write_file(dest: &Path, data: &[u8]) -> Result<()> {
    let mut partial = dest.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, data).await?;
    tokio::fs::rename(&partial, dest).await?;

    Ok(())
}

#[derive(Debug, Default)]
/// Outcome of a download batch.
pub struct BatchReport {
    pub fetched: usize,
    pub cached: usize,
    pub failed: Vec<(FileRequest, Error)>,
}

impl BatchReport {
    pub fn has_failed(&self, dest: &Path) -> bool {
        self.failed.iter().any(|(r, _)| r.dest == dest)
    }
}

enum Outcome {
    Fetched,
    Cached,
}

/// Downloads every request, at most `parallelism` at a time, in no particular
/// order. Requests sharing a destination are fetched once. Failures are logged
/// and reported, never propagated.
pub async fn download_batch(
    fetcher: Arc<dyn Fetcher>,
    requests: &[FileRequest],
    parallelism: usize,
    policy: CachePolicy,
) -> BatchReport {
    let mut unique: Vec<FileRequest> = Vec::with_capacity(requests.len());
    for request in requests {
        if !unique.iter().any(|r| r.dest == request.dest) {
            unique.push(request.clone());
        }
    }

    let progress = create_progress_bar(unique.len() as u64, "Downloading forecast files".to_string());

    let outcomes: Vec<(FileRequest, Result<Outcome>)> = stream::iter(unique)
        .map(|request| {
            let fetcher = Arc::clone(&fetcher);
            let progress = progress.clone();
            async move {
                let outcome = if policy == CachePolicy::Trust && request.dest.exists() {
                    debug!(file = %request.dest.display(), "Using cached file");
                    Ok(Outcome::Cached)
                } else {
                    fetcher.fetch(&request).await.map(|_| Outcome::Fetched)
                };
                progress.inc(1);
                (request, outcome)
            }
        })
        .buffer_unordered(parallelism.max(1))
        .collect()
        .await;

    let mut report = BatchReport::default();
    for (request, outcome) in outcomes {
        match outcome {
            Ok(Outcome::Fetched) => {
                debug!(file = %request.dest.display(), "Downloaded");
                report.fetched += 1;
            }
            Ok(Outcome::Cached) => report.cached += 1,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Skipping file that failed to download");
                report.failed.push((request, e));
            }
        }
    }

    progress.finish_with_message(format!(
        "{} downloaded, {} cached, {} failed",
        report.fetched,
        report.cached,
        report.failed.len()
    ));
    info!(
        fetched = report.fetched,
        cached = report.cached,
        failed = report.failed.len(),
        "Download batch finished"
    );

    report
}

// -- Tests -------------------------------------------------------------------
