use std::{
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use futures::{StreamExt, stream};
use mangaha_lib::prelude::*;
use mangaha_source::http::{Client, FetchError};
use tempfile::TempPath;
use thiserror::Error;

pub const DEFAULT_WORKERS: usize = 6;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const FALLBACK_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum DownloadBatchError {
    #[error("page {order_no} ({url}) failed: {source}")]
    Page {
        order_no: i64,
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// A page whose bytes were fetched and read back from scratch.
#[derive(Debug, Clone)]
pub struct DownloadedPage {
    pub order_no: i64,
    pub url: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Fetched bytes parked on disk. The file is removed when this is dropped.
struct ScratchFile {
    page: PageInfo,
    mime_type: String,
    path: TempPath,
}

impl ScratchFile {
    async fn read(self) -> Result<DownloadedPage, DownloadBatchError> {
        let data = tokio::fs::read(&self.path).await?;

        Ok(DownloadedPage {
            order_no: self.page.order_no,
            url: self.page.url,
            mime_type: self.mime_type,
            data,
        })
    }
}

/// Scratch files of one batch, all removed together on drop whatever the
/// outcome of the batch.
#[derive(Default)]
struct ScratchSet {
    files: Vec<ScratchFile>,
}

impl ScratchSet {
    fn push(&mut self, file: ScratchFile) {
        self.files.push(file);
    }

    async fn read_sorted(mut self) -> Result<Vec<DownloadedPage>, DownloadBatchError> {
        self.files.sort_by_key(|file| file.page.order_no);

        let mut pages = Vec::with_capacity(self.files.len());
        for file in std::mem::take(&mut self.files) {
            pages.push(file.read().await?);
        }

        Ok(pages)
    }
}

impl Drop for ScratchSet {
    fn drop(&mut self) {
        if !self.files.is_empty() {
            debug!("removing {} scratch files", self.files.len());
        }
    }
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    scratch_dir: PathBuf,
    workers: usize,
    timeout: Duration,
}

impl Downloader {
    pub fn new<P: AsRef<Path>>(client: Client, scratch_dir: P) -> Self {
        Self {
            client,
            scratch_dir: PathBuf::new().join(scratch_dir),
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_workers(self, workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..self
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    async fn fetch_to_scratch(&self, page: &PageInfo) -> Result<ScratchFile, DownloadBatchError> {
        let (bytes, content_type) = self
            .client
            .fetch_with_content_type(&page.url, &[], self.timeout)
            .await
            .map_err(|source| DownloadBatchError::Page {
                order_no: page.order_no,
                url: page.url.clone(),
                source,
            })?;

        let extension = get_extension(&page.url);
        let suffix = if extension.is_empty() {
            ".img".to_string()
        } else {
            format!(".{extension}")
        };

        // Written through the open handle with no await in between, so a
        // dropped transfer never leaves a file behind.
        let mut file = tempfile::Builder::new()
            .prefix("mangaha-")
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)?;
        file.write_all(&bytes)?;
        let path = file.into_temp_path();
        debug!(
            "page {} ({} bytes) -> {}",
            page.order_no,
            bytes.len(),
            path.display()
        );

        Ok(ScratchFile {
            page: page.clone(),
            mime_type: mime_type_of(&page.url, content_type.as_deref()),
            path,
        })
    }

    /// Fetch every page, at most `workers` at a time. The first failure
    /// aborts the batch and transfers still in flight are dropped. Pages are
    /// returned ordered by `order_no`.
    pub async fn download_all(
        &self,
        pages: &[PageInfo],
    ) -> Result<Vec<DownloadedPage>, DownloadBatchError> {
        let mut scratch = ScratchSet::default();

        let mut transfers = stream::iter(pages.iter().cloned())
            .map(|page| async move { self.fetch_to_scratch(&page).await })
            .buffer_unordered(self.workers);

        while let Some(result) = transfers.next().await {
            scratch.push(result?);
        }

        scratch.read_sorted().await
    }

    /// Like [`Downloader::download_all`] but a failing page does not stop the
    /// others. Results are ordered by `order_no`.
    pub async fn download_each(
        &self,
        pages: &[PageInfo],
    ) -> Vec<(PageInfo, Result<DownloadedPage, DownloadBatchError>)> {
        let mut results: Vec<_> = stream::iter(pages.iter().cloned())
            .map(|page| async move {
                let result = match self.fetch_to_scratch(&page).await {
                    Ok(file) => file.read().await,
                    Err(e) => Err(e),
                };
                (page, result)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        results.sort_by_key(|(page, _)| page.order_no);

        results
    }
}

/// Media type from the response header when it names an image, else guessed
/// from the url, else jpeg.
pub fn mime_type_of(url: &str, content_type: Option<&str>) -> String {
    let header = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value.starts_with("image/"));
    if let Some(mime_type) = header {
        return mime_type;
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
}
