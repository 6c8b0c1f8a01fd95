use std::{collections::BTreeSet, time::Duration};

use bytes::Bytes;
use futures::{StreamExt, stream};
use mangaha_lib::prelude::*;

use crate::{
    extract,
    http::{Client, DEFAULT_TIMEOUT, FetchError},
};

pub const DEFAULT_BASE_URL: &str = "https://azoramoon.com";
pub const MAX_RESULTS_PER_PAGE: usize = 12;
pub const DEFAULT_SERIES_WORKERS: usize = 5;
const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// A wp-manga site such as azoramoon.
#[derive(Debug, Clone)]
pub struct Azoramoon {
    base_url: String,
    client: Client,
    timeout: Duration,
    image_timeout: Duration,
    series_workers: usize,
}

impl Azoramoon {
    pub fn new(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout: DEFAULT_TIMEOUT,
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            series_workers: DEFAULT_SERIES_WORKERS,
        }
    }

    pub fn with_timeout(self, timeout: Duration, image_timeout: Duration) -> Self {
        Self {
            timeout,
            image_timeout,
            ..self
        }
    }

    pub fn with_series_workers(self, series_workers: usize) -> Self {
        Self {
            series_workers: series_workers.max(1),
            ..self
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn series_page_url(&self, page: usize) -> String {
        self.url(&format!("series/page/{page}/"))
    }

    /// Search titles, following pagination until every announced hit is fetched.
    pub async fn search(&self, term: &str) -> Result<Vec<SearchResult>, FetchError> {
        let params = [("s", term), ("post_type", "wp-manga")];

        let html = self.client.fetch(&self.url("/"), &params, self.timeout).await?;
        let count = extract::extract_result_count(&html);
        let pages = count / MAX_RESULTS_PER_PAGE + 1;
        debug!("search \"{term}\" has {count} results in {pages} pages");

        let mut results = extract::extract_search_results(&html);
        for page in 2..=pages {
            let html = self
                .client
                .fetch(&self.url(&format!("page/{page}/")), &params, self.timeout)
                .await?;
            results.extend(extract::extract_search_results(&html));
        }

        Ok(results)
    }

    pub async fn get_manga_detail(&self, url: &str) -> Result<MangaInfo, FetchError> {
        let html = self.client.fetch(url, &[], self.timeout).await?;

        Ok(extract::extract_manga_details(url, &html))
    }

    pub async fn get_pages(&self, chapter_url: &str) -> Result<Vec<PageInfo>, FetchError> {
        debug!("extracting images for {chapter_url}");
        let html = self.client.fetch(chapter_url, &[], self.timeout).await?;

        Ok(extract::extract_images(&html))
    }

    pub async fn fetch_image(&self, url: &str) -> Result<(Bytes, Option<String>), FetchError> {
        self.client
            .fetch_with_content_type(url, &[], self.image_timeout)
            .await
    }

    pub async fn get_total_series_pages(&self) -> Result<usize, FetchError> {
        let html = self
            .client
            .fetch(&self.series_page_url(1), &[], self.timeout)
            .await?;
        let total = extract::extract_series_count(&html);

        Ok(total / MAX_RESULTS_PER_PAGE + 1)
    }

    pub async fn get_series_links_page(&self, page: usize) -> Result<BTreeSet<String>, FetchError> {
        let html = self
            .client
            .fetch(&self.series_page_url(page), &[], self.timeout)
            .await?;

        Ok(extract::extract_series_links(&html))
    }

    /// Collect series links from pages `1..=pages`, `series_workers` pages at a time.
    /// A page that fails is logged and skipped.
    pub async fn get_series_links(&self, pages: usize) -> BTreeSet<String> {
        stream::iter(1..=pages)
            .map(|page| async move { (page, self.get_series_links_page(page).await) })
            .buffer_unordered(self.series_workers)
            .fold(BTreeSet::new(), |mut links, (page, result)| async move {
                match result {
                    Ok(part) => links.extend(part),
                    Err(e) => error!("error fetching series page {page}: {e}"),
                }
                links
            })
            .await
    }
}
