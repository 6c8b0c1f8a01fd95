use anyhow::anyhow;
use mangaha_lib::models::PageInfo;
use mangaha_source::{http::FetchError, source::Azoramoon};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;

use crate::{
    domain::{
        entities::{
            chapter::{Chapter, ChapterStatus},
            image::Image,
        },
        repositories::{
            chapter::{ChapterRepository, ChapterRepositoryError},
            image::{ImageRepository, ImageRepositoryError},
            manga::{MangaRepository, MangaRepositoryError},
        },
    },
    infrastructure::{
        downloader::{DownloadBatchError, Downloader},
        pdf::{PdfError, assemble_pdf},
    },
};

#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("manga not found")]
    MangaNotFound,
    #[error("chapter not found")]
    NotFound,
    #[error("image not found")]
    ImageNotFound,
    #[error("source error: {0}")]
    Source(#[from] FetchError),
    #[error("download error: {0}")]
    Download(#[from] DownloadBatchError),
    #[error("pdf error: {0}")]
    Pdf(#[from] PdfError),
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<MangaRepositoryError> for ChapterError {
    fn from(e: MangaRepositoryError) -> Self {
        match e {
            MangaRepositoryError::NotFound => Self::MangaNotFound,
            MangaRepositoryError::DbError(e) => Self::Other(anyhow!("{e}")),
        }
    }
}

impl From<ChapterRepositoryError> for ChapterError {
    fn from(e: ChapterRepositoryError) -> Self {
        match e {
            ChapterRepositoryError::NotFound => Self::NotFound,
            ChapterRepositoryError::DbError(e) => Self::Other(anyhow!("{e}")),
        }
    }
}

impl From<ImageRepositoryError> for ChapterError {
    fn from(e: ImageRepositoryError) -> Self {
        match e {
            ImageRepositoryError::NotFound => Self::ImageNotFound,
            ImageRepositoryError::DbError(e) => Self::Other(anyhow!("{e}")),
        }
    }
}

impl From<JoinError> for ChapterError {
    fn from(e: JoinError) -> Self {
        Self::Other(anyhow!("{e}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedChapter {
    pub chapter_id: i64,
    pub total_images: i64,
    pub created: bool,
}

/// Last non-empty path segment of a chapter url, `ch-12` for `.../ch-12/`.
fn title_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[derive(Clone)]
pub struct ChapterService<M, C, I>
where
    M: MangaRepository,
    C: ChapterRepository,
    I: ImageRepository,
{
    manga_repo: M,
    chapter_repo: C,
    image_repo: I,
    source: Azoramoon,
    downloader: Downloader,
}

impl<M, C, I> ChapterService<M, C, I>
where
    M: MangaRepository,
    C: ChapterRepository,
    I: ImageRepository,
{
    pub fn new(
        manga_repo: M,
        chapter_repo: C,
        image_repo: I,
        source: Azoramoon,
        downloader: Downloader,
    ) -> Self {
        Self {
            manga_repo,
            chapter_repo,
            image_repo,
            source,
            downloader,
        }
    }

    /// Store the chapter at `url` under `manga_id` with its page list. An
    /// already stored chapter is returned as is, its page list is scraped only
    /// when it has none yet.
    pub async fn save_chapter(&self, manga_id: i64, url: &str) -> Result<SavedChapter, ChapterError> {
        self.manga_repo.get_manga_by_id(manga_id).await?;

        if let Some(chapter) = self.chapter_repo.get_chapter_by_url(url).await? {
            if chapter.manga_id != manga_id {
                warn!(
                    "chapter {url} is already stored under manga {}, not {manga_id}",
                    chapter.manga_id
                );
            }

            let (mut total_images, _) = self.image_repo.get_image_counts(chapter.id).await?;
            if total_images == 0 {
                total_images = self.scrape_pages(&chapter).await?.len() as i64;
            }

            return Ok(SavedChapter {
                chapter_id: chapter.id,
                total_images,
                created: false,
            });
        }

        let pages = self.source.get_pages(url).await?;

        let mut chapter = Chapter {
            id: 0,
            manga_id,
            url: url.to_string(),
            title: title_from_url(url),
            order_no: self.chapter_repo.get_next_order_no(manga_id).await?,
            date_added: chrono::Utc::now().naive_utc(),
        };
        self.chapter_repo.insert_chapter(&mut chapter).await?;
        self.image_repo.insert_images(chapter.id, &pages).await?;

        info!(
            "saved chapter \"{}\" ({}) with {} images",
            chapter.title,
            chapter.id,
            pages.len()
        );

        Ok(SavedChapter {
            chapter_id: chapter.id,
            total_images: pages.len() as i64,
            created: true,
        })
    }

    async fn scrape_pages(&self, chapter: &Chapter) -> Result<Vec<PageInfo>, ChapterError> {
        let pages = self.source.get_pages(&chapter.url).await?;
        self.image_repo.insert_images(chapter.id, &pages).await?;

        Ok(pages)
    }

    /// Pages still to be fetched, scraping the page list first if the chapter
    /// never had one.
    async fn pending_pages(&self, chapter: &Chapter) -> Result<Vec<PageInfo>, ChapterError> {
        let images = self.image_repo.get_images_by_chapter_id(chapter.id).await?;
        if images.is_empty() {
            return self.scrape_pages(chapter).await;
        }

        Ok(images
            .iter()
            .filter(|image| !image.is_downloaded)
            .map(|image| image.page())
            .collect())
    }

    pub async fn get_chapter(&self, id: i64) -> Result<Chapter, ChapterError> {
        Ok(self.chapter_repo.get_chapter_by_id(id).await?)
    }

    pub async fn get_image(&self, chapter_id: i64, order_no: i64) -> Result<Image, ChapterError> {
        Ok(self.image_repo.get_image(chapter_id, order_no).await?)
    }

    pub async fn chapter_status(&self, chapter_id: i64) -> Result<ChapterStatus, ChapterError> {
        let chapter = self.chapter_repo.get_chapter_by_id(chapter_id).await?;
        let (total, downloaded) = self.image_repo.get_image_counts(chapter_id).await?;

        Ok(ChapterStatus::new(chapter.id, chapter.title, total, downloaded))
    }

    /// Store the bytes of one page. Calling it again overwrites.
    pub async fn mark_downloaded(
        &self,
        chapter_id: i64,
        order_no: i64,
        data: &[u8],
        mime_type: &str,
    ) -> Result<(), ChapterError> {
        self.image_repo
            .mark_downloaded(chapter_id, order_no, data, mime_type)
            .await?;

        Ok(())
    }

    /// One download pass over the pending pages of a chapter. Pages that fail
    /// stay pending for the next pass.
    pub async fn reconcile(&self, chapter_id: i64) -> Result<ChapterStatus, ChapterError> {
        let chapter = self.chapter_repo.get_chapter_by_id(chapter_id).await?;
        let pending = self.pending_pages(&chapter).await?;
        debug!("chapter {chapter_id} has {} pending images", pending.len());

        for (page, result) in self.downloader.download_each(&pending).await {
            match result {
                Ok(downloaded) => {
                    self.mark_downloaded(
                        chapter_id,
                        downloaded.order_no,
                        &downloaded.data,
                        &downloaded.mime_type,
                    )
                    .await?
                }
                Err(e) => error!("chapter {chapter_id} image {} not downloaded: {e}", page.order_no),
            }
        }

        self.chapter_status(chapter_id).await
    }

    /// Download whatever is missing and assemble the chapter into a pdf. Any
    /// page that cannot be fetched fails the whole call.
    pub async fn chapter_pdf(&self, chapter_id: i64) -> Result<(Chapter, Vec<u8>), ChapterError> {
        let chapter = self.chapter_repo.get_chapter_by_id(chapter_id).await?;

        let pending = self.pending_pages(&chapter).await?;
        for page in self.downloader.download_all(&pending).await? {
            self.mark_downloaded(chapter_id, page.order_no, &page.data, &page.mime_type)
                .await?;
        }

        let images: Vec<_> = self
            .image_repo
            .get_image_data_by_chapter_id(chapter_id)
            .await?
            .into_iter()
            .map(|(_, image)| image.data)
            .collect();

        let pdf = tokio::task::spawn_blocking(move || assemble_pdf(&images)).await??;
        info!(
            "built pdf for chapter \"{}\" ({} bytes)",
            chapter.title,
            pdf.len()
        );

        Ok((chapter, pdf))
    }
}

#[cfg(test)]
mod test {
    use std::{io::Cursor, time::Duration};

    use super::*;
    use crate::{
        domain::entities::manga::Manga,
        infrastructure::{
            database::establish_in_memory,
            domain::repositories::{
                chapter::ChapterRepositoryImpl, image::ImageRepositoryImpl,
                manga::MangaRepositoryImpl,
            },
        },
    };
    use mangaha_source::http::{Client, RetryPolicy};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    type Service = ChapterService<MangaRepositoryImpl, ChapterRepositoryImpl, ImageRepositoryImpl>;

    struct Fixture {
        server: MockServer,
        svc: Service,
        manga_id: i64,
        _scratch: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let server = MockServer::start().await;
        let pool = establish_in_memory().await.unwrap();
        let client = Client::new(RetryPolicy::new(0, Duration::from_millis(1))).unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let manga_repo = MangaRepositoryImpl::new(pool.clone());
        let mut manga = Manga {
            url: format!("{}/m/", server.uri()),
            title: "M".to_string(),
            ..Default::default()
        };
        manga_repo.insert_manga(&mut manga).await.unwrap();

        let svc = ChapterService::new(
            manga_repo,
            ChapterRepositoryImpl::new(pool.clone()),
            ImageRepositoryImpl::new(pool),
            Azoramoon::new(&server.uri(), client.clone()),
            Downloader::new(client, scratch.path()).with_workers(2),
        );

        Fixture {
            server,
            svc,
            manga_id: manga.id,
            _scratch: scratch,
        }
    }

    fn jpeg() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(3, 5));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    async fn mount_chapter(server: &MockServer, names: &[&str]) -> String {
        let body: String = names
            .iter()
            .map(|name| {
                format!(
                    r#"<img class="wp-manga-chapter-img" src="{}/img/{name}">"#,
                    server.uri()
                )
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/m/ch-1/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;

        format!("{}/m/ch-1/", server.uri())
    }

    async fn mount_image(server: &MockServer, name: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/img/{name}")))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn jpeg_response() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "image/jpeg")
            .set_body_bytes(jpeg())
    }

    #[test]
    fn test_title_from_url() {
        assert_eq!(title_from_url("https://site.test/m/ch-12/"), "ch-12");
        assert_eq!(title_from_url("https://site.test/m/ch-12?style=list"), "ch-12");
    }

    #[tokio::test]
    async fn test_download_and_assemble_chapter() {
        let f = fixture().await;
        let url = mount_chapter(&f.server, &["a.jpg", "b.jpg", "c.jpg"]).await;
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            mount_image(&f.server, name, jpeg_response()).await;
        }

        let saved = f.svc.save_chapter(f.manga_id, &url).await.unwrap();
        assert!(saved.created);
        assert_eq!(saved.total_images, 3);

        let status = f.svc.chapter_status(saved.chapter_id).await.unwrap();
        assert_eq!((status.total, status.downloaded), (3, 0));
        assert_eq!(status.progress, 0.0);

        let (chapter, pdf) = f.svc.chapter_pdf(saved.chapter_id).await.unwrap();
        assert_eq!(chapter.title, "ch-1");
        assert_eq!(lopdf::Document::load_mem(&pdf).unwrap().get_pages().len(), 3);

        let status = f.svc.chapter_status(saved.chapter_id).await.unwrap();
        assert_eq!(status.total, 3);
        assert_eq!(status.downloaded, 3);
        assert!(status.complete);
        assert_eq!(status.progress, 100.0);
    }

    #[tokio::test]
    async fn test_save_chapter_twice() {
        let f = fixture().await;
        let url = mount_chapter(&f.server, &["a.jpg"]).await;

        let first = f.svc.save_chapter(f.manga_id, &url).await.unwrap();
        let second = f.svc.save_chapter(f.manga_id, &url).await.unwrap();

        assert_eq!(first.chapter_id, second.chapter_id);
        assert!(!second.created);
        assert_eq!(second.total_images, 1);
        assert_eq!(f.svc.get_chapter(first.chapter_id).await.unwrap().order_no, 0);
    }

    #[tokio::test]
    async fn test_save_chapter_keeps_original_manga() {
        let f = fixture().await;
        let url = mount_chapter(&f.server, &["a.jpg"]).await;
        let mut other = Manga {
            url: format!("{}/other/", f.server.uri()),
            title: "Other".to_string(),
            ..Default::default()
        };
        f.svc.manga_repo.insert_manga(&mut other).await.unwrap();

        let first = f.svc.save_chapter(f.manga_id, &url).await.unwrap();
        let second = f.svc.save_chapter(other.id, &url).await.unwrap();

        assert_eq!(first.chapter_id, second.chapter_id);
        assert!(!second.created);
        let chapter = f.svc.get_chapter(second.chapter_id).await.unwrap();
        assert_eq!(chapter.manga_id, f.manga_id);
    }

    #[tokio::test]
    async fn test_save_chapter_for_missing_manga() {
        let f = fixture().await;

        assert!(matches!(
            f.svc.save_chapter(f.manga_id + 1, "https://site.test/x/").await,
            Err(ChapterError::MangaNotFound)
        ));
    }

    #[tokio::test]
    async fn test_reconcile_leaves_failures_pending() {
        let f = fixture().await;
        let url = mount_chapter(&f.server, &["a.jpg", "b.jpg"]).await;
        mount_image(&f.server, "a.jpg", jpeg_response()).await;
        mount_image(&f.server, "b.jpg", ResponseTemplate::new(404)).await;

        let saved = f.svc.save_chapter(f.manga_id, &url).await.unwrap();
        let status = f.svc.reconcile(saved.chapter_id).await.unwrap();

        assert_eq!(status.downloaded, 1);
        assert!(!status.complete);
        assert_eq!(status.progress, 50.0);
        assert!(f.svc.get_image(saved.chapter_id, 0).await.is_ok());
        assert!(matches!(
            f.svc.get_image(saved.chapter_id, 1).await,
            Err(ChapterError::ImageNotFound)
        ));

        assert!(matches!(
            f.svc.chapter_pdf(saved.chapter_id).await,
            Err(ChapterError::Download(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_downloaded_twice() {
        let f = fixture().await;
        let url = mount_chapter(&f.server, &["a.jpg", "b.jpg"]).await;
        let saved = f.svc.save_chapter(f.manga_id, &url).await.unwrap();

        for _ in 0..2 {
            f.svc
                .mark_downloaded(saved.chapter_id, 1, b"bytes", "image/png")
                .await
                .unwrap();
        }

        let status = f.svc.chapter_status(saved.chapter_id).await.unwrap();
        assert_eq!((status.total, status.downloaded), (2, 1));
        let image = f.svc.get_image(saved.chapter_id, 1).await.unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(&image.data[..], b"bytes");
    }
}
