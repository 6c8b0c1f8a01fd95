use anyhow::anyhow;
use mangaha_lib::models::{MangaInfo, PageInfo, SearchResult};
use mangaha_source::{http::FetchError, source::Azoramoon};
use thiserror::Error;

use crate::{
    domain::{
        entities::{
            chapter::Chapter,
            image::Image,
            manga::{Manga, MangaSummary},
        },
        repositories::{
            chapter::{ChapterRepository, ChapterRepositoryError},
            manga::{MangaRepository, MangaRepositoryError},
        },
    },
    infrastructure::downloader::mime_type_of,
};

#[derive(Debug, Error)]
pub enum MangaError {
    #[error("manga not found")]
    NotFound,
    #[error("source error: {0}")]
    Source(#[from] FetchError),
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<MangaRepositoryError> for MangaError {
    fn from(e: MangaRepositoryError) -> Self {
        match e {
            MangaRepositoryError::NotFound => Self::NotFound,
            MangaRepositoryError::DbError(e) => Self::Other(anyhow!("{e}")),
        }
    }
}

impl From<ChapterRepositoryError> for MangaError {
    fn from(e: ChapterRepositoryError) -> Self {
        match e {
            ChapterRepositoryError::NotFound => Self::NotFound,
            ChapterRepositoryError::DbError(e) => Self::Other(anyhow!("{e}")),
        }
    }
}

#[derive(Clone)]
pub struct MangaService<M, C>
where
    M: MangaRepository,
    C: ChapterRepository,
{
    manga_repo: M,
    chapter_repo: C,
    source: Azoramoon,
}

impl<M, C> MangaService<M, C>
where
    M: MangaRepository,
    C: ChapterRepository,
{
    pub fn new(manga_repo: M, chapter_repo: C, source: Azoramoon) -> Self {
        Self {
            manga_repo,
            chapter_repo,
            source,
        }
    }

    pub async fn search(&self, term: &str) -> Result<Vec<SearchResult>, MangaError> {
        Ok(self.source.search(term).await?)
    }

    pub async fn fetch_manga_detail(&self, url: &str) -> Result<MangaInfo, MangaError> {
        Ok(self.source.get_manga_detail(url).await?)
    }

    pub async fn fetch_pages(&self, chapter_url: &str) -> Result<Vec<PageInfo>, MangaError> {
        Ok(self.source.get_pages(chapter_url).await?)
    }

    /// Store the manga at `url` unless it is already stored. Returns its id
    /// and whether it was newly created.
    pub async fn save_manga(&self, url: &str) -> Result<(i64, bool), MangaError> {
        if let Some(manga) = self.manga_repo.get_manga_by_url(url).await? {
            return Ok((manga.id, false));
        }

        let manga = self.refresh_manga(url).await?;

        Ok((manga.id, true))
    }

    /// Scrape `url` and upsert the manga with its chapter list and poster.
    pub async fn refresh_manga(&self, url: &str) -> Result<Manga, MangaError> {
        let info = self.source.get_manga_detail(url).await?;

        let mut manga = Manga::from(&info);
        self.manga_repo.insert_manga(&mut manga).await?;

        let chapters: Vec<Chapter> = info
            .chapters
            .iter()
            .map(|ch| Chapter::from_info(manga.id, ch))
            .collect();
        self.chapter_repo.insert_chapters(&chapters).await?;

        if !info.poster_url.is_empty() {
            match self.source.fetch_image(&info.poster_url).await {
                Ok((data, content_type)) => {
                    let poster = Image {
                        content_type: mime_type_of(&info.poster_url, content_type.as_deref()),
                        data,
                    };
                    self.manga_repo.update_poster(manga.id, &poster).await?;
                    manga.has_poster = true;
                }
                Err(e) => warn!("error downloading poster {}: {e}", info.poster_url),
            }
        }

        info!(
            "saved manga \"{}\" ({}) with {} chapters",
            manga.title,
            manga.id,
            chapters.len()
        );

        Ok(manga)
    }

    async fn summary(&self, manga: Manga) -> Result<MangaSummary, MangaError> {
        let (total_chapters, downloaded_chapters) =
            self.chapter_repo.get_chapter_counts(manga.id).await?;

        Ok(MangaSummary {
            manga,
            total_chapters,
            downloaded_chapters,
        })
    }

    pub async fn get_manga(&self, id: i64) -> Result<MangaSummary, MangaError> {
        let manga = self.manga_repo.get_manga_by_id(id).await?;

        self.summary(manga).await
    }

    pub async fn list_manga(&self) -> Result<Vec<MangaSummary>, MangaError> {
        let mut summaries = vec![];
        for manga in self.manga_repo.get_all_manga().await? {
            summaries.push(self.summary(manga).await?);
        }

        Ok(summaries)
    }

    pub async fn get_chapters(&self, manga_id: i64) -> Result<Vec<Chapter>, MangaError> {
        self.manga_repo.get_manga_by_id(manga_id).await?;

        Ok(self.chapter_repo.get_chapters_by_manga_id(manga_id).await?)
    }

    pub async fn get_poster(&self, id: i64) -> Result<Image, MangaError> {
        Ok(self.manga_repo.get_poster(id).await?)
    }

    pub async fn delete_manga(&self, id: i64) -> Result<(), MangaError> {
        self.manga_repo.delete_manga(id).await?;
        info!("deleted manga {id}");

        Ok(())
    }
}
