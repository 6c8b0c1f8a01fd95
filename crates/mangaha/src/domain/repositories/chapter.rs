use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::chapter::Chapter;

#[derive(Debug, Error)]
pub enum ChapterRepositoryError {
    #[error("chapter not found")]
    NotFound,
    #[error("database error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait ChapterRepository: Send + Sync {
    /// Upsert keyed by url.
    async fn insert_chapters(&self, chapters: &[Chapter]) -> Result<(), ChapterRepositoryError>;

    /// Upsert keyed by url, sets `chapter.id`.
    async fn insert_chapter(&self, chapter: &mut Chapter) -> Result<(), ChapterRepositoryError>;

    async fn get_chapter_by_id(&self, id: i64) -> Result<Chapter, ChapterRepositoryError>;

    async fn get_chapter_by_url(&self, url: &str)
    -> Result<Option<Chapter>, ChapterRepositoryError>;

    async fn get_chapters_by_manga_id(
        &self,
        manga_id: i64,
    ) -> Result<Vec<Chapter>, ChapterRepositoryError>;

    async fn get_next_order_no(&self, manga_id: i64) -> Result<i64, ChapterRepositoryError>;

    /// Returns `(total, downloaded)` where a chapter counts as downloaded once
    /// it has images and none of them is pending.
    async fn get_chapter_counts(&self, manga_id: i64) -> Result<(i64, i64), ChapterRepositoryError>;
}
