use async_trait::async_trait;
use mangaha_lib::models::PageInfo;
use thiserror::Error;

use crate::domain::entities::image::{ChapterImage, Image};

#[derive(Debug, Error)]
pub enum ImageRepositoryError {
    #[error("image not found")]
    NotFound,
    #[error("database error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Upsert keyed by `(chapter_id, order_no)`. A row whose url changed goes
    /// back to pending, otherwise its download state is kept.
    async fn insert_images(
        &self,
        chapter_id: i64,
        pages: &[PageInfo],
    ) -> Result<(), ImageRepositoryError>;

    /// Ordered by `order_no`.
    async fn get_images_by_chapter_id(
        &self,
        chapter_id: i64,
    ) -> Result<Vec<ChapterImage>, ImageRepositoryError>;

    /// Payload of a downloaded image.
    async fn get_image(&self, chapter_id: i64, order_no: i64)
    -> Result<Image, ImageRepositoryError>;

    /// Payloads of every downloaded image, ordered by `order_no`.
    async fn get_image_data_by_chapter_id(
        &self,
        chapter_id: i64,
    ) -> Result<Vec<(i64, Image)>, ImageRepositoryError>;

    async fn mark_downloaded(
        &self,
        chapter_id: i64,
        order_no: i64,
        data: &[u8],
        mime_type: &str,
    ) -> Result<(), ImageRepositoryError>;

    /// Returns `(total, downloaded)`.
    async fn get_image_counts(&self, chapter_id: i64) -> Result<(i64, i64), ImageRepositoryError>;
}
