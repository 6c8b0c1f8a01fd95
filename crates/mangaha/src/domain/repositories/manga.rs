use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{image::Image, manga::Manga};

#[derive(Debug, Error)]
pub enum MangaRepositoryError {
    #[error("manga not found")]
    NotFound,
    #[error("database return error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait MangaRepository: Send + Sync {
    async fn get_manga_by_id(&self, id: i64) -> Result<Manga, MangaRepositoryError>;

    async fn get_manga_by_url(&self, url: &str) -> Result<Option<Manga>, MangaRepositoryError>;

    async fn get_all_manga(&self) -> Result<Vec<Manga>, MangaRepositoryError>;

    /// Upsert keyed by url, sets `manga.id`.
    async fn insert_manga(&self, manga: &mut Manga) -> Result<(), MangaRepositoryError>;

    async fn update_poster(&self, id: i64, poster: &Image) -> Result<(), MangaRepositoryError>;

    async fn get_poster(&self, id: i64) -> Result<Image, MangaRepositoryError>;

    async fn delete_manga(&self, id: i64) -> Result<(), MangaRepositoryError>;
}
