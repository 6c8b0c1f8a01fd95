use crate::{
    domain::{
        entities::{image::Image, manga::Manga},
        repositories::manga::{MangaRepository, MangaRepositoryError},
    },
    infrastructure::database::Pool,
};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

const MANGA_COLUMNS: &str = r#"
    id,
    url,
    title,
    poster_url,
    description,
    genres,
    status,
    rating,
    poster_data IS NOT NULL,
    date_added,
    date_updated
"#;

#[derive(Clone)]
pub struct MangaRepositoryImpl {
    pool: Pool,
}

impl MangaRepositoryImpl {
    pub fn new<P: Into<Pool>>(pool: P) -> Self {
        Self { pool: pool.into() }
    }
}

fn manga_from_row(row: &SqliteRow) -> Manga {
    Manga {
        id: row.get(0),
        url: row.get(1),
        title: row.get(2),
        poster_url: row.get(3),
        description: row.get(4),
        genres: serde_json::from_str(row.get::<String, _>(5).as_str()).unwrap_or_default(),
        status: row.get(6),
        rating: row.get(7),
        has_poster: row.get::<i64, _>(8) != 0,
        date_added: row.get(9),
        date_updated: row.get(10),
    }
}

#[async_trait]
impl MangaRepository for MangaRepositoryImpl {
    async fn get_manga_by_id(&self, id: i64) -> Result<Manga, MangaRepositoryError> {
        let row = sqlx::query(&format!("SELECT {MANGA_COLUMNS} FROM manga WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(MangaRepositoryError::NotFound)?;

        Ok(manga_from_row(&row))
    }

    async fn get_manga_by_url(&self, url: &str) -> Result<Option<Manga>, MangaRepositoryError> {
        let row = sqlx::query(&format!("SELECT {MANGA_COLUMNS} FROM manga WHERE url = ?"))
            .bind(url)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?;

        Ok(row.as_ref().map(manga_from_row))
    }

    async fn get_all_manga(&self) -> Result<Vec<Manga>, MangaRepositoryError> {
        let manga = sqlx::query(&format!(
            "SELECT {MANGA_COLUMNS} FROM manga ORDER BY title ASC"
        ))
        .fetch_all(&self.pool as &SqlitePool)
        .await?
        .iter()
        .map(manga_from_row)
        .collect();

        Ok(manga)
    }

    async fn insert_manga(&self, manga: &mut Manga) -> Result<(), MangaRepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO manga(
                url,
                title,
                poster_url,
                description,
                genres,
                status,
                rating,
                date_added,
                date_updated
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url)
            DO UPDATE SET
                title=excluded.title,
                poster_url=excluded.poster_url,
                description=excluded.description,
                genres=excluded.genres,
                status=excluded.status,
                rating=excluded.rating,
                date_updated=excluded.date_updated
            RETURNING id
            "#,
        )
        .bind(&manga.url)
        .bind(&manga.title)
        .bind(&manga.poster_url)
        .bind(&manga.description)
        .bind(serde_json::to_string(&manga.genres).unwrap_or_else(|_| "[]".to_string()))
        .bind(&manga.status)
        .bind(manga.rating)
        .bind(manga.date_added)
        .bind(manga.date_updated)
        .fetch_one(&self.pool as &SqlitePool)
        .await?;

        manga.id = row.get(0);

        Ok(())
    }

    async fn update_poster(&self, id: i64, poster: &Image) -> Result<(), MangaRepositoryError> {
        let result =
            sqlx::query(r#"UPDATE manga SET poster_data = ?, poster_mime_type = ? WHERE id = ?"#)
                .bind(poster.data.as_ref())
                .bind(&poster.content_type)
                .bind(id)
                .execute(&self.pool as &SqlitePool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(MangaRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_poster(&self, id: i64) -> Result<Image, MangaRepositoryError> {
        let row = sqlx::query(r#"SELECT poster_data, poster_mime_type FROM manga WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(MangaRepositoryError::NotFound)?;

        let data: Option<Vec<u8>> = row.get(0);
        let content_type: Option<String> = row.get(1);

        match data {
            Some(data) => Ok(Image {
                content_type: content_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                data: data.into(),
            }),
            None => Err(MangaRepositoryError::NotFound),
        }
    }

    async fn delete_manga(&self, id: i64) -> Result<(), MangaRepositoryError> {
        let result = sqlx::query(r#"DELETE FROM manga WHERE id = ?"#)
            .bind(id)
            .execute(&self.pool as &SqlitePool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MangaRepositoryError::NotFound);
        }

        Ok(())
    }
}
