use async_trait::async_trait;
use mangaha_lib::models::PageInfo;
use sqlx::{Row, SqlitePool};

use crate::{
    domain::{
        entities::image::{ChapterImage, Image},
        repositories::image::{ImageRepository, ImageRepositoryError},
    },
    infrastructure::database::Pool,
};

const CHUNK_SIZE: usize = 500;
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct ImageRepositoryImpl {
    pool: Pool,
}

impl ImageRepositoryImpl {
    pub fn new<P: Into<Pool>>(pool: P) -> Self {
        Self { pool: pool.into() }
    }
}

#[async_trait]
impl ImageRepository for ImageRepositoryImpl {
    async fn insert_images(
        &self,
        chapter_id: i64,
        pages: &[PageInfo],
    ) -> Result<(), ImageRepositoryError> {
        let Some(last) = pages.iter().map(|page| page.order_no).max() else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;
        for chunk in pages.chunks(CHUNK_SIZE) {
            let query_str = format!(
                r#"INSERT INTO chapter_image(chapter_id, order_no, url) VALUES {}
                ON CONFLICT(chapter_id, order_no) DO UPDATE SET
                    is_downloaded = CASE WHEN chapter_image.url = excluded.url THEN chapter_image.is_downloaded ELSE 0 END,
                    image_data = CASE WHEN chapter_image.url = excluded.url THEN chapter_image.image_data ELSE NULL END,
                    mime_type = CASE WHEN chapter_image.url = excluded.url THEN chapter_image.mime_type ELSE NULL END,
                    url = excluded.url
                "#,
                vec!["(?, ?, ?)"; chunk.len()].join(",")
            );

            let mut query = sqlx::query(&query_str);
            for page in chunk {
                query = query.bind(chapter_id).bind(page.order_no).bind(&page.url);
            }

            query.execute(&mut *tx).await?;
        }

        // pages dropped by the site since the last scrape
        sqlx::query(r#"DELETE FROM chapter_image WHERE chapter_id = ? AND order_no > ?"#)
            .bind(chapter_id)
            .bind(last)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn get_images_by_chapter_id(
        &self,
        chapter_id: i64,
    ) -> Result<Vec<ChapterImage>, ImageRepositoryError> {
        let images = sqlx::query(
            r#"SELECT id, chapter_id, order_no, url, mime_type, is_downloaded
                FROM chapter_image WHERE chapter_id = ? ORDER BY order_no ASC"#,
        )
        .bind(chapter_id)
        .fetch_all(&self.pool as &SqlitePool)
        .await?
        .iter()
        .map(|row| ChapterImage {
            id: row.get(0),
            chapter_id: row.get(1),
            order_no: row.get(2),
            url: row.get(3),
            mime_type: row.get(4),
            is_downloaded: row.get(5),
        })
        .collect();

        Ok(images)
    }

    async fn get_image(
        &self,
        chapter_id: i64,
        order_no: i64,
    ) -> Result<Image, ImageRepositoryError> {
        let row = sqlx::query(
            r#"SELECT image_data, mime_type FROM chapter_image
                WHERE chapter_id = ? AND order_no = ? AND is_downloaded AND image_data IS NOT NULL"#,
        )
        .bind(chapter_id)
        .bind(order_no)
        .fetch_optional(&self.pool as &SqlitePool)
        .await?
        .ok_or(ImageRepositoryError::NotFound)?;

        let data: Vec<u8> = row.get(0);
        let mime_type: Option<String> = row.get(1);

        Ok(Image {
            content_type: mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            data: data.into(),
        })
    }

    async fn get_image_data_by_chapter_id(
        &self,
        chapter_id: i64,
    ) -> Result<Vec<(i64, Image)>, ImageRepositoryError> {
        let images = sqlx::query(
            r#"SELECT order_no, image_data, mime_type FROM chapter_image
                WHERE chapter_id = ? AND is_downloaded AND image_data IS NOT NULL
                ORDER BY order_no ASC"#,
        )
        .bind(chapter_id)
        .fetch_all(&self.pool as &SqlitePool)
        .await?
        .into_iter()
        .map(|row| {
            let data: Vec<u8> = row.get(1);
            let mime_type: Option<String> = row.get(2);
            (
                row.get(0),
                Image {
                    content_type: mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
                    data: data.into(),
                },
            )
        })
        .collect();

        Ok(images)
    }

    async fn mark_downloaded(
        &self,
        chapter_id: i64,
        order_no: i64,
        data: &[u8],
        mime_type: &str,
    ) -> Result<(), ImageRepositoryError> {
        let result = sqlx::query(
            r#"UPDATE chapter_image SET image_data = ?, mime_type = ?, is_downloaded = 1
                WHERE chapter_id = ? AND order_no = ?"#,
        )
        .bind(data)
        .bind(mime_type)
        .bind(chapter_id)
        .bind(order_no)
        .execute(&self.pool as &SqlitePool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ImageRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_image_counts(&self, chapter_id: i64) -> Result<(i64, i64), ImageRepositoryError> {
        let row = sqlx::query(
            r#"SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN is_downloaded THEN 1 ELSE 0 END), 0)
            FROM chapter_image WHERE chapter_id = ?"#,
        )
        .bind(chapter_id)
        .fetch_one(&self.pool as &SqlitePool)
        .await?;

        Ok((row.get(0), row.get(1)))
    }
}
