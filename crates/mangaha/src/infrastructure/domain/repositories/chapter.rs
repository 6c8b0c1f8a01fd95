use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::{
    domain::{
        entities::chapter::Chapter,
        repositories::chapter::{ChapterRepository, ChapterRepositoryError},
    },
    infrastructure::database::Pool,
};

const CHUNK_SIZE: usize = 500;

#[derive(Clone)]
pub struct ChapterRepositoryImpl {
    pool: Pool,
}

impl ChapterRepositoryImpl {
    pub fn new<P: Into<Pool>>(pool: P) -> Self {
        Self { pool: pool.into() }
    }
}

fn chapter_from_row(row: &SqliteRow) -> Chapter {
    Chapter {
        id: row.get(0),
        manga_id: row.get(1),
        url: row.get(2),
        title: row.get(3),
        order_no: row.get(4),
        date_added: row.get(5),
    }
}

#[async_trait]
impl ChapterRepository for ChapterRepositoryImpl {
    async fn insert_chapters(&self, chapters: &[Chapter]) -> Result<(), ChapterRepositoryError> {
        if chapters.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in chapters.chunks(CHUNK_SIZE) {
            let query_str = format!(
                r#"INSERT INTO chapter(
                    manga_id,
                    url,
                    title,
                    order_no,
                    date_added
                ) VALUES {} ON CONFLICT(url) DO UPDATE SET
                    manga_id=excluded.manga_id,
                    title=excluded.title,
                    order_no=excluded.order_no
                "#,
                vec!["(?, ?, ?, ?, ?)"; chunk.len()].join(",")
            );

            let mut query = sqlx::query(&query_str);
            for chapter in chunk {
                query = query
                    .bind(chapter.manga_id)
                    .bind(&chapter.url)
                    .bind(&chapter.title)
                    .bind(chapter.order_no)
                    .bind(chapter.date_added);
            }

            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn insert_chapter(&self, chapter: &mut Chapter) -> Result<(), ChapterRepositoryError> {
        let row = sqlx::query(
            r#"INSERT INTO chapter(
                manga_id,
                url,
                title,
                order_no,
                date_added
            ) VALUES (?, ?, ?, ?, ?) ON CONFLICT(url) DO UPDATE SET
                manga_id=excluded.manga_id,
                title=excluded.title,
                order_no=excluded.order_no
            RETURNING id
            "#,
        )
        .bind(chapter.manga_id)
        .bind(&chapter.url)
        .bind(&chapter.title)
        .bind(chapter.order_no)
        .bind(chapter.date_added)
        .fetch_one(&self.pool as &SqlitePool)
        .await?;

        chapter.id = row.get(0);

        Ok(())
    }

    async fn get_chapter_by_id(&self, id: i64) -> Result<Chapter, ChapterRepositoryError> {
        let row = sqlx::query(
            r#"SELECT id, manga_id, url, title, order_no, date_added FROM chapter WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool as &SqlitePool)
        .await?
        .ok_or(ChapterRepositoryError::NotFound)?;

        Ok(chapter_from_row(&row))
    }

    async fn get_chapter_by_url(
        &self,
        url: &str,
    ) -> Result<Option<Chapter>, ChapterRepositoryError> {
        let row = sqlx::query(
            r#"SELECT id, manga_id, url, title, order_no, date_added FROM chapter WHERE url = ?"#,
        )
        .bind(url)
        .fetch_optional(&self.pool as &SqlitePool)
        .await?;

        Ok(row.as_ref().map(chapter_from_row))
    }

    async fn get_chapters_by_manga_id(
        &self,
        manga_id: i64,
    ) -> Result<Vec<Chapter>, ChapterRepositoryError> {
        let chapters = sqlx::query(
            r#"SELECT id, manga_id, url, title, order_no, date_added
                FROM chapter WHERE manga_id = ? ORDER BY order_no ASC"#,
        )
        .bind(manga_id)
        .fetch_all(&self.pool as &SqlitePool)
        .await?
        .iter()
        .map(chapter_from_row)
        .collect();

        Ok(chapters)
    }

    async fn get_next_order_no(&self, manga_id: i64) -> Result<i64, ChapterRepositoryError> {
        let row = sqlx::query(r#"SELECT COALESCE(MAX(order_no) + 1, 0) FROM chapter WHERE manga_id = ?"#)
            .bind(manga_id)
            .fetch_one(&self.pool as &SqlitePool)
            .await?;

        Ok(row.get(0))
    }

    async fn get_chapter_counts(&self, manga_id: i64) -> Result<(i64, i64), ChapterRepositoryError> {
        let row = sqlx::query(
            r#"SELECT
                COUNT(*),
                COALESCE(SUM(
                    CASE WHEN
                        EXISTS (SELECT 1 FROM chapter_image i WHERE i.chapter_id = c.id) AND
                        NOT EXISTS (SELECT 1 FROM chapter_image i WHERE i.chapter_id = c.id AND NOT i.is_downloaded)
                    THEN 1 ELSE 0 END
                ), 0)
            FROM chapter c WHERE c.manga_id = ?"#,
        )
        .bind(manga_id)
        .fetch_one(&self.pool as &SqlitePool)
        .await?;

        Ok((row.get(0), row.get(1)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        domain::{entities::manga::Manga, repositories::manga::MangaRepository},
        infrastructure::{
            database::establish_in_memory, domain::repositories::manga::MangaRepositoryImpl,
        },
    };

    async fn setup() -> (Pool, i64) {
        let pool = establish_in_memory().await.unwrap();
        let mut manga = Manga {
            url: "https://site.test/m/".to_string(),
            title: "M".to_string(),
            ..Default::default()
        };
        MangaRepositoryImpl::new(pool.clone())
            .insert_manga(&mut manga)
            .await
            .unwrap();

        (pool, manga.id)
    }

    fn chapter(manga_id: i64, order_no: i64) -> Chapter {
        Chapter {
            id: 0,
            manga_id,
            url: format!("https://site.test/m/ch-{order_no}/"),
            title: format!("Chapter {order_no}"),
            order_no,
            date_added: chrono::Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn test_insert_chapters_upsert_by_url() {
        let (pool, manga_id) = setup().await;
        let repo = ChapterRepositoryImpl::new(pool);

        repo.insert_chapters(&[chapter(manga_id, 1), chapter(manga_id, 0)])
            .await
            .unwrap();
        let mut renamed = chapter(manga_id, 1);
        renamed.title = "Renamed".to_string();
        repo.insert_chapters(&[renamed]).await.unwrap();

        let chapters = repo.get_chapters_by_manga_id(manga_id).await.unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].order_no, 0);
        assert_eq!(chapters[1].title, "Renamed");
        assert_eq!(repo.get_next_order_no(manga_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_next_order_no_of_empty_manga() {
        let (pool, manga_id) = setup().await;
        let repo = ChapterRepositoryImpl::new(pool);

        assert_eq!(repo.get_next_order_no(manga_id).await.unwrap(), 0);
        assert_eq!(repo.get_chapter_counts(manga_id).await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn test_deleting_manga_cascades() {
        let (pool, manga_id) = setup().await;
        let repo = ChapterRepositoryImpl::new(pool.clone());
        let mut ch = chapter(manga_id, 0);
        repo.insert_chapter(&mut ch).await.unwrap();

        MangaRepositoryImpl::new(pool)
            .delete_manga(manga_id)
            .await
            .unwrap();

        assert!(matches!(
            repo.get_chapter_by_id(ch.id).await,
            Err(ChapterRepositoryError::NotFound)
        ));
    }
}
