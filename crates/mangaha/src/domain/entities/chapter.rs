use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    pub id: i64,
    pub manga_id: i64,
    pub url: String,
    pub title: String,
    pub order_no: i64,
    pub date_added: NaiveDateTime,
}

impl Chapter {
    pub fn from_info(manga_id: i64, ch: &mangaha_lib::models::ChapterInfo) -> Self {
        Self {
            id: 0,
            manga_id,
            url: ch.url.clone(),
            title: ch.title.clone(),
            order_no: ch.order_no,
            date_added: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Download progress of a chapter's images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterStatus {
    pub chapter_id: i64,
    pub title: String,
    #[serde(rename = "total_images")]
    pub total: i64,
    #[serde(rename = "downloaded_images")]
    pub downloaded: i64,
    #[serde(rename = "is_complete")]
    pub complete: bool,
    pub progress: f64,
}

impl ChapterStatus {
    pub fn new(chapter_id: i64, title: String, total: i64, downloaded: i64) -> Self {
        let progress = if total == 0 {
            0.0
        } else {
            downloaded as f64 / total as f64 * 100.0
        };

        Self {
            chapter_id,
            title,
            total,
            downloaded,
            complete: downloaded == total,
            progress,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_progress() {
        let status = ChapterStatus::new(1, "ch".to_string(), 4, 1);
        assert_eq!(status.downloaded, 1);
        assert!(!status.complete);
        assert_eq!(status.progress, 25.0);

        let status = ChapterStatus::new(1, "ch".to_string(), 3, 3);
        assert!(status.complete);
        assert_eq!(status.progress, 100.0);
    }

    #[test]
    fn test_status_without_images() {
        let status = ChapterStatus::new(1, "ch".to_string(), 0, 0);
        assert_eq!(status.progress, 0.0);
        assert!(status.complete);
    }
}
