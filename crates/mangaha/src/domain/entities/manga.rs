use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Manga {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub poster_url: String,
    pub description: String,
    pub genres: Vec<String>,
    pub status: String,
    pub rating: f64,
    pub has_poster: bool,
    pub date_added: NaiveDateTime,
    pub date_updated: NaiveDateTime,
}

impl Default for Manga {
    fn default() -> Self {
        Self {
            id: 0,
            url: "".to_string(),
            title: "".to_string(),
            poster_url: "".to_string(),
            description: "".to_string(),
            genres: vec![],
            status: "".to_string(),
            rating: 0.0,
            has_poster: false,
            date_added: NaiveDateTime::default(),
            date_updated: NaiveDateTime::default(),
        }
    }
}

impl From<&mangaha_lib::models::MangaInfo> for Manga {
    fn from(m: &mangaha_lib::models::MangaInfo) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            url: m.url.clone(),
            title: m.title.clone(),
            poster_url: m.poster_url.clone(),
            description: m.description.clone(),
            genres: m.genres.clone(),
            status: m.status.clone(),
            rating: m.rating,
            date_added: now,
            date_updated: now,
            ..Default::default()
        }
    }
}

/// A stored manga with its chapter counts.
#[derive(Debug, Clone, Serialize)]
pub struct MangaSummary {
    #[serde(flatten)]
    pub manga: Manga,
    pub total_chapters: i64,
    pub downloaded_chapters: i64,
}
