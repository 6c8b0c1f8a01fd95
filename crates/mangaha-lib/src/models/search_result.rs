use serde::{Deserialize, Serialize};

use super::LatestChapter;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub poster_url: String,
    pub genres: Vec<String>,
    pub status: String,
    pub rating: f64,
    pub latest_chapter: Option<LatestChapter>,
}
