use serde::{Deserialize, Serialize};

use super::ChapterInfo;

/// A type represent manga details as scraped from a source page
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct MangaInfo {
    pub url: String,
    pub title: String,
    pub poster_url: String,
    pub description: String,
    pub genres: Vec<String>,
    pub status: String,
    pub rating: f64,
    /// Oldest first, `order_no` starting from 0
    pub chapters: Vec<ChapterInfo>,
}
