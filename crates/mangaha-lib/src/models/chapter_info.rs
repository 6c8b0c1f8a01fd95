use serde::{Deserialize, Serialize};

/// A chapter entry of a manga's chapter list
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChapterInfo {
    pub order_no: i64,
    pub url: String,
    pub title: String,
}

/// The newest chapter shown next to a search result
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LatestChapter {
    pub url: String,
    pub title: String,
}
