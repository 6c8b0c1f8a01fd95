use bytes::Bytes;
use serde::Serialize;

/// A page row of a chapter, without its payload.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterImage {
    pub id: i64,
    pub chapter_id: i64,
    pub order_no: i64,
    pub url: String,
    pub mime_type: Option<String>,
    pub is_downloaded: bool,
}

impl ChapterImage {
    pub fn page(&self) -> mangaha_lib::models::PageInfo {
        mangaha_lib::models::PageInfo::new(self.order_no, self.url.clone())
    }
}

/// Raw image bytes with their media type.
#[derive(Debug, Clone)]
pub struct Image {
    pub content_type: String,
    pub data: Bytes,
}
