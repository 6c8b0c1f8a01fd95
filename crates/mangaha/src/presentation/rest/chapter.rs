use axum::{
    Json,
    body::Body,
    extract::{Extension, Path, Query},
    http::{Response, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::{Chapters, error::ApiError};
use crate::{
    application::worker::downloads::{Command, DownloadSender},
    domain::{entities::chapter::ChapterStatus, services::chapter::ChapterError},
};

#[derive(Debug, Deserialize)]
pub struct SaveChapterParams {
    manga_id: i64,
    url: String,
}

#[derive(Debug, Serialize)]
pub struct SavedChapterResponse {
    message: &'static str,
    chapter_id: i64,
    total_images: i64,
}

pub async fn save_chapter(
    Query(params): Query<SaveChapterParams>,
    Extension(svc): Extension<Chapters>,
    Extension(download_tx): Extension<DownloadSender>,
) -> Result<Json<SavedChapterResponse>, ApiError> {
    let saved = svc
        .save_chapter(params.manga_id, &params.url)
        .await
        .map_err(|e| match e {
            ChapterError::MangaNotFound => ApiError::not_found("Manga not found"),
            e => ApiError::internal(format!("Error saving chapter: {e}")),
        })?;

    if let Err(e) = download_tx.send(Command::Download(saved.chapter_id)) {
        error!("failed to queue chapter {}: {e}", saved.chapter_id);
    }

    Ok(Json(SavedChapterResponse {
        message: if saved.created {
            "Chapter saved successfully, images downloading in background"
        } else {
            "Chapter already exists"
        },
        chapter_id: saved.chapter_id,
        total_images: saved.total_images,
    }))
}

/// `"` and path separators would break the header or the saved file name.
fn attachment_name(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' | '\r' | '\n' => '_',
            c => c,
        })
        .collect();

    format!("attachment; filename=\"{name}.pdf\"")
}

pub async fn chapter_pdf(
    Path(id): Path<i64>,
    Extension(svc): Extension<Chapters>,
) -> Result<impl IntoResponse, ApiError> {
    let (chapter, pdf) = svc.chapter_pdf(id).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, pdf.len())
        .header(header::CONTENT_DISPOSITION, attachment_name(&chapter.title))
        .body(Body::from(pdf))
        .map_err(|e| ApiError::internal(e.to_string()))
}

pub async fn chapter_image(
    Path((id, order_no)): Path<(i64, i64)>,
    Extension(svc): Extension<Chapters>,
) -> Result<impl IntoResponse, ApiError> {
    let image = svc.get_image(id, order_no).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, image.content_type)
        .header(header::CONTENT_LENGTH, image.data.len())
        .body(Body::from(image.data))
        .map_err(|e| ApiError::internal(e.to_string()))
}

pub async fn chapter_status(
    Path(id): Path<i64>,
    Extension(svc): Extension<Chapters>,
) -> Result<Json<ChapterStatus>, ApiError> {
    Ok(Json(svc.chapter_status(id).await?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_attachment_name() {
        assert_eq!(attachment_name("ch-1"), "attachment; filename=\"ch-1.pdf\"");
        assert_eq!(
            attachment_name("say \"hi\"/2"),
            "attachment; filename=\"say _hi__2.pdf\""
        );
    }
}
