use axum::{
    Json,
    body::Body,
    extract::{Extension, Path, Query},
    http::{Response, StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::{Mangas, error::ApiError, search::UrlParams};
use crate::domain::{
    entities::{chapter::Chapter, manga::MangaSummary},
    services::manga::MangaError,
};

#[derive(Debug, Serialize)]
pub struct SavedManga {
    message: &'static str,
    manga_id: i64,
}

pub async fn save_manga(
    Query(params): Query<UrlParams>,
    Extension(svc): Extension<Mangas>,
) -> Result<Json<SavedManga>, ApiError> {
    let (manga_id, created) = svc.save_manga(&params.url).await?;

    Ok(Json(SavedManga {
        message: if created {
            "Manga saved successfully"
        } else {
            "Manga already exists"
        },
        manga_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MangaParams {
    url: Option<String>,
}

/// Live details of the manga at `?url=`, or every stored manga without it.
pub async fn manga_index(
    Query(params): Query<MangaParams>,
    Extension(svc): Extension<Mangas>,
) -> Result<Response<Body>, ApiError> {
    let Some(url) = params.url else {
        return Ok(Json(svc.list_manga().await?).into_response());
    };

    let detail = svc
        .fetch_manga_detail(&url)
        .await
        .map_err(|e| ApiError::internal(format!("Error getting manga details: {e}")))?;

    Ok(Json(detail).into_response())
}

pub async fn get_manga(
    Path(id): Path<i64>,
    Extension(svc): Extension<Mangas>,
) -> Result<Json<MangaSummary>, ApiError> {
    Ok(Json(svc.get_manga(id).await?))
}

pub async fn get_chapters(
    Path(id): Path<i64>,
    Extension(svc): Extension<Mangas>,
) -> Result<Json<Vec<Chapter>>, ApiError> {
    Ok(Json(svc.get_chapters(id).await?))
}

pub async fn delete_manga(
    Path(id): Path<i64>,
    Extension(svc): Extension<Mangas>,
) -> Result<StatusCode, ApiError> {
    svc.delete_manga(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_poster(
    Path(id): Path<i64>,
    Extension(svc): Extension<Mangas>,
) -> Result<impl IntoResponse, ApiError> {
    let poster = svc
        .get_poster(id)
        .await
        .map_err(|e| match e {
            MangaError::NotFound => ApiError::not_found("Poster not found"),
            e => e.into(),
        })?;

    Response::builder()
        .header(header::CONTENT_TYPE, poster.content_type)
        .header(header::CONTENT_LENGTH, poster.data.len())
        .body(Body::from(poster.data))
        .map_err(|e| ApiError::internal(e.to_string()))
}
