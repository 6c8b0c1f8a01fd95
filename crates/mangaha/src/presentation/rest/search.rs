use axum::{
    Json,
    extract::{Extension, Query},
};
use mangaha_lib::models::{PageInfo, SearchResult};
use serde::Deserialize;

use super::{Mangas, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    search: String,
}

#[derive(Debug, Deserialize)]
pub struct UrlParams {
    pub url: String,
}

pub async fn search(
    Query(params): Query<SearchParams>,
    Extension(svc): Extension<Mangas>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let results = svc
        .search(&params.search)
        .await
        .map_err(|e| ApiError::internal(format!("Error searching manga: {e}")))?;

    Ok(Json(results))
}

pub async fn chapter_images(
    Query(params): Query<UrlParams>,
    Extension(svc): Extension<Mangas>,
) -> Result<Json<Vec<PageInfo>>, ApiError> {
    let pages = svc
        .fetch_pages(&params.url)
        .await
        .map_err(|e| ApiError::internal(format!("Error getting chapter images: {e}")))?;

    Ok(Json(pages))
}
