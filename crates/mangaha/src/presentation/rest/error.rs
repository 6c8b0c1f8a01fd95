use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::services::{chapter::ChapterError, manga::MangaError};

/// Error body of every endpoint, `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn not_found<S: Into<String>>(detail: S) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn internal<S: Into<String>>(detail: S) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}", self.detail);
        }

        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<MangaError> for ApiError {
    fn from(e: MangaError) -> Self {
        match e {
            MangaError::NotFound => Self::not_found("Manga not found"),
            e => Self::internal(e.to_string()),
        }
    }
}

impl From<ChapterError> for ApiError {
    fn from(e: ChapterError) -> Self {
        match e {
            ChapterError::MangaNotFound => Self::not_found("Manga not found"),
            ChapterError::NotFound => Self::not_found("Chapter not found"),
            ChapterError::ImageNotFound => Self::not_found("Image not found"),
            e => Self::internal(e.to_string()),
        }
    }
}
