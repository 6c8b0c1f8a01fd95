pub mod rest;

use anyhow::anyhow;
use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

use self::rest::{Chapters, Mangas, chapter, health::health_check, manga, search};
use crate::application::worker::downloads::DownloadSender;

#[derive(Default)]
pub struct ServerBuilder {
    manga_svc: Option<Mangas>,
    chapter_svc: Option<Chapters>,
    download_tx: Option<DownloadSender>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manga_svc(self, manga_svc: Mangas) -> Self {
        Self {
            manga_svc: Some(manga_svc),
            ..self
        }
    }

    pub fn with_chapter_svc(self, chapter_svc: Chapters) -> Self {
        Self {
            chapter_svc: Some(chapter_svc),
            ..self
        }
    }

    pub fn with_download_tx(self, download_tx: DownloadSender) -> Self {
        Self {
            download_tx: Some(download_tx),
            ..self
        }
    }

    pub fn build(self) -> Result<Server, anyhow::Error> {
        let manga_svc = self.manga_svc.ok_or_else(|| anyhow!("no manga service"))?;
        let chapter_svc = self
            .chapter_svc
            .ok_or_else(|| anyhow!("no chapter service"))?;
        let download_tx = self
            .download_tx
            .ok_or_else(|| anyhow!("no download sender"))?;

        Ok(Server::new(manga_svc, chapter_svc, download_tx))
    }
}

pub struct Server {
    router: Router,
}

impl Server {
    pub fn new(manga_svc: Mangas, chapter_svc: Chapters, download_tx: DownloadSender) -> Self {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/results", get(search::search))
            .route("/manga", get(manga::manga_index))
            .route("/chapter/images", get(search::chapter_images))
            .route("/manga/save", post(manga::save_manga))
            .route(
                "/manga/{id}",
                get(manga::get_manga).delete(manga::delete_manga),
            )
            .route("/manga/{id}/chapters", get(manga::get_chapters))
            .route("/manga/{id}/poster", get(manga::get_poster))
            .route("/chapter/save", post(chapter::save_chapter))
            .route("/chapter/{id}/pdf", get(chapter::chapter_pdf))
            .route("/chapter/{id}/images/{order_no}", get(chapter::chapter_image))
            .route("/chapter/{id}/status", get(chapter::chapter_status))
            .layer(Extension(manga_svc))
            .layer(Extension(chapter_svc))
            .layer(Extension(download_tx))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );

        Self { router }
    }

    pub fn router(self) -> Router {
        self.router
    }

    pub async fn serve<A: Into<SocketAddr>>(self, addr: A) -> Result<(), anyhow::Error> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("listening on http://{addr}");

        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
