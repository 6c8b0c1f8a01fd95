use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::domain::{
    repositories::{chapter::ChapterRepository, image::ImageRepository, manga::MangaRepository},
    services::chapter::ChapterService,
};

pub type DownloadSender = UnboundedSender<Command>;
type DownloadReceiver = UnboundedReceiver<Command>;

#[derive(Debug)]
pub enum Command {
    /// Run one download pass over the pending images of a chapter.
    Download(i64),
}

pub struct DownloadWorker<M, C, I>
where
    M: MangaRepository + 'static,
    C: ChapterRepository + 'static,
    I: ImageRepository + 'static,
{
    svc: ChapterService<M, C, I>,
    rx: DownloadReceiver,
}

impl<M, C, I> DownloadWorker<M, C, I>
where
    M: MangaRepository + 'static,
    C: ChapterRepository + 'static,
    I: ImageRepository + 'static,
{
    pub fn new(svc: ChapterService<M, C, I>, download_receiver: DownloadReceiver) -> Self {
        Self {
            svc,
            rx: download_receiver,
        }
    }

    pub async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::Download(chapter_id) => match self.svc.reconcile(chapter_id).await {
                    Ok(status) => info!(
                        "chapter {chapter_id}: {}/{} images downloaded",
                        status.downloaded, status.total
                    ),
                    Err(e) => error!("failed to download chapter {chapter_id}, reason: {e}"),
                },
            }
        }

        debug!("download channel closed, worker stopped");
    }
}

pub fn channel() -> (DownloadSender, DownloadReceiver) {
    tokio::sync::mpsc::unbounded_channel::<Command>()
}

pub fn start<M, C, I>(
    svc: ChapterService<M, C, I>,
    download_receiver: DownloadReceiver,
) -> JoinHandle<()>
where
    M: MangaRepository + 'static,
    C: ChapterRepository + 'static,
    I: ImageRepository + 'static,
{
    let download_worker = DownloadWorker::new(svc, download_receiver);

    tokio::spawn(download_worker.run())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::{
        domain::{entities::manga::Manga, repositories::manga::MangaRepository},
        infrastructure::{
            database::establish_in_memory,
            domain::repositories::{
                chapter::ChapterRepositoryImpl, image::ImageRepositoryImpl,
                manga::MangaRepositoryImpl,
            },
            downloader::Downloader,
        },
    };
    use mangaha_source::{
        http::{Client, RetryPolicy},
        source::Azoramoon,
    };
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_worker_downloads_queued_chapter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/m/ch-1/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<img class="wp-manga-chapter-img" src="{}/a.png">"#,
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .mount(&server)
            .await;

        let pool = establish_in_memory().await.unwrap();
        let client = Client::new(RetryPolicy::new(0, Duration::from_millis(1))).unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let manga_repo = MangaRepositoryImpl::new(pool.clone());
        let mut manga = Manga {
            url: format!("{}/m/", server.uri()),
            title: "M".to_string(),
            ..Default::default()
        };
        manga_repo.insert_manga(&mut manga).await.unwrap();

        let svc = ChapterService::new(
            manga_repo,
            ChapterRepositoryImpl::new(pool.clone()),
            ImageRepositoryImpl::new(pool),
            Azoramoon::new(&server.uri(), client.clone()),
            Downloader::new(client, scratch.path()),
        );
        let saved = svc
            .save_chapter(manga.id, &format!("{}/m/ch-1/", server.uri()))
            .await
            .unwrap();

        let (tx, rx) = channel();
        let handle = start(svc.clone(), rx);
        tx.send(Command::Download(saved.chapter_id)).unwrap();
        drop(tx);
        handle.await.unwrap();

        let status = svc.chapter_status(saved.chapter_id).await.unwrap();
        assert!(status.complete);
        assert_eq!(svc.get_image(saved.chapter_id, 0).await.unwrap().content_type, "image/png");
    }
}
