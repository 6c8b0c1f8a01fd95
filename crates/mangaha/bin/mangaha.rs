#[macro_use]
extern crate log;

use clap::Parser;
use mangaha::{
    application::worker,
    domain::services::{chapter::ChapterService, manga::MangaService},
    infrastructure::{
        config::Config,
        database,
        domain::repositories::{
            chapter::ChapterRepositoryImpl, image::ImageRepositoryImpl, manga::MangaRepositoryImpl,
        },
        logging,
    },
    presentation::ServerBuilder,
};

#[derive(Parser)]
struct Opts {
    /// Path to config file
    #[clap(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    logging::init();

    let opts: Opts = Opts::parse();
    let config = Config::open(opts.config)?;

    debug!("config: {:?}", config);

    let pool = database::establish_connection(&config.database_path, config.create_database).await?;

    let client = config.client()?;
    let source = config.source(client.clone());
    let downloader = config.downloader(client)?;

    let manga_repo = MangaRepositoryImpl::new(pool.clone());
    let chapter_repo = ChapterRepositoryImpl::new(pool.clone());
    let image_repo = ImageRepositoryImpl::new(pool.clone());

    let manga_svc = MangaService::new(manga_repo.clone(), chapter_repo.clone(), source.clone());
    let chapter_svc = ChapterService::new(manga_repo, chapter_repo, image_repo, source, downloader);

    let (download_tx, download_rx) = worker::downloads::channel();
    let download_worker_handle = worker::downloads::start(chapter_svc.clone(), download_rx);

    let server_fut = ServerBuilder::new()
        .with_manga_svc(manga_svc)
        .with_chapter_svc(chapter_svc)
        .with_download_tx(download_tx)
        .build()?
        .serve(([0, 0, 0, 0], config.port));

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                error!("server error: {e}");
            }
            info!("server shutdown");
        }
        _ = download_worker_handle => {
            info!("download worker quit");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl+c signal");
        }
    }

    info!("closing database...");
    pool.close().await;

    Ok(())
}
