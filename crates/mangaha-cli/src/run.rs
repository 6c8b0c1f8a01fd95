use std::path::PathBuf;

use mangaha::{
    domain::services::{chapter::ChapterService, manga::MangaService},
    infrastructure::{
        config::Config,
        database::{self, Pool},
        domain::repositories::{
            chapter::ChapterRepositoryImpl, image::ImageRepositoryImpl, manga::MangaRepositoryImpl,
        },
        pdf::assemble_pdf,
    },
};

struct Services {
    pool: Pool,
    manga: MangaService<MangaRepositoryImpl, ChapterRepositoryImpl>,
    chapter: ChapterService<MangaRepositoryImpl, ChapterRepositoryImpl, ImageRepositoryImpl>,
}

async fn services(config: &Config) -> Result<Services, anyhow::Error> {
    let pool = database::establish_connection(&config.database_path, config.create_database).await?;

    let client = config.client()?;
    let source = config.source(client.clone());

    let manga_repo = MangaRepositoryImpl::new(pool.clone());
    let chapter_repo = ChapterRepositoryImpl::new(pool.clone());

    Ok(Services {
        manga: MangaService::new(manga_repo.clone(), chapter_repo.clone(), source.clone()),
        chapter: ChapterService::new(
            manga_repo,
            chapter_repo,
            ImageRepositoryImpl::new(pool.clone()),
            source,
            config.downloader(client)?,
        ),
        pool,
    })
}

async fn download_chapters(svc: &Services, manga_id: i64) -> Result<(), anyhow::Error> {
    for chapter in svc.manga.get_chapters(manga_id).await? {
        match svc.chapter.reconcile(chapter.id).await {
            Ok(status) => info!(
                "{}: {}/{} images",
                chapter.title, status.downloaded, status.total
            ),
            Err(e) => error!("failed to download {}: {e}", chapter.url),
        }
    }

    Ok(())
}

pub async fn search(
    config: &Config,
    term: &str,
    save: bool,
    chapters: bool,
) -> Result<(), anyhow::Error> {
    if !save {
        let source = config.source(config.client()?);
        let results = source.search(term).await?;
        println!("{}", serde_json::to_string_pretty(&results)?);

        return Ok(());
    }

    let svc = services(config).await?;
    let results = svc.manga.search(term).await?;
    info!("{} results for \"{term}\"", results.len());

    for result in &results {
        match svc.manga.save_manga(&result.url).await {
            Ok((manga_id, _)) => {
                println!("{manga_id}\t{}", result.title);
                if chapters {
                    download_chapters(&svc, manga_id).await?;
                }
            }
            Err(e) => error!("failed to save {}: {e}", result.url),
        }
    }

    svc.pool.close().await;

    Ok(())
}

pub async fn manga(config: &Config, url: &str) -> Result<(), anyhow::Error> {
    let svc = services(config).await?;

    let (manga_id, _) = svc.manga.save_manga(url).await?;
    let summary = svc.manga.get_manga(manga_id).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    svc.pool.close().await;

    Ok(())
}

pub async fn chapter(config: &Config, url: &str, pdf: Option<PathBuf>) -> Result<(), anyhow::Error> {
    let client = config.client()?;
    let pages = config.source(client.clone()).get_pages(url).await?;

    let Some(path) = pdf else {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    };

    let images: Vec<_> = config
        .downloader(client)?
        .download_all(&pages)
        .await?
        .into_iter()
        .map(|page| page.data)
        .collect();

    let bytes = tokio::task::spawn_blocking(move || assemble_pdf(&images)).await??;
    tokio::fs::write(&path, &bytes).await?;
    info!("wrote {} pages to {}", pages.len(), path.display());

    Ok(())
}

pub async fn series(config: &Config, pages: Option<usize>) -> Result<(), anyhow::Error> {
    let source = config.source(config.client()?);

    let pages = match pages {
        Some(pages) => pages,
        None => source.get_total_series_pages().await?,
    };
    info!("walking {pages} series pages");

    for link in source.get_series_links(pages).await {
        println!("{link}");
    }

    Ok(())
}
