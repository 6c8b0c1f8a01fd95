pub mod chapter;
pub mod error;
pub mod health;
pub mod manga;
pub mod search;

use crate::{
    domain::services::{chapter::ChapterService, manga::MangaService},
    infrastructure::domain::repositories::{
        chapter::ChapterRepositoryImpl, image::ImageRepositoryImpl, manga::MangaRepositoryImpl,
    },
};

pub type Mangas = MangaService<MangaRepositoryImpl, ChapterRepositoryImpl>;
pub type Chapters = ChapterService<MangaRepositoryImpl, ChapterRepositoryImpl, ImageRepositoryImpl>;
