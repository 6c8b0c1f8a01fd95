pub mod chapter;
pub mod image;
pub mod manga;
