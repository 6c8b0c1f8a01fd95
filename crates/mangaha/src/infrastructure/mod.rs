pub mod config;
pub mod database;
pub mod domain;
pub mod downloader;
pub mod logging;
pub mod pdf;
