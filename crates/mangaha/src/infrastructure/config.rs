use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use mangaha_source::{
    http::{Client, FetchError, RetryPolicy},
    source::{Azoramoon, DEFAULT_BASE_URL},
};

use super::downloader::Downloader;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy::new(cfg.retries, Duration::from_millis(cfg.backoff_ms))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_create_database")]
    pub create_database: bool,
    #[serde(default = "default_scratch_path")]
    pub scratch_path: String,
    #[serde(default = "default_download_workers")]
    pub download_workers: usize,
    #[serde(default = "default_series_workers")]
    pub series_workers: usize,
    /// Seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Seconds
    #[serde(default = "default_image_timeout")]
    pub image_timeout: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: mangaha_home().join("config.yml"),
            port: default_port(),
            base_url: default_base_url(),
            database_path: default_database_path(),
            create_database: default_create_database(),
            scratch_path: default_scratch_path(),
            download_workers: default_download_workers(),
            series_workers: default_series_workers(),
            request_timeout: default_request_timeout(),
            image_timeout: default_image_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

fn mangaha_home() -> PathBuf {
    match std::env::var("MANGAHA_HOME") {
        Ok(path) => PathBuf::from(path),
        Err(_) => dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".mangaha"),
    }
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_database_path() -> String {
    let path = mangaha_home();
    if !path.exists() {
        let _ = std::fs::create_dir_all(&path);
    }
    path.join("mangaha.db").display().to_string()
}

fn default_create_database() -> bool {
    true
}

fn default_scratch_path() -> String {
    std::env::temp_dir().display().to_string()
}

fn default_download_workers() -> usize {
    6
}

fn default_series_workers() -> usize {
    5
}

fn default_request_timeout() -> u64 {
    10
}

fn default_image_timeout() -> u64 {
    15
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    300
}

impl Config {
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Config, anyhow::Error> {
        let config_path = match path {
            Some(p) => PathBuf::new().join(p),
            None => mangaha_home().join("config.yml"),
        };

        match std::fs::File::open(&config_path) {
            Ok(file) => {
                info!("Open config from {:?}", config_path);
                let mut cfg: Self = serde_yml::from_reader(file)?;
                cfg.path = config_path;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Config {
                    path: config_path,
                    ..Default::default()
                };
                cfg.save()?;
                info!("Write default config at {:?}", cfg.path);
                Ok(cfg)
            }
        }
    }

    pub fn save(&self) -> Result<(), anyhow::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_yml::to_string(&self)?)?;

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    pub fn client(&self) -> Result<Client, FetchError> {
        Client::new(self.retry_policy())
    }

    pub fn source(&self, client: Client) -> Azoramoon {
        Azoramoon::new(&self.base_url, client)
            .with_timeout(self.request_timeout(), self.image_timeout())
            .with_series_workers(self.series_workers)
    }

    /// Downloader writing to `scratch_path`, which is created if missing.
    pub fn downloader(&self, client: Client) -> Result<Downloader, anyhow::Error> {
        std::fs::create_dir_all(&self.scratch_path)?;

        Ok(Downloader::new(client, &self.scratch_path)
            .with_workers(self.download_workers)
            .with_timeout(self.image_timeout()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: Config = serde_yml::from_str("port: 9000\nretry:\n  retries: 5\n").unwrap();

        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.download_workers, 6);
        assert_eq!(cfg.series_workers, 5);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.retry.retries, 5);
        assert_eq!(cfg.retry.backoff_ms, 300);
        assert_eq!(cfg.retry_policy().backoff, Duration::from_millis(300));
    }

    #[test]
    fn test_open_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");

        let cfg = Config::open(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.port, 8080);

        let reopened = Config::open(Some(&path)).unwrap();
        assert_eq!(reopened.database_path, cfg.database_path);
    }
}
