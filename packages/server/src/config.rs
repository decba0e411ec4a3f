use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty or `"*"` allows any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `postgres://…` or `sqlite://zipvault.db?mode=rwc`.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    1
}

/// Blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding blob buckets. Default: "./data/blobs".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Bucket name for uploaded archives. Default: "uploads".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Chunk size in bytes. Default: 255 KiB.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Largest accepted archive in bytes. Default: 512 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Upper bound on streaming one upload into storage. Unset means no limit.
    #[serde(default)]
    pub write_timeout_secs: Option<u64>,
    /// Delete the stored blob when its metadata record cannot be saved.
    /// Default: true.
    #[serde(default = "default_compensate_orphans")]
    pub compensate_orphans: bool,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_bucket() -> String {
    "uploads".into()
}
fn default_chunk_size() -> usize {
    common::storage::DEFAULT_CHUNK_SIZE
}
fn default_max_blob_size() -> u64 {
    512 * 1024 * 1024
}
fn default_compensate_orphans() -> bool {
    true
}

impl StorageConfig {
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            bucket: default_bucket(),
            chunk_size: default_chunk_size(),
            max_blob_size: default_max_blob_size(),
            write_timeout_secs: None,
            compensate_orphans: default_compensate_orphans(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("database.url", "sqlite://zipvault.db?mode=rwc")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ZIPVAULT__DATABASE__URL)
            .add_source(Environment::with_prefix("ZIPVAULT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
