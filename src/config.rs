use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of the media tree: originals at the top, thumbnails below `thumbnails/`
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Static assets served under `/static`
    #[serde(default = "default_public_path")]
    pub public_path: String,
    /// Incoming parts are streamed here before they enter the media tree.
    /// Must not live under `upload_path`.
    #[serde(default = "default_staging_path")]
    pub staging_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "data/pictures.db".to_string()
}

fn default_upload_path() -> String {
    "data/uploads".to_string()
}

fn default_public_path() -> String {
    "public".to_string()
}

fn default_staging_path() -> String {
    "data/staging".to_string()
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

fn default_max_files() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_path: default_upload_path(),
            public_path: default_public_path(),
            staging_path: default_staging_path(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl UploadConfig {
    /// Request body ceiling for the upload route: every file at its maximum
    /// plus 1 MiB for multipart framing and the text fields.
    pub fn body_limit(&self) -> usize {
        self.max_files
            .saturating_mul(self.max_file_size)
            .saturating_add(1024 * 1024)
    }
}

impl StorageConfig {
    pub fn thumbnails_dir(&self) -> PathBuf {
        Path::new(&self.upload_path).join(crate::models::THUMBNAIL_DIR)
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        tracing::info!(
            "Upload limits: max_file_size={} bytes, max_files={}",
            config.upload.max_file_size,
            config.upload.max_files
        );
        Ok(config)
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: PG_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("PG_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        // Plain PORT is honoured for container platforms; the namespaced key wins
        if let Ok(val) = env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("PG_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        // Database overrides
        if let Ok(val) = env::var("PG_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // Storage overrides
        if let Ok(val) = env::var("PG_CONF_STORAGE_UPLOAD_PATH") {
            self.storage.upload_path = val;
        }
        if let Ok(val) = env::var("PG_CONF_STORAGE_PUBLIC_PATH") {
            self.storage.public_path = val;
        }
        if let Ok(val) = env::var("PG_CONF_STORAGE_STAGING_PATH") {
            self.storage.staging_path = val;
        }

        // Upload overrides
        if let Ok(val) = env::var("PG_CONF_UPLOAD_MAX_FILE_SIZE") {
            if let Ok(size) = val.parse() {
                self.upload.max_file_size = size;
            }
        }
        if let Ok(val) = env::var("PG_CONF_UPLOAD_MAX_FILES") {
            if let Ok(count) = val.parse() {
                self.upload.max_files = count;
            }
        }
    }

    /// Ensure required directories exist
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        // Ensure database directory exists
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        // Originals and thumbnails
        fs::create_dir_all(&self.storage.upload_path)?;
        fs::create_dir_all(self.storage.thumbnails_dir())?;
        fs::create_dir_all(&self.storage.staging_path)?;

        Ok(())
    }
}
