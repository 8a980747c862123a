use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub compression: CompressionConfig,
    pub trainer: TrainerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub frontend_dir: PathBuf,
    pub cors_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub database_url: String,
    pub max_files_per_upload: usize,
    /// Largest single file an upload may carry.
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    pub cookie_name: String,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub threshold_bytes: u64,
    pub target_bytes: u64,
    pub max_attempts: u32,
    pub initial_quality: u8,
    pub min_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            compression: CompressionConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            frontend_dir: PathBuf::from("frontend/dist"),
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            database_url: "sqlite://image-classing.db".to_string(),
            max_files_per_upload: 10,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_minutes: 100,
            cookie_name: "classing_session".to_string(),
            secure_cookie: false,
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: 500 * 1024,
            target_bytes: 500 * 1024,
            max_attempts: 8,
            initial_quality: 70,
            min_quality: 10,
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001".to_string(),
            timeout_secs: 3600,
        }
    }
}

impl AppConfig {
    /// Loads `config/app.yaml` (or `$APP_CONFIG`), then applies environment
    /// overrides. A missing file falls back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match env::var("APP_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_config_path(),
        };

        let mut config = if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::from_file(&path)?
        } else {
            log::warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(address) = env::var("BIND_ADDRESS") {
            self.server.bind_address = address;
        }
        if let Ok(port) = env::var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => log::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Ok(dir) = env::var("FRONTEND_DIR") {
            self.server.frontend_dir = PathBuf::from(dir);
        }
        if let Ok(origin) = env::var("CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Ok(dir) = env::var("UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(dir);
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Ok(limit) = env::var("MAX_UPLOAD_BYTES") {
            match limit.parse() {
                Ok(limit) => self.storage.max_upload_bytes = limit,
                Err(_) => log::warn!("Ignoring invalid MAX_UPLOAD_BYTES value: {}", limit),
            }
        }
        if let Ok(secret) = env::var("SESSION_SECRET") {
            self.session.secret = secret;
        }
        if let Ok(url) = env::var("TRAINER_URL") {
            self.trainer.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret.len() < 16 {
            return Err(ConfigError::Invalid(
                "session.secret (SESSION_SECRET) must be at least 16 characters".into(),
            ));
        }
        if self.session.ttl_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "session.ttl_minutes must be positive".into(),
            ));
        }
        if self.compression.target_bytes == 0 || self.compression.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "compression.target_bytes and compression.max_attempts must be positive".into(),
            ));
        }
        if self.storage.max_files_per_upload == 0 || self.storage.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "storage.max_files_per_upload and storage.max_upload_bytes must be positive"
                    .into(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

fn default_config_path() -> PathBuf {
    match env::var("CARGO_MANIFEST_DIR") {
        Ok(manifest_dir) => PathBuf::from(format!("{}/../config/app.yaml", manifest_dir)),
        Err(_) => PathBuf::from("config/app.yaml"),
    }
}
