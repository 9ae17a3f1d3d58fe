use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL. When absent the in-process document store is used.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub login_path: String,
    /// Hard lifetime of the session cookie. Idle expiry is enforced separately.
    pub token_ttl_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub image_max_bytes: usize,
    pub gallery_max_bytes: usize,
    pub fallback_max_bytes: usize,
    pub allow_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Memory,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_root: PathBuf,
    pub public_base_url: String,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
}

const MB: usize = 1024 * 1024;

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("CMS_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_COOKIE_NAME") {
            self.session.cookie_name = v;
        }
        if let Ok(v) = env::var("SESSION_COOKIE_SECURE") {
            self.session.cookie_secure = v.parse().unwrap_or(self.session.cookie_secure);
        }
        if let Ok(v) = env::var("SESSION_TOKEN_TTL_HOURS") {
            self.session.token_ttl_hours = v.parse().unwrap_or(self.session.token_ttl_hours);
        }

        // Upload overrides
        if let Ok(v) = env::var("UPLOAD_IMAGE_MAX_BYTES") {
            self.upload.image_max_bytes = v.parse().unwrap_or(self.upload.image_max_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_GALLERY_MAX_BYTES") {
            self.upload.gallery_max_bytes = v.parse().unwrap_or(self.upload.gallery_max_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_FALLBACK_MAX_BYTES") {
            self.upload.fallback_max_bytes = v.parse().unwrap_or(self.upload.fallback_max_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_ALLOW_FALLBACK") {
            self.upload.allow_fallback = v.parse().unwrap_or(self.upload.allow_fallback);
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            match v.to_lowercase().as_str() {
                "local" => self.storage.backend = StorageBackend::Local,
                "memory" => self.storage.backend = StorageBackend::Memory,
                "s3" => self.storage.backend = StorageBackend::S3,
                other => tracing::warn!("Ignoring unknown STORAGE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("STORAGE_LOCAL_ROOT") {
            self.storage.local_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("STORAGE_PUBLIC_BASE_URL") {
            self.storage.public_base_url = v;
        }
        if let Ok(v) = env::var("STORAGE_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Ok(v) = env::var("STORAGE_REGION") {
            self.storage.region = Some(v);
        }
        if let Ok(v) = env::var("STORAGE_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_request_size_bytes: 12 * MB,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            session: SessionConfig {
                cookie_name: "cms_session".to_string(),
                cookie_secure: false,
                login_path: "/admin/login".to_string(),
                token_ttl_hours: 12,
            },
            upload: UploadConfig {
                image_max_bytes: 5 * MB,
                gallery_max_bytes: 10 * MB,
                fallback_max_bytes: 10 * MB,
                allow_fallback: true,
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                local_root: PathBuf::from("./data/media"),
                public_base_url: "http://localhost:3000/media".to_string(),
                bucket: None,
                region: None,
                endpoint: None,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: "development-secret-change-me".to_string(),
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.session.cookie_secure = true;
        config.session.token_ttl_hours = 8;
        config.storage.public_base_url = "https://staging.example.org/media".to_string();
        config.security.cors_origins = vec!["https://staging.example.org".to_string()];
        config.security.jwt_secret = String::new();
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.max_request_size_bytes = 11 * MB;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.session.cookie_secure = true;
        config.session.token_ttl_hours = 8;
        config.storage.backend = StorageBackend::S3;
        config.storage.public_base_url = "https://example.org/media".to_string();
        config.security.cors_origins = vec!["https://example.org".to_string()];
        config.security.jwt_secret = String::new();
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults_use_local_backends() {
        let config = AppConfig::development();
        assert!(config.database.url.is_none());
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.upload.image_max_bytes, 5 * MB);
        assert_eq!(config.upload.gallery_max_bytes, 10 * MB);
        assert!(!config.session.cookie_secure);
    }

    #[test]
    fn production_requires_explicit_secret() {
        let config = AppConfig::production();
        assert!(matches!(config.environment, Environment::Production));
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.session.cookie_secure);
        assert_eq!(config.storage.backend, StorageBackend::S3);
    }
}
