use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::naming::{KeyStrategy, MonthLocale};

/// Default request body cap (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub naming: NamingConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Empty means any origin
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub download_content_type: String,
    pub guess_content_type: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    Local,
    S3,
}

impl FromStr for StorageProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "disk" => Ok(StorageProvider::Local),
            "s3" | "supabase" => Ok(StorageProvider::S3),
            other => Err(anyhow!("Unknown STORAGE_PROVIDER: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub upload_dir: PathBuf,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NamingConfig {
    pub locale: MonthLocale,
    pub strategy: KeyStrategy,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: parse_origins(
                    &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .map(|v| v.parse())
                    .unwrap_or(Ok(DEFAULT_MAX_UPLOAD_BYTES))?,
                download_content_type: env::var("DOWNLOAD_CONTENT_TYPE")
                    .unwrap_or_else(|_| mime::APPLICATION_PDF.to_string()),
                guess_content_type: env::var("GUESS_CONTENT_TYPE")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()?,
            },
            storage: StorageConfig {
                provider: env::var("STORAGE_PROVIDER")
                    .unwrap_or_else(|_| "local".to_string())
                    .parse()?,
                upload_dir: env::var("UPLOAD_DIR")
                    .unwrap_or_else(|_| "uploads".to_string())
                    .into(),
                s3_bucket: env::var("S3_BUCKET")
                    .or_else(|_| env::var("SUPABASE_BUCKET"))
                    .unwrap_or_default(),
                s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                s3_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                s3_endpoint: env::var("S3_ENDPOINT").ok(),
                public_url: env::var("S3_PUBLIC_URL").ok(),
            },
            naming: NamingConfig {
                locale: env::var("FILENAME_LOCALE")
                    .unwrap_or_else(|_| "id".to_string())
                    .parse()
                    .map_err(|e: String| anyhow!(e))?,
                strategy: env::var("FILENAME_STRATEGY")
                    .unwrap_or_else(|_| "monthly".to_string())
                    .parse()
                    .map_err(|e: String| anyhow!(e))?,
            },
            log: LogConfig {
                dir: env::var("LOG_DIR").ok().map(PathBuf::from),
            },
        })
    }

    /// Checks that cannot be expressed by parsing alone. Run after CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if self.storage.provider == StorageProvider::S3 && self.storage.s3_bucket.is_empty() {
            return Err(anyhow!("S3_BUCKET must be set when STORAGE_PROVIDER is s3"));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("MAX_UPLOAD_BYTES must be greater than zero"));
        }
        Ok(())
    }

    /// Defaults for a local-disk deployment rooted at `upload_dir`
    pub fn local(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
                cors_allowed_origins: Vec::new(),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                download_content_type: mime::APPLICATION_PDF.to_string(),
                guess_content_type: false,
            },
            storage: StorageConfig {
                provider: StorageProvider::Local,
                upload_dir: upload_dir.into(),
                s3_bucket: String::new(),
                s3_region: "us-east-1".to_string(),
                s3_access_key_id: None,
                s3_secret_access_key: None,
                s3_endpoint: None,
                public_url: None,
            },
            naming: NamingConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// `*` or an empty list allows any origin
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "*")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert!(parse_origins("*").is_empty());
        assert_eq!(
            parse_origins("http://localhost:3000, http://localhost:5173"),
            vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()]
        );
    }

    #[test]
    fn test_storage_provider_aliases() {
        assert_eq!("supabase".parse::<StorageProvider>().unwrap(), StorageProvider::S3);
        assert_eq!("LOCAL".parse::<StorageProvider>().unwrap(), StorageProvider::Local);
        assert!("ftp".parse::<StorageProvider>().is_err());
    }

    #[test]
    fn test_from_env_defers_validation_to_caller() {
        env::set_var("STORAGE_PROVIDER", "s3");
        env::remove_var("S3_BUCKET");
        env::remove_var("SUPABASE_BUCKET");

        let mut config = Config::from_env().unwrap();
        env::remove_var("STORAGE_PROVIDER");

        assert_eq!(config.storage.provider, StorageProvider::S3);
        assert!(config.validate().is_err());

        // what `--storage local` does in main
        config.storage.provider = StorageProvider::Local;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_requires_bucket() {
        let mut config = Config::local("uploads");
        assert!(config.validate().is_ok());

        config.storage.provider = StorageProvider::S3;
        assert!(config.validate().is_err());

        config.storage.s3_bucket = "pdfs".to_string();
        assert!(config.validate().is_ok());
    }
}
