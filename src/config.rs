use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub llm: LLMConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("unknown APP_ENV `{}`", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub environment: Environment,
    pub cors_allowed_origins: Vec<String>,
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Credentials for a hosted S3-compatible provider (R2, AWS, ...).
#[derive(Clone, Deserialize)]
pub struct CloudStorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub region: String,
}

/// Connection settings for a local development server such as MinIO.
#[derive(Clone, Deserialize)]
pub struct LocalStorageConfig {
    pub endpoint: String,
    pub port: u16,
    pub access_key: String,
    pub secret_key: String,
    pub use_ssl: bool,
}

impl LocalStorageConfig {
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.endpoint, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Present only when access key, secret key and endpoint are all set.
    pub cloud: Option<CloudStorageConfig>,
    pub local: LocalStorageConfig,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub presigned_url_expiry_secs: u32,
    pub max_upload_bytes: usize,
    pub verify_uploads: bool,
    pub file_list_limit: i64,
}

// Secrets stay out of `{:?}` output.
impl std::fmt::Debug for CloudStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for LocalStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorageConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_base", &self.gemini_api_base)
            .field("has_api_key", &!self.gemini_api_key.is_empty())
            .finish()
    }
}

/// Command-line overrides for the server section.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Password-gated file storage on S3-compatible buckets")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Run database migrations and exit
    #[arg(long)]
    pub migrate_only: bool,
}

pub const DEFAULT_PRESIGNED_EXPIRY_SECS: u32 = 60 * 60;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: parse_var("PORT", 3000)?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                environment: parse_var("APP_ENV", Environment::Development)?,
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,https://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                site_url: non_empty_var("SITE_URL"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
                max_connections: parse_var("DB_MAX_CONNECTIONS", 10)?,
                min_connections: parse_var("DB_MIN_CONNECTIONS", 1)?,
            },
            storage: StorageConfig {
                cloud: cloud_storage_from_env(),
                local: LocalStorageConfig {
                    endpoint: env::var("S3_ENDPOINT_LOCAL").unwrap_or_else(|_| "localhost".to_string()),
                    port: parse_var("S3_PORT", 9000)?,
                    access_key: env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
                    secret_key: env::var("S3_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
                    use_ssl: parse_var("S3_USE_SSL", false)?,
                },
            },
            llm: LLMConfig {
                gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
                gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
                gemini_api_base: env::var("GEMINI_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string()),
            },
            uploads: UploadConfig {
                presigned_url_expiry_secs: parse_var(
                    "PRESIGNED_URL_EXPIRY_SECS",
                    DEFAULT_PRESIGNED_EXPIRY_SECS,
                )?,
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
                verify_uploads: parse_var("VERIFY_UPLOADS", false)?,
                file_list_limit: parse_var("FILE_LIST_LIMIT", 10)?,
            },
        })
    }

    /// Apply command-line overrides on top of the environment.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// The cloud backend is used only when all three of access key, secret key
/// and endpoint are configured.
fn cloud_storage_from_env() -> Option<CloudStorageConfig> {
    let access_key_id = non_empty_var("AWS_ACCESS_KEY_ID")?;
    let secret_access_key = non_empty_var("AWS_SECRET_ACCESS_KEY")?;
    let endpoint = non_empty_var("S3_ENDPOINT")?;

    Some(CloudStorageConfig {
        access_key_id,
        secret_access_key,
        endpoint,
        region: env::var("AWS_REGION").unwrap_or_else(|_| "auto".to_string()),
    })
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("parsing {} value `{}`: {}", key, value, e)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
