use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub platform_base_url: String,
    pub platform_token: String,
    pub blob_backend: BlobBackend,
    pub record_backend: RecordBackend,
    /// Present when `blob_backend` is `S3`.
    pub s3: Option<S3Config>,
    /// Present when `record_backend` is `Redis`.
    pub redis_url: Option<String>,
    pub converter_cmd: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    Platform,
    S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordBackend {
    Platform,
    Redis,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let blob_backend = match optional_env("BLOB_BACKEND").as_deref() {
            None | Some("platform") => BlobBackend::Platform,
            Some("s3") => BlobBackend::S3,
            Some(other) => bail!("BLOB_BACKEND must be 'platform' or 's3', got '{other}'"),
        };
        let record_backend = match optional_env("RECORD_BACKEND").as_deref() {
            None | Some("platform") => RecordBackend::Platform,
            Some("redis") => RecordBackend::Redis,
            Some(other) => bail!("RECORD_BACKEND must be 'platform' or 'redis', got '{other}'"),
        };

        let s3 = match blob_backend {
            BlobBackend::Platform => None,
            BlobBackend::S3 => Some(S3Config {
                bucket: require_env("S3_BUCKET")?,
                endpoint: require_env("S3_ENDPOINT")?,
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
        };
        let redis_url = match record_backend {
            RecordBackend::Platform => None,
            RecordBackend::Redis => Some(require_env("REDIS_URL")?),
        };

        Ok(Config {
            platform_base_url: require_env("PLATFORM_BASE_URL")?,
            platform_token: require_env("PLATFORM_TOKEN")?,
            blob_backend,
            record_backend,
            s3,
            redis_url,
            converter_cmd: optional_env("CONVERTER_CMD").unwrap_or_else(|| "pdftoppm".to_string()),
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
