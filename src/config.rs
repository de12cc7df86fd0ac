use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-5";
/// Hard ceiling for a single upstream model call.
pub const MAX_TIMEOUT_SECS: u64 = 120;

/// Process-wide settings, read once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model_name: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_concurrency: usize,
    pub bind_addr: String,
    pub allowed_origin: String,
    pub storage_dir: PathBuf,
    pub public_base_url: String,
    pub namespace: String,
    pub enable_image_gen: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(MAX_TIMEOUT_SECS),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            max_concurrency: 8,
            bind_addr: "0.0.0.0:8080".to_string(),
            allowed_origin: "http://localhost:3000".to_string(),
            storage_dir: PathBuf::from("./output"),
            public_base_url: "http://localhost:8080/files".to_string(),
            namespace: "prod".to_string(),
            enable_image_gen: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let timeout_secs = parse_number(&get, "LLM_TIMEOUT_SECS", MAX_TIMEOUT_SECS)?.clamp(1, MAX_TIMEOUT_SECS);
        let max_retries = parse_number(&get, "LLM_MAX_RETRIES", 2u32)?.min(5);
        let backoff_ms = parse_number(&get, "LLM_RETRY_BACKOFF_MS", 500u64)?.clamp(50, 10_000);
        let max_concurrency = parse_number(&get, "LLM_MAX_CONCURRENCY", 8usize)?.max(1);

        let enable_image_gen = get("ENABLE_IMAGE_GEN")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            api_key: get("OPENAI_API_KEY"),
            api_url: get("LLM_API_URL").unwrap_or(defaults.api_url),
            model_name: get("MODEL_NAME").unwrap_or(defaults.model_name),
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            retry_backoff: Duration::from_millis(backoff_ms),
            max_concurrency,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            allowed_origin: get("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            storage_dir: get("STORAGE_DIR").map(PathBuf::from).unwrap_or(defaults.storage_dir),
            public_base_url: get("PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            namespace: get("FIRESTORE_NAMESPACE").unwrap_or(defaults.namespace),
            enable_image_gen,
        })
    }

    /// The API key, or a config error when none was provided.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }
}

fn parse_number<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
