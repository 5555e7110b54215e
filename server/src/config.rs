use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CMS_URL: &str = "http://localhost:3001";
pub const DEFAULT_RECOMMENDATION_URL: &str = "http://localhost:8081";
const DEFAULT_HTTP_RATE_LIMIT_PER_SECOND: u64 = 200;
const DEFAULT_HTTP_RATE_LIMIT_BURST: u32 = 400;
const DEFAULT_HTTP_BODY_LIMIT_BYTES: usize = 64 * 1024;
const DEFAULT_CACHE_REDIS_PREFIX: &str = "casino-lobby:layout:";
const DEFAULT_CACHE_REDIS_TTL_SECONDS: u64 = 30;

/// Where lobby data comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DataSource {
    /// The CMS REST API and the recommendation service.
    Remote {
        cms_url: String,
        recommendation_url: String,
    },
    /// A snapshot file served from memory.
    Fixtures { path: PathBuf },
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Remote {
            cms_url: DEFAULT_CMS_URL.to_string(),
            recommendation_url: DEFAULT_RECOMMENDATION_URL.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ServerConfig {
    pub data_source: DataSource,
    /// Bound on each source call made while resolving a section.
    pub call_timeout_ms: u64,
    /// Client-side timeout for outbound HTTP requests.
    pub upstream_timeout_ms: u64,
    pub http_rate_limit_per_second: Option<u64>,
    pub http_rate_limit_burst: Option<u32>,
    pub http_body_limit_bytes: Option<usize>,
    pub cache_redis_url: Option<String>,
    pub cache_redis_prefix: Option<String>,
    pub cache_redis_ttl_seconds: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::default(),
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            upstream_timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
            http_rate_limit_per_second: Some(DEFAULT_HTTP_RATE_LIMIT_PER_SECOND),
            http_rate_limit_burst: Some(DEFAULT_HTTP_RATE_LIMIT_BURST),
            http_body_limit_bytes: Some(DEFAULT_HTTP_BODY_LIMIT_BYTES),
            cache_redis_url: None,
            cache_redis_prefix: Some(DEFAULT_CACHE_REDIS_PREFIX.to_string()),
            cache_redis_ttl_seconds: Some(DEFAULT_CACHE_REDIS_TTL_SECONDS),
        }
    }
}

impl ServerConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms.max(1))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms.max(1))
    }

    /// No rate limiting, no body limit. Used by tests.
    pub fn unlimited() -> Self {
        Self {
            http_rate_limit_per_second: None,
            http_rate_limit_burst: None,
            http_body_limit_bytes: None,
            ..Self::default()
        }
    }
}
