use casino_lobby_engine::LayoutRequest;
use casino_lobby_types::LobbyLayout;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tokio::sync::Mutex;

/// Redis cache of layout documents.
///
/// Only the authored layout is cached. Resolved pages depend on the visitor
/// and on live catalog data, so they are always rebuilt. Every cache call is
/// bounded by `timeout`, and any failure or timeout degrades to a miss.
pub struct LayoutCache {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
    prefix: String,
    ttl: Duration,
    timeout: Duration,
}

impl LayoutCache {
    pub fn new(
        url: &str,
        prefix: String,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix,
            ttl,
            timeout,
        })
    }

    fn key(&self, request: &LayoutRequest) -> String {
        format!("{}{}", self.prefix, cache_key(request))
    }

    /// Returns a handle to the shared connection, connecting on first use.
    /// The lock is only held while connecting.
    async fn connection(&self) -> redis::RedisResult<ConnectionManager> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_connection_manager().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    fn reset(&self) {
        if let Ok(mut guard) = self.connection.try_lock() {
            *guard = None;
        }
    }

    async fn fetch(&self, key: String) -> redis::RedisResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        conn.get(key).await
    }

    async fn store(&self, key: String, value: Vec<u8>) -> redis::RedisResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex(key, value, self.ttl.as_secs().max(1)).await
    }

    pub async fn get(&self, request: &LayoutRequest) -> Option<LobbyLayout> {
        let raw = match tokio::time::timeout(self.timeout, self.fetch(self.key(request))).await {
            Ok(Ok(raw)) => raw?,
            Ok(Err(err)) => {
                tracing::warn!("layout cache get failed: {err}");
                self.reset();
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "layout cache get timed out"
                );
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(layout) => Some(layout),
            Err(err) => {
                tracing::warn!("discarding undecodable cached layout: {err}");
                None
            }
        }
    }

    pub async fn set(&self, request: &LayoutRequest, layout: &LobbyLayout) {
        let value = match serde_json::to_vec(layout) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("layout cache encode failed: {err}");
                return;
            }
        };
        match tokio::time::timeout(self.timeout, self.store(self.key(request), value)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!("layout cache set failed: {err}");
                self.reset();
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "layout cache set timed out"
                );
            }
        }
    }
}

fn cache_key(request: &LayoutRequest) -> String {
    match request {
        LayoutRequest::Slug(slug) => format!("slug:{slug}"),
        LayoutRequest::Platform(platform) => format!("platform:{platform}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casino_lobby_types::Platform;

    #[test]
    fn test_cache_keys_do_not_collide() {
        assert_eq!(
            cache_key(&LayoutRequest::Slug("web".to_string())),
            "slug:web"
        );
        assert_eq!(
            cache_key(&LayoutRequest::Platform(Platform::Web)),
            "platform:web"
        );
    }

    use casino_lobby_types::{LobbyLayout, SectionBlock};
    use std::time::Instant;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(LayoutCache::new(
            "not a url",
            "p:".to_string(),
            Duration::from_secs(1),
            Duration::from_secs(1)
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_unresponsive_redis_is_a_bounded_miss() {
        // Accepts connections at the TCP level but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cache = LayoutCache::new(
            &format!("redis://{addr}"),
            "p:".to_string(),
            Duration::from_secs(60),
            Duration::from_millis(100),
        )
        .unwrap();
        let request = LayoutRequest::Platform(Platform::Web);
        let layout = LobbyLayout {
            id: "l1".to_string(),
            slug: "web".to_string(),
            name: "Web".to_string(),
            platform: Platform::Web,
            is_default: true,
            sections: Vec::<SectionBlock>::new(),
        };

        let start = Instant::now();
        let (first, second) = tokio::join!(cache.get(&request), cache.get(&request));
        assert!(first.is_none());
        assert!(second.is_none());
        cache.set(&request, &layout).await;
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "cache calls took {:?}",
            start.elapsed()
        );
        drop(listener);
    }
}
