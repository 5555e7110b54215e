use axum::{
    extract::{DefaultBodyLimit, Request, State as AxumState},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use governor::middleware::NoOpMiddleware;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{Lobby, ServerConfig};

mod http;

const REQUEST_ID: &str = "x-request-id";

pub struct Api {
    lobby: Arc<Lobby>,
}

/// Browser origins allowed to call the API, read from the environment.
#[derive(Clone)]
struct OriginConfig {
    allowed: Arc<HashSet<String>>,
    any: bool,
    missing_ok: bool,
}

impl OriginConfig {
    fn from_env() -> Self {
        let allowed: HashSet<String> = std::env::var("ALLOWED_HTTP_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
        if allowed.is_empty() {
            tracing::warn!("ALLOWED_HTTP_ORIGINS is empty; browser requests will be rejected");
        }
        Self {
            any: allowed.contains("*"),
            allowed: Arc::new(allowed),
            missing_ok: env_flag("ALLOW_HTTP_NO_ORIGIN"),
        }
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins = if self.any {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(self.allowed.iter().filter_map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| tracing::warn!(%origin, "ignoring malformed allowed origin"))
                    .ok()
            }))
        };
        let request_id = header::HeaderName::from_static(REQUEST_ID);
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, request_id.clone()])
            .expose_headers([request_id])
    }

    fn permits(&self, origin: Option<&str>) -> Result<(), &'static str> {
        match origin {
            Some(origin) if self.any || self.allowed.contains(origin) => Ok(()),
            Some(_) => Err("Origin not allowed"),
            None if self.missing_ok => Ok(()),
            None => Err("Origin required"),
        }
    }
}

type IpGovernorConfig =
    tower_governor::governor::GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter settings. `RATE_LIMIT_HTTP_PER_SEC` and
/// `RATE_LIMIT_HTTP_BURST` take precedence over the server config.
fn rate_limit(config: &ServerConfig) -> Option<Arc<IpGovernorConfig>> {
    let per_second = env_parse::<u64>("RATE_LIMIT_HTTP_PER_SEC")
        .or(config.http_rate_limit_per_second)
        .filter(|rate| *rate > 0)?;
    let burst = env_parse::<u32>("RATE_LIMIT_HTTP_BURST")
        .or(config.http_rate_limit_burst)
        .filter(|burst| *burst > 0)?;
    let period = Duration::from_nanos((1_000_000_000 / per_second).max(1));
    let governor = GovernorConfigBuilder::default()
        .period(period)
        .burst_size(burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish();
    if governor.is_none() {
        tracing::warn!(per_second, burst, "invalid rate limit; limiting disabled");
    }
    governor.map(Arc::new)
}

impl Api {
    pub fn new(lobby: Arc<Lobby>) -> Self {
        Self { lobby }
    }

    pub fn router(&self) -> Router {
        let origins = OriginConfig::from_env();
        let cors = origins.cors_layer();

        let mut router = Router::new()
            .route("/healthz", get(http::healthz))
            .route("/config", get(http::config))
            .route("/metrics/http", get(http::http_metrics))
            .route("/lobby", get(http::default_lobby))
            .route("/lobby/:slug", get(http::lobby_by_slug))
            .route("/games", get(http::list_games))
            .route("/games/search", get(http::search_games))
            .route("/games/:slug", get(http::get_game))
            .route(
                "/games/:slug/reviews",
                get(http::list_reviews).post(http::submit_review),
            )
            .route("/games/:slug/reviews/:user_id", get(http::get_user_review))
            .route("/promotions", get(http::list_promotions))
            .route("/promotions/:slug", get(http::get_promotion))
            .route("/events", post(http::track_event))
            .route("/feedback/rating", post(http::submit_rating));

        if let Some(config) = rate_limit(&self.lobby.config) {
            router = router.layer(GovernorLayer { config });
        }
        router = router
            .layer(cors)
            .layer(middleware::from_fn(move |req, next| {
                enforce_origin(origins.clone(), req, next)
            }));
        if let Some(limit) = self.lobby.config.http_body_limit_bytes.filter(|limit| *limit > 0) {
            router = router.layer(DefaultBodyLimit::max(limit));
        }
        router
            .layer(middleware::from_fn_with_state(
                self.lobby.clone(),
                request_id_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.lobby.clone())
    }
}

fn env_flag(var: &str) -> bool {
    matches!(
        std::env::var(var).as_deref().map(str::to_ascii_lowercase).as_deref(),
        Ok("1" | "true" | "yes")
    )
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|value| value.trim().parse().ok())
}

async fn enforce_origin(origins: OriginConfig, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    match origins.permits(origin) {
        Ok(()) => next.run(req).await,
        Err(reason) => (StatusCode::FORBIDDEN, reason).into_response(),
    }
}

async fn request_id_middleware(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let mut response = next.run(req).await;
    match response.status() {
        StatusCode::FORBIDDEN => lobby.http_metrics().inc_reject_origin(),
        StatusCode::PAYLOAD_TOO_LARGE => lobby.http_metrics().inc_reject_body_limit(),
        StatusCode::TOO_MANY_REQUESTS => lobby.http_metrics().inc_reject_rate_limit(),
        _ => {}
    }
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static(REQUEST_ID), header_value);
    }
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "http.request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use casino_lobby_engine::mocks::numbered_games;
    use casino_lobby_engine::{MemoryStore, Snapshot};
    use std::sync::Once;
    use tower::ServiceExt;

    static INIT: Once = Once::new();

    fn allow_no_origin() {
        INIT.call_once(|| std::env::set_var("ALLOW_HTTP_NO_ORIGIN", "1"));
    }

    fn router() -> Router {
        allow_no_origin();
        let store = Arc::new(MemoryStore::new(Snapshot {
            games: numbered_games(3),
            ..Snapshot::default()
        }));
        Api::new(Arc::new(Lobby::from_store(ServerConfig::unlimited(), store))).router()
    }

    #[test]
    fn test_origin_rules() {
        let origins = OriginConfig {
            allowed: Arc::new(["https://casino.example".to_string()].into_iter().collect()),
            any: false,
            missing_ok: false,
        };
        assert_eq!(origins.permits(Some("https://casino.example")), Ok(()));
        assert_eq!(
            origins.permits(Some("https://evil.example")),
            Err("Origin not allowed")
        );
        assert_eq!(origins.permits(None), Err("Origin required"));

        let open = OriginConfig {
            any: true,
            missing_ok: true,
            ..origins
        };
        assert_eq!(open.permits(Some("https://evil.example")), Ok(()));
        assert_eq!(open.permits(None), Ok(()));
    }

    #[tokio::test]
    async fn test_healthz_sets_request_id() {
        let response = router()
            .oneshot(HttpRequest::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = router()
            .oneshot(
                HttpRequest::get("/healthz")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_disallowed_origin_is_rejected() {
        let response = router()
            .oneshot(
                HttpRequest::get("/games")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_lists_games() {
        let response = router()
            .oneshot(HttpRequest::get("/games?limit=2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let games: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let ids: Vec<&str> = games
            .as_array()
            .unwrap()
            .iter()
            .map(|game| game["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["g1", "g2"]);
    }
}
