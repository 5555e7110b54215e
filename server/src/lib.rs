//! HTTP service for the casino lobby.
//!
//! [`Lobby`] owns the resolution engine, the review store and the optional
//! layout cache. [`Api`] exposes it over axum.

use casino_lobby_engine::{
    catalog, with_timeout, Error, LayoutAssembler, LayoutRequest, MemoryStore, RenderContext,
    Result, ReviewSource, SectionResolver, Sources,
};
use casino_lobby_types::{
    Game, GameQuery, GameReview, GameSort, GameType, LobbyLayout, Placement, Promotion,
    RatingInput, ResolvedLayout, ReviewInput, UserEvent,
};
use std::sync::Arc;

mod api;
pub use api::Api;

mod cache;
pub mod cms;
mod config;
pub use config::{
    DataSource, ServerConfig, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_CMS_URL,
    DEFAULT_RECOMMENDATION_URL, DEFAULT_UPSTREAM_TIMEOUT_MS,
};
mod metrics;
pub mod recommendation;
pub mod upstream;

use cache::LayoutCache;
use metrics::{HttpMetrics, HttpMetricsSnapshot};

/// Number of search results returned when the caller does not ask for a limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Review fields supplied by the caller; the game comes from the URL.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub user_id: String,
    pub rating: u8,
    #[serde(default)]
    pub review_text: Option<String>,
}

pub struct Lobby {
    pub config: ServerConfig,
    assembler: LayoutAssembler,
    reviews: Arc<dyn ReviewSource>,
    cache: Option<LayoutCache>,
    http_metrics: HttpMetrics,
}

impl Lobby {
    pub fn new(config: ServerConfig, sources: Sources, reviews: Arc<dyn ReviewSource>) -> Self {
        let resolver = SectionResolver::new(sources).with_call_timeout(config.call_timeout());
        let cache = match (
            config.cache_redis_url.as_deref(),
            config.cache_redis_ttl_seconds,
        ) {
            (Some(url), Some(ttl)) if ttl > 0 => {
                let prefix = config
                    .cache_redis_prefix
                    .clone()
                    .unwrap_or_else(|| "casino-lobby:layout:".to_string());
                match LayoutCache::new(
                    url,
                    prefix,
                    std::time::Duration::from_secs(ttl),
                    config.call_timeout(),
                ) {
                    Ok(cache) => Some(cache),
                    Err(err) => {
                        tracing::warn!("Layout cache disabled: {err}");
                        None
                    }
                }
            }
            (Some(_), _) => {
                tracing::warn!("Layout cache disabled: ttl is zero or unset.");
                None
            }
            _ => None,
        };

        Self {
            config,
            assembler: LayoutAssembler::new(resolver),
            reviews,
            cache,
            http_metrics: HttpMetrics::default(),
        }
    }

    /// A lobby served entirely from an in-memory store.
    pub fn from_store(config: ServerConfig, store: Arc<MemoryStore>) -> Self {
        let sources = store.sources();
        Self::new(config, sources, store)
    }

    fn sources(&self) -> &Sources {
        self.assembler.resolver().sources()
    }

    /// Bounds a peripheral source call by the configured call timeout.
    async fn call<T>(&self, future: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        with_timeout(self.config.call_timeout(), future).await
    }

    async fn layout(&self, request: &LayoutRequest) -> Result<LobbyLayout> {
        if let Some(cache) = &self.cache {
            if let Some(layout) = cache.get(request).await {
                self.http_metrics.inc_layout_cache_hit();
                return Ok(layout);
            }
        }
        let layout = self.assembler.load(request).await?;
        if let Some(cache) = &self.cache {
            cache.set(request, &layout).await;
        }
        Ok(layout)
    }

    /// Resolves a full lobby page for `context`.
    pub async fn lobby(
        &self,
        request: &LayoutRequest,
        context: &RenderContext,
    ) -> Result<ResolvedLayout> {
        let layout = self.layout(request).await?;
        let resolved = self.assembler.assemble(&layout, context).await;
        self.http_metrics.record_sections(
            resolved.sections.len(),
            resolved.omitted.iter().map(|omitted| omitted.reason),
        );
        Ok(resolved)
    }

    /// Enabled games, most popular first.
    pub async fn list_games(
        &self,
        game_type: Option<GameType>,
        limit: usize,
        page: usize,
    ) -> Result<Vec<Game>> {
        let query = GameQuery {
            game_type,
            limit,
            ..GameQuery::default()
        }
        .with_page(page);
        self.call(catalog::query(self.sources().catalog.as_ref(), &query))
            .await
    }

    pub async fn search_games(
        &self,
        text: &str,
        game_type: Option<GameType>,
        limit: usize,
    ) -> Result<Vec<Game>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Invalid("search query must not be empty".to_string()));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut games = self
            .call(self.sources().catalog.search(text, game_type, limit))
            .await?;
        games.retain(Game::is_enabled);
        games.sort_by(|a, b| GameSort::Popularity.compare(a, b));
        games.truncate(limit);
        Ok(games)
    }

    /// Looks a game up by slug, whatever its status.
    pub async fn game(&self, slug: &str) -> Result<Game> {
        self.call(self.sources().catalog.by_slug(slug))
            .await?
            .ok_or_else(|| Error::not_found("game", slug))
    }

    /// Live promotions, highest priority first.
    pub async fn promotions(&self, placement: Option<Placement>) -> Result<Vec<Promotion>> {
        let mut promotions = self
            .call(self.sources().promotions.live(placement))
            .await?;
        promotions.retain(|promotion| {
            promotion.is_live() && placement.map_or(true, |p| promotion.placement == p)
        });
        promotions.sort_by(Promotion::by_priority);
        Ok(promotions)
    }

    pub async fn promotion(&self, slug: &str) -> Result<Promotion> {
        self.call(self.sources().promotions.by_slug(slug))
            .await?
            .ok_or_else(|| Error::not_found("promotion", slug))
    }

    /// Published reviews for the game at `slug`, newest first.
    pub async fn reviews(&self, slug: &str) -> Result<Vec<GameReview>> {
        let game = self.game(slug).await?;
        self.call(self.reviews.published_for_game(&game.id)).await
    }

    pub async fn user_review(&self, slug: &str, user_id: &str) -> Result<GameReview> {
        let game = self.game(slug).await?;
        self.call(self.reviews.by_user(user_id, &game.id))
            .await?
            .ok_or_else(|| Error::not_found("review", format!("{user_id}/{slug}")))
    }

    pub async fn submit_review(
        &self,
        slug: &str,
        submission: ReviewSubmission,
    ) -> Result<GameReview> {
        let game = self.game(slug).await?;
        let input = ReviewInput {
            user_id: submission.user_id,
            game: game.id,
            rating: submission.rating,
            review_text: submission.review_text,
        };
        input.validate()?;
        self.call(self.reviews.submit(&input)).await
    }

    pub async fn track_event(&self, event: &UserEvent) -> Result<()> {
        event.validate()?;
        self.call(self.sources().recommendations.track_event(event))
            .await
    }

    pub async fn submit_rating(&self, rating: &RatingInput) -> Result<()> {
        rating.validate()?;
        self.call(self.sources().recommendations.submit_rating(rating))
            .await
    }

    pub(crate) fn http_metrics(&self) -> &HttpMetrics {
        &self.http_metrics
    }

    pub(crate) fn http_metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.http_metrics.snapshot()
    }
}
