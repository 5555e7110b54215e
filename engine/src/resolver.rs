//! Per-variant section resolution.

use crate::{
    catalog, display,
    fallback::{Decision, FallbackPolicy, Recommendation},
    Error, Result, Sources,
};
use casino_lobby_types::{
    Badge, BannerConfig, CarouselConfig, FilterType, Game, GameGridConfig, GameQuery,
    OmissionReason, Placement, Promotion, Ref, SectionConfig, SectionContent,
    SuggestedGamesConfig, SuggestedMode, SuggestionSource,
};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on any single call to an external source.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Runs `future`, failing with [`Error::Timeout`] if it takes longer than
/// `duration`.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(duration, future)
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(duration)))
}

/// Request-scoped inputs to a resolution pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub user_id: Option<String>,
}

impl RenderContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[derive(Debug, PartialEq)]
pub enum SectionOutcome {
    Resolved(SectionContent),
    Omitted(OmissionReason),
}

/// Turns section configurations into content.
///
/// Failures never escape a section: an error from any source is logged and
/// reported as [`OmissionReason::SourceUnavailable`].
#[derive(Clone)]
pub struct SectionResolver {
    sources: Sources,
    call_timeout: Duration,
}

impl SectionResolver {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub async fn resolve_section(
        &self,
        section: &SectionConfig,
        context: &RenderContext,
    ) -> SectionOutcome {
        let result = match section {
            SectionConfig::Carousel(config) => self.resolve_carousel(config).await,
            SectionConfig::SuggestedGames(config) => self.resolve_suggested(config, context).await,
            SectionConfig::GameGrid(config) => self.resolve_grid(config).await,
            SectionConfig::Banner(config) => self.resolve_banner(config).await,
        };

        match result {
            Ok(Some(content)) => SectionOutcome::Resolved(content),
            Ok(None) => {
                debug!(section = %section.kind(), "section resolved to nothing");
                SectionOutcome::Omitted(OmissionReason::Empty)
            }
            Err(err) => {
                warn!(section = %section.kind(), error = %err, "section resolution failed");
                SectionOutcome::Omitted(OmissionReason::SourceUnavailable)
            }
        }
    }

    async fn call<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        with_timeout(self.call_timeout, future).await
    }

    async fn resolve_carousel(&self, config: &CarouselConfig) -> Result<Option<SectionContent>> {
        let promotions = if config.promotions.is_empty() {
            self.live_promotions(Placement::Hero).await?
        } else {
            self.resolve_promotion_refs(&config.promotions).await?
        };
        if promotions.is_empty() {
            return Ok(None);
        }
        Ok(Some(SectionContent::Carousel {
            promotions,
            settings: config.into(),
        }))
    }

    async fn resolve_banner(&self, config: &BannerConfig) -> Result<Option<SectionContent>> {
        let promotion = match &config.promotion {
            Some(reference) => self
                .resolve_promotion_refs(std::slice::from_ref(reference))
                .await?
                .into_iter()
                .next(),
            None => self
                .live_promotions(Placement::Banner)
                .await?
                .into_iter()
                .next(),
        };
        Ok(promotion.map(|promotion| SectionContent::Banner {
            promotion: Box::new(promotion),
            settings: config.into(),
        }))
    }

    async fn resolve_suggested(
        &self,
        config: &SuggestedGamesConfig,
        context: &RenderContext,
    ) -> Result<Option<SectionContent>> {
        let (games, source) = match config.mode {
            SuggestedMode::Manual => {
                let games = self
                    .call(catalog::resolve_refs(
                        self.sources.catalog.as_ref(),
                        &config.manual_games,
                    ))
                    .await?;
                (games, SuggestionSource::Manual)
            }
            SuggestedMode::Personalized => match self.personalized(config, context).await? {
                Some(resolved) => resolved,
                None => return Ok(None),
            },
        };
        if games.is_empty() {
            return Ok(None);
        }
        Ok(Some(SectionContent::SuggestedGames {
            games,
            source,
            settings: config.into(),
        }))
    }

    async fn personalized(
        &self,
        config: &SuggestedGamesConfig,
        context: &RenderContext,
    ) -> Result<Option<(Vec<Game>, SuggestionSource)>> {
        let policy = FallbackPolicy::from_config(config);
        let recommendation = match context.user_id() {
            Some(user_id) if policy.should_query(Some(user_id)) => {
                match self.ranked(user_id, config).await {
                    Ok(games) => Recommendation::Ranked(games),
                    Err(err) => {
                        warn!(
                            user_id,
                            placement = %config.placement,
                            error = %err,
                            "recommendations unavailable"
                        );
                        Recommendation::Failed(err)
                    }
                }
            }
            _ => Recommendation::Skipped,
        };

        match policy.decide(recommendation) {
            Decision::Personalized(games) => Ok(Some((games, SuggestionSource::Personalized))),
            Decision::Popular(limit) => {
                let games = self
                    .call(catalog::popular(self.sources.catalog.as_ref(), limit))
                    .await?;
                Ok(Some((games, SuggestionSource::Popular)))
            }
            Decision::Nothing => Ok(None),
        }
    }

    /// Ranked slugs from the recommendation service, resolved to enabled games
    /// in service order.
    async fn ranked(&self, user_id: &str, config: &SuggestedGamesConfig) -> Result<Vec<Game>> {
        let slugs = self
            .call(self.sources.recommendations.recommendations(
                user_id,
                &config.placement,
                config.limit,
            ))
            .await?;
        let mut games = self
            .call(catalog::resolve_by_slugs(
                self.sources.catalog.as_ref(),
                &slugs,
            ))
            .await?;
        games.truncate(config.limit);
        Ok(games)
    }

    async fn resolve_grid(&self, config: &GameGridConfig) -> Result<Option<SectionContent>> {
        let items = self.grid_items(config).await?;
        Ok(
            display::partition(items, config).map(|display| SectionContent::GameGrid {
                display,
                settings: config.into(),
            }),
        )
    }

    async fn grid_items(&self, config: &GameGridConfig) -> Result<Vec<Game>> {
        let source = self.sources.catalog.as_ref();
        let limit = config.limit;
        let query = match config.filter_type {
            FilterType::Manual => {
                return self
                    .call(catalog::resolve_refs(source, &config.manual_games))
                    .await;
            }
            FilterType::Type => match config.game_type {
                Some(game_type) => GameQuery::by_type(game_type, limit),
                None => return Ok(Vec::new()),
            },
            FilterType::Tag => match config.tag.as_deref().map(str::trim) {
                Some(tag) if !tag.is_empty() => GameQuery::by_tag(tag, limit),
                _ => return Ok(Vec::new()),
            },
            FilterType::Popular => GameQuery::popular(limit),
            FilterType::New => GameQuery::newest(limit),
            FilterType::Jackpot => GameQuery::jackpots(limit),
            FilterType::Featured => GameQuery::by_badge(Badge::Featured, limit),
        };
        self.call(catalog::query(source, &query)).await
    }

    /// Live promotions for `placement`, highest priority first.
    async fn live_promotions(&self, placement: Placement) -> Result<Vec<Promotion>> {
        let mut promotions = self
            .call(self.sources.promotions.live_by_placement(placement))
            .await?;
        promotions.retain(|promotion| promotion.is_live() && promotion.placement == placement);
        promotions.sort_by(Promotion::by_priority);
        Ok(promotions)
    }

    /// Explicitly chosen promotions in authored order. Inlined documents are
    /// used as-is, ids are fetched in one batch and unknown ids dropped.
    async fn resolve_promotion_refs(&self, refs: &[Ref<Promotion>]) -> Result<Vec<Promotion>> {
        let ids: Vec<String> = refs
            .iter()
            .filter_map(|entry| match entry {
                Ref::Id(id) => Some(id.clone()),
                Ref::Doc(_) => None,
            })
            .collect();
        let found = if ids.is_empty() {
            Vec::new()
        } else {
            self.call(self.sources.promotions.by_ids(&ids)).await?
        };
        let index: HashMap<&str, &Promotion> = found
            .iter()
            .map(|promotion| (promotion.id.as_str(), promotion))
            .collect();

        Ok(refs
            .iter()
            .filter_map(|entry| match entry {
                Ref::Doc(promotion) => Some((**promotion).clone()),
                Ref::Id(id) => index.get(id.as_str()).map(|promotion| (*promotion).clone()),
            })
            .collect())
    }
}
