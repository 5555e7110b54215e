//! Fixtures and misbehaving sources for tests.

use crate::{
    memory::{MemoryStore, Snapshot},
    source::{CatalogSource, PromotionSource, RecommendationSource},
    Error, Result, Sources,
};
use async_trait::async_trait;
use casino_lobby_types::{
    Badge, Game, GameQuery, GameStatus, GameType, LobbyLayout, Placement, Platform, Promotion,
    RatingInput, SectionBlock, SectionConfig, UserEvent,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

/// An enabled slot game with slug `slug-{id}`.
pub fn game(id: &str, popularity: f64) -> Game {
    let mut game = Game::new(id, format!("slug-{id}"), GameType::Slot);
    game.title = format!("Game {id}");
    game.popularity_score = popularity;
    game
}

pub fn disabled(mut game: Game) -> Game {
    game.status = GameStatus::Disabled;
    game
}

pub fn with_badges(mut game: Game, badges: &[Badge]) -> Game {
    game.badges = badges.to_vec();
    game
}

/// A live promotion with slug `slug-{id}`.
pub fn promotion(id: &str, placement: Placement, priority: f64) -> Promotion {
    let mut promotion = Promotion::new(id, format!("slug-{id}"), placement);
    promotion.priority = priority;
    promotion
}

pub fn layout(
    slug: &str,
    platform: Platform,
    is_default: bool,
    sections: Vec<SectionConfig>,
) -> LobbyLayout {
    LobbyLayout {
        id: format!("layout-{slug}"),
        slug: slug.to_string(),
        name: slug.to_string(),
        platform,
        is_default,
        sections: sections.into_iter().map(SectionBlock::from).collect(),
    }
}

/// `g1..=gN` with popularity `N..=1`, so catalog order equals id order.
pub fn numbered_games(count: usize) -> Vec<Game> {
    (1..=count)
        .map(|i| game(&format!("g{i}"), (count + 1 - i) as f64))
        .collect()
}

/// Sources backed entirely by `store`.
pub fn store_sources(store: Arc<MemoryStore>) -> Sources {
    store.sources()
}

pub fn snapshot_sources(snapshot: Snapshot) -> Sources {
    store_sources(Arc::new(MemoryStore::new(snapshot)))
}

/// A catalog whose every call fails.
#[derive(Default)]
pub struct FailingCatalog;

#[async_trait]
impl CatalogSource for FailingCatalog {
    async fn query(&self, _query: &GameQuery) -> Result<Vec<Game>> {
        Err(Error::unavailable("catalog offline"))
    }

    async fn by_ids(&self, _ids: &[String]) -> Result<Vec<Game>> {
        Err(Error::unavailable("catalog offline"))
    }

    async fn by_slugs(&self, _slugs: &[String]) -> Result<Vec<Game>> {
        Err(Error::unavailable("catalog offline"))
    }

    async fn by_slug(&self, _slug: &str) -> Result<Option<Game>> {
        Err(Error::unavailable("catalog offline"))
    }

    async fn search(
        &self,
        _text: &str,
        _game_type: Option<GameType>,
        _limit: usize,
    ) -> Result<Vec<Game>> {
        Err(Error::unavailable("catalog offline"))
    }
}

/// A promotion source whose every call fails.
#[derive(Default)]
pub struct FailingPromotions;

#[async_trait]
impl PromotionSource for FailingPromotions {
    async fn live(&self, _placement: Option<Placement>) -> Result<Vec<Promotion>> {
        Err(Error::unavailable("promotions offline"))
    }

    async fn by_ids(&self, _ids: &[String]) -> Result<Vec<Promotion>> {
        Err(Error::unavailable("promotions offline"))
    }

    async fn by_slug(&self, _slug: &str) -> Result<Option<Promotion>> {
        Err(Error::unavailable("promotions offline"))
    }
}

/// How a [`ScriptedRecommendations`] answers.
#[derive(Clone, Debug)]
pub enum Script {
    Ranked(Vec<String>),
    Fail,
    Stall(Duration),
}

/// Recommendation source with a fixed answer that counts its calls.
pub struct ScriptedRecommendations {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedRecommendations {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn ranked(slugs: &[&str]) -> Self {
        Self::new(Script::Ranked(
            slugs.iter().map(|slug| slug.to_string()).collect(),
        ))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecommendationSource for ScriptedRecommendations {
    async fn recommendations(
        &self,
        _user_id: &str,
        _placement: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.script {
            Script::Ranked(slugs) => Ok(slugs.iter().take(limit).cloned().collect()),
            Script::Fail => Err(Error::unavailable("recommendation service returned 500")),
            Script::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
        }
    }

    async fn track_event(&self, _event: &UserEvent) -> Result<()> {
        Ok(())
    }

    async fn submit_rating(&self, _rating: &RatingInput) -> Result<()> {
        Ok(())
    }
}
