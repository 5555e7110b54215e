//! Contracts for the external collaborators the resolver reads from.
//!
//! Implementations live elsewhere: [`MemoryStore`](crate::MemoryStore) serves
//! a fixed snapshot, and the server crate ships HTTP clients for the CMS and
//! the recommendation service. All of them are treated as unreliable.

use crate::Result;
use async_trait::async_trait;
use casino_lobby_types::{
    Game, GameQuery, GameReview, GameType, LobbyLayout, Placement, Platform, Promotion,
    RatingInput, ReviewInput, UserEvent,
};
use std::sync::Arc;

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Enabled games matching `query`, sorted by `query.sort` and paged.
    async fn query(&self, query: &GameQuery) -> Result<Vec<Game>>;

    /// Games whose `id` is in `ids`, in any order. May include disabled games.
    async fn by_ids(&self, ids: &[String]) -> Result<Vec<Game>>;

    /// Games whose `slug` is in `slugs`, in any order. May include disabled
    /// games.
    async fn by_slugs(&self, slugs: &[String]) -> Result<Vec<Game>>;

    async fn by_slug(&self, slug: &str) -> Result<Option<Game>>;

    /// Enabled games whose title contains `text` (case-insensitive), most
    /// popular first.
    async fn search(
        &self,
        text: &str,
        game_type: Option<GameType>,
        limit: usize,
    ) -> Result<Vec<Game>>;
}

#[async_trait]
pub trait PromotionSource: Send + Sync {
    /// Live promotions, optionally restricted to one placement, highest
    /// priority first.
    async fn live(&self, placement: Option<Placement>) -> Result<Vec<Promotion>>;

    async fn live_by_placement(&self, placement: Placement) -> Result<Vec<Promotion>> {
        self.live(Some(placement)).await
    }

    /// Promotions whose `id` is in `ids`, in any order and any status.
    async fn by_ids(&self, ids: &[String]) -> Result<Vec<Promotion>>;

    async fn by_slug(&self, slug: &str) -> Result<Option<Promotion>>;
}

#[async_trait]
pub trait LayoutSource: Send + Sync {
    async fn by_slug(&self, slug: &str) -> Result<Option<LobbyLayout>>;

    /// The first layout flagged as default for `platform`.
    async fn default_for(&self, platform: Platform) -> Result<Option<LobbyLayout>>;

    /// The first layout for `platform`, default or not.
    async fn any_for(&self, platform: Platform) -> Result<Option<LobbyLayout>>;
}

#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Ranked game slugs for a user and placement, best first.
    async fn recommendations(
        &self,
        user_id: &str,
        placement: &str,
        limit: usize,
    ) -> Result<Vec<String>>;

    async fn track_event(&self, event: &UserEvent) -> Result<()>;

    async fn submit_rating(&self, rating: &RatingInput) -> Result<()>;
}

#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Published reviews for a game, newest first.
    async fn published_for_game(&self, game_id: &str) -> Result<Vec<GameReview>>;

    async fn by_user(&self, user_id: &str, game_id: &str) -> Result<Option<GameReview>>;

    /// Stores a review. One review per user and game.
    async fn submit(&self, input: &ReviewInput) -> Result<GameReview>;
}

/// The sources a resolution pass reads from.
#[derive(Clone)]
pub struct Sources {
    pub catalog: Arc<dyn CatalogSource>,
    pub promotions: Arc<dyn PromotionSource>,
    pub layouts: Arc<dyn LayoutSource>,
    pub recommendations: Arc<dyn RecommendationSource>,
}
