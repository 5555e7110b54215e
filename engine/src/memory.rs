//! In-memory sources backed by a fixed data snapshot.
//!
//! Used by tests and by the server's offline mode, where a fixture file takes
//! the place of the CMS and the recommendation service.

use crate::{
    source::{
        CatalogSource, LayoutSource, PromotionSource, RecommendationSource, ReviewSource, Sources,
    },
    Error, Result,
};
use async_trait::async_trait;
use casino_lobby_types::{
    Game, GameQuery, GameReview, GameSort, GameType, LobbyLayout, Placement, Platform, Promotion,
    RatingInput, Ref, ReviewInput, ReviewStatus, UserEvent,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml snapshot: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid json snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the lobby reads, as one document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub games: Vec<Game>,
    #[serde(default)]
    pub promotions: Vec<Promotion>,
    /// Layouts in source order. The first default per platform wins.
    #[serde(default)]
    pub layouts: Vec<LobbyLayout>,
    #[serde(default)]
    pub reviews: Vec<GameReview>,
    /// Ranked game slugs per user id.
    #[serde(default)]
    pub recommendations: BTreeMap<String, Vec<String>>,
}

impl Snapshot {
    pub fn from_yaml(raw: &str) -> std::result::Result<Self, SnapshotError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_json(raw: &str) -> std::result::Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Loads a snapshot file. `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, SnapshotError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&raw)
        } else {
            Self::from_yaml(&raw)
        }
    }
}

/// Most recent events and ratings kept by a [`MemoryStore`]. Older entries
/// are dropped first.
pub const FEEDBACK_LOG_CAPACITY: usize = 1_024;

#[derive(Default)]
struct State {
    snapshot: Snapshot,
    events: VecDeque<UserEvent>,
    ratings: VecDeque<RatingInput>,
    next_review: u64,
}

fn push_bounded<T>(log: &mut VecDeque<T>, item: T) {
    if log.len() == FEEDBACK_LOG_CAPACITY {
        log.pop_front();
    }
    log.push_back(item);
}

/// A snapshot served through every source trait.
///
/// Reads never fail. Reviews are kept for the life of the store; events and
/// ratings only up to [`FEEDBACK_LOG_CAPACITY`] each.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        let next_review = snapshot.reviews.len() as u64 + 1;
        Self {
            state: RwLock::new(State {
                snapshot,
                next_review,
                ..State::default()
            }),
        }
    }

    /// Wires this store in as every source.
    pub fn sources(self: &Arc<Self>) -> Sources {
        Sources {
            catalog: self.clone(),
            promotions: self.clone(),
            layouts: self.clone(),
            recommendations: self.clone(),
        }
    }

    /// Events recorded through [`RecommendationSource::track_event`].
    pub async fn events(&self) -> Vec<UserEvent> {
        self.state.read().await.events.iter().cloned().collect()
    }

    /// Ratings recorded through [`RecommendationSource::submit_rating`].
    pub async fn ratings(&self) -> Vec<RatingInput> {
        self.state.read().await.ratings.iter().cloned().collect()
    }
}

#[async_trait]
impl CatalogSource for MemoryStore {
    async fn query(&self, query: &GameQuery) -> Result<Vec<Game>> {
        let state = self.state.read().await;
        let mut games: Vec<Game> = state
            .snapshot
            .games
            .iter()
            .filter(|game| query.matches(game))
            .cloned()
            .collect();
        games.sort_by(|a, b| query.sort.compare(a, b));
        Ok(games
            .into_iter()
            .skip(query.offset())
            .take(query.limit)
            .collect())
    }

    async fn by_ids(&self, ids: &[String]) -> Result<Vec<Game>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .games
            .iter()
            .filter(|game| ids.contains(&game.id))
            .cloned()
            .collect())
    }

    async fn by_slugs(&self, slugs: &[String]) -> Result<Vec<Game>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .games
            .iter()
            .filter(|game| slugs.contains(&game.slug))
            .cloned()
            .collect())
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Game>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .games
            .iter()
            .find(|game| game.slug == slug)
            .cloned())
    }

    async fn search(
        &self,
        text: &str,
        game_type: Option<GameType>,
        limit: usize,
    ) -> Result<Vec<Game>> {
        let needle = text.trim().to_lowercase();
        let state = self.state.read().await;
        let mut games: Vec<Game> = state
            .snapshot
            .games
            .iter()
            .filter(|game| game.is_enabled())
            .filter(|game| game_type.map_or(true, |ty| game.game_type == ty))
            .filter(|game| game.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        games.sort_by(|a, b| GameSort::Popularity.compare(a, b));
        games.truncate(limit);
        Ok(games)
    }
}

#[async_trait]
impl PromotionSource for MemoryStore {
    async fn live(&self, placement: Option<Placement>) -> Result<Vec<Promotion>> {
        let state = self.state.read().await;
        let mut promotions: Vec<Promotion> = state
            .snapshot
            .promotions
            .iter()
            .filter(|promotion| promotion.is_live())
            .filter(|promotion| placement.map_or(true, |p| promotion.placement == p))
            .cloned()
            .collect();
        promotions.sort_by(Promotion::by_priority);
        Ok(promotions)
    }

    async fn by_ids(&self, ids: &[String]) -> Result<Vec<Promotion>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .promotions
            .iter()
            .filter(|promotion| ids.contains(&promotion.id))
            .cloned()
            .collect())
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Promotion>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .promotions
            .iter()
            .find(|promotion| promotion.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl LayoutSource for MemoryStore {
    async fn by_slug(&self, slug: &str) -> Result<Option<LobbyLayout>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .layouts
            .iter()
            .find(|layout| layout.slug == slug)
            .cloned())
    }

    async fn default_for(&self, platform: Platform) -> Result<Option<LobbyLayout>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .layouts
            .iter()
            .find(|layout| layout.platform == platform && layout.is_default)
            .cloned())
    }

    async fn any_for(&self, platform: Platform) -> Result<Option<LobbyLayout>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .layouts
            .iter()
            .find(|layout| layout.platform == platform)
            .cloned())
    }
}

#[async_trait]
impl RecommendationSource for MemoryStore {
    async fn recommendations(
        &self,
        user_id: &str,
        _placement: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .recommendations
            .get(user_id)
            .map(|slugs| slugs.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn track_event(&self, event: &UserEvent) -> Result<()> {
        event.validate()?;
        push_bounded(&mut self.state.write().await.events, event.clone());
        Ok(())
    }

    async fn submit_rating(&self, rating: &RatingInput) -> Result<()> {
        rating.validate()?;
        push_bounded(&mut self.state.write().await.ratings, rating.clone());
        Ok(())
    }
}

#[async_trait]
impl ReviewSource for MemoryStore {
    async fn published_for_game(&self, game_id: &str) -> Result<Vec<GameReview>> {
        let state = self.state.read().await;
        let mut reviews: Vec<GameReview> = state
            .snapshot
            .reviews
            .iter()
            .filter(|review| review.game_id() == game_id)
            .filter(|review| review.status == ReviewStatus::Published)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(reviews)
    }

    async fn by_user(&self, user_id: &str, game_id: &str) -> Result<Option<GameReview>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot
            .reviews
            .iter()
            .find(|review| review.user_id == user_id && review.game_id() == game_id)
            .cloned())
    }

    async fn submit(&self, input: &ReviewInput) -> Result<GameReview> {
        input.validate()?;
        let mut state = self.state.write().await;
        if !state.snapshot.games.iter().any(|game| game.id == input.game) {
            return Err(Error::not_found("game", input.game.clone()));
        }
        let duplicate = state
            .snapshot
            .reviews
            .iter()
            .any(|review| review.user_id == input.user_id && review.game_id() == input.game);
        if duplicate {
            return Err(Error::Conflict(format!(
                "user {} already reviewed game {}",
                input.user_id, input.game
            )));
        }

        let review = GameReview {
            id: format!("review-{}", state.next_review),
            user_id: input.user_id.clone(),
            game: Ref::Id(input.game.clone()),
            rating: input.rating,
            review_text: input.review_text.clone(),
            status: ReviewStatus::Published,
            created_at: Some(Utc::now()),
        };
        state.next_review += 1;
        state.snapshot.reviews.push(review.clone());
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{disabled, game, layout, promotion};
    use casino_lobby_types::EventType;
    use std::io::Write;

    const FIXTURE: &str = r#"
games:
  - id: g1
    slug: starburst
    title: Starburst
    type: slot
    popularityScore: 80
  - id: g2
    slug: lightning-roulette
    title: Lightning Roulette
    type: live
    popularityScore: 95
    tags: [{ tag: roulette }]
promotions:
  - id: p1
    slug: welcome
    placement: hero
    status: live
    priority: 10
layouts:
  - slug: web-main
    platform: web
    isDefault: true
    sections:
      - blockType: game-grid-section
        filterType: popular
recommendations:
  user-1: [starburst]
"#;

    fn store() -> MemoryStore {
        MemoryStore::new(Snapshot {
            games: vec![
                game("g1", 10.0),
                game("g2", 30.0),
                disabled(game("g3", 99.0)),
            ],
            promotions: vec![
                promotion("p1", Placement::Hero, 1.0),
                promotion("p2", Placement::Hero, 5.0),
                promotion("p3", Placement::Banner, 9.0),
            ],
            layouts: vec![
                layout("plain", Platform::Web, false, Vec::new()),
                layout("first-default", Platform::Web, true, Vec::new()),
                layout("second-default", Platform::Web, true, Vec::new()),
            ],
            ..Snapshot::default()
        })
    }

    fn review(user: &str, game: &str, rating: u8) -> ReviewInput {
        ReviewInput {
            user_id: user.to_string(),
            game: game.to_string(),
            rating,
            review_text: None,
        }
    }

    #[test]
    fn test_snapshot_from_yaml() {
        let snapshot = Snapshot::from_yaml(FIXTURE).unwrap();
        assert_eq!(snapshot.games.len(), 2);
        assert_eq!(snapshot.games[1].tags, vec!["roulette".to_string()]);
        assert_eq!(snapshot.layouts[0].sections.len(), 1);
        assert_eq!(snapshot.recommendations["user-1"], vec!["starburst".to_string()]);
    }

    #[test]
    fn test_snapshot_load_picks_format_by_extension() {
        let yaml = Snapshot::from_yaml(FIXTURE).unwrap();

        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        json_file
            .write_all(serde_json::to_string(&yaml).unwrap().as_bytes())
            .unwrap();
        assert_eq!(Snapshot::load(json_file.path()).unwrap(), yaml);

        let mut yaml_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        yaml_file.write_all(FIXTURE.as_bytes()).unwrap();
        assert_eq!(Snapshot::load(yaml_file.path()).unwrap(), yaml);
    }

    #[test]
    fn test_snapshot_load_missing_file() {
        let err = Snapshot::load("/nonexistent/lobby.yaml").unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[tokio::test]
    async fn test_query_pages_enabled_games() {
        let store = store();
        let first = CatalogSource::query(&store, &GameQuery::popular(1)).await.unwrap();
        assert_eq!(first[0].id, "g2");
        let second = CatalogSource::query(&store, &GameQuery::popular(1).with_page(2))
            .await
            .unwrap();
        assert_eq!(second[0].id, "g1");
        let third = CatalogSource::query(&store, &GameQuery::popular(1).with_page(3))
            .await
            .unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = store();
        let found = store.search("GAME G1", None, 20).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "g1");
        assert!(store.search("game", Some(GameType::Live), 20).await.unwrap().is_empty());
        // Disabled games never match.
        assert!(store.search("g3", None, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_promotions_by_priority() {
        let store = store();
        let hero = store.live_by_placement(Placement::Hero).await.unwrap();
        let ids: Vec<_> = hero.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
        assert_eq!(store.live(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_first_default_layout_wins() {
        let store = store();
        let default = store.default_for(Platform::Web).await.unwrap().unwrap();
        assert_eq!(default.slug, "first-default");
        let any = store.any_for(Platform::Web).await.unwrap().unwrap();
        assert_eq!(any.slug, "plain");
        assert!(store.default_for(Platform::Mobile).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_review_submission() {
        let store = store();
        let created = store.submit(&review("u1", "g1", 4)).await.unwrap();
        assert_eq!(created.status, ReviewStatus::Published);
        assert_eq!(created.game_id(), "g1");

        let found = store.by_user("u1", "g1").await.unwrap();
        assert_eq!(found, Some(created));
        assert_eq!(store.published_for_game("g1").await.unwrap().len(), 1);

        let err = store.submit(&review("u1", "g1", 5)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        let err = store.submit(&review("u2", "g1", 6)).await.unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
        let err = store.submit(&review("u2", "missing", 3)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { what: "game", .. }));
    }

    #[tokio::test]
    async fn test_feedback_is_recorded() {
        let store = store();
        let rating = RatingInput {
            user_id: "u1".to_string(),
            game_slug: "slug-g1".to_string(),
            rating: 0,
        };
        assert!(matches!(
            store.submit_rating(&rating).await,
            Err(Error::Invalid(_))
        ));
        store
            .submit_rating(&RatingInput { rating: 5, ..rating })
            .await
            .unwrap();
        assert_eq!(store.ratings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_feedback_log_keeps_most_recent_entries() {
        let store = store();
        for i in 0..FEEDBACK_LOG_CAPACITY + 5 {
            store
                .track_event(&UserEvent {
                    user_id: format!("u{i}"),
                    game_slug: "slug-g1".to_string(),
                    event_type: EventType::Click,
                    duration_seconds: None,
                    metadata: None,
                })
                .await
                .unwrap();
        }
        let events = store.events().await;
        assert_eq!(events.len(), FEEDBACK_LOG_CAPACITY);
        assert_eq!(events[0].user_id, "u5");
        assert_eq!(
            events[FEEDBACK_LOG_CAPACITY - 1].user_id,
            format!("u{}", FEEDBACK_LOG_CAPACITY + 4)
        );
    }
}
