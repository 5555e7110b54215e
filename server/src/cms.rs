//! Client for the CMS REST API.
//!
//! Collections are queried with Payload's bracketed filter syntax, e.g.
//! `where[type][equals]=slot&sort=-popularityScore`. List endpoints answer
//! with a paginated envelope whose `docs` field holds the documents.

use crate::upstream::{Error, Upstream};
use async_trait::async_trait;
use casino_lobby_engine::{
    CatalogSource, Error as LobbyError, LayoutSource, PromotionSource, Result, ReviewSource,
};
use casino_lobby_types::{
    Game, GameQuery, GameReview, GameType, LobbyLayout, Placement, Platform, Promotion,
    ReviewInput,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;

const GAMES: &str = "api/games";
const PROMOTIONS: &str = "api/promotions";
const LAYOUTS: &str = "api/lobby-layouts";
const REVIEWS: &str = "api/game-reviews";

/// Page size for collections the lobby reads in full.
const COLLECTION_LIMIT: usize = 100;

/// Relationship depth that inlines referenced games and promotions into
/// layout sections.
const LAYOUT_DEPTH: u8 = 2;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginatedResponse<T> {
    docs: Vec<T>,
}

/// Create calls answer either with the document or with `{doc, message}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Created<T> {
    Wrapped { doc: T },
    Bare(T),
}

impl<T> Created<T> {
    fn into_inner(self) -> T {
        match self {
            Created::Wrapped { doc } | Created::Bare(doc) => doc,
        }
    }
}

/// Query-string builder for Payload filters.
#[derive(Default)]
struct Params(Vec<(String, String)>);

impl Params {
    fn filter(mut self, field: &str, op: &str, value: impl ToString) -> Self {
        self.0
            .push((format!("where[{field}][{op}]"), value.to_string()));
        self
    }

    fn any_of(mut self, field: &str, values: &[String]) -> Self {
        for value in values {
            self.0.push((format!("where[{field}][in]"), value.clone()));
        }
        self
    }

    fn sort_desc(mut self, field: &str) -> Self {
        self.0.push(("sort".to_string(), format!("-{field}")));
        self
    }

    fn limit(mut self, limit: usize) -> Self {
        self.0.push(("limit".to_string(), limit.to_string()));
        self
    }

    fn page(mut self, page: usize) -> Self {
        self.0.push(("page".to_string(), page.to_string()));
        self
    }

    fn depth(mut self, depth: u8) -> Self {
        self.0.push(("depth".to_string(), depth.to_string()));
        self
    }
}

fn game_params(query: &GameQuery) -> Params {
    let mut params = Params::default().filter("status", "equals", "enabled");
    if let Some(game_type) = query.game_type {
        params = params.filter("type", "equals", game_type);
    }
    if let Some(tag) = &query.tag {
        params = params.filter("tags.tag", "equals", tag);
    }
    if let Some(badge) = query.badge {
        params = params.filter("badges", "contains", badge);
    }
    if query.jackpot_only {
        params = params.filter("jackpotAmount", "greater_than", 0);
    }
    params
        .sort_desc(query.sort.field())
        .limit(query.limit)
        .page(query.page)
}

/// Reads games, promotions, layouts and reviews from the CMS.
#[derive(Clone, Debug)]
pub struct CmsClient {
    upstream: Upstream,
}

impl CmsClient {
    pub fn new(base_url: &str, timeout: Duration) -> std::result::Result<Self, Error> {
        Ok(Self {
            upstream: Upstream::new(base_url, timeout)?,
        })
    }

    async fn docs<T: DeserializeOwned>(&self, path: &str, params: Params) -> Result<Vec<T>> {
        let response: PaginatedResponse<T> = self.upstream.get_json(path, &params.0).await?;
        Ok(response.docs)
    }

    async fn first<T: DeserializeOwned>(&self, path: &str, params: Params) -> Result<Option<T>> {
        Ok(self.docs(path, params.limit(1)).await?.into_iter().next())
    }
}

#[async_trait]
impl CatalogSource for CmsClient {
    async fn query(&self, query: &GameQuery) -> Result<Vec<Game>> {
        self.docs(GAMES, game_params(query)).await
    }

    async fn by_ids(&self, ids: &[String]) -> Result<Vec<Game>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = Params::default().any_of("id", ids).limit(ids.len());
        self.docs(GAMES, params).await
    }

    async fn by_slugs(&self, slugs: &[String]) -> Result<Vec<Game>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }
        let params = Params::default().any_of("slug", slugs).limit(slugs.len());
        self.docs(GAMES, params).await
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Game>> {
        self.first(GAMES, Params::default().filter("slug", "equals", slug))
            .await
    }

    async fn search(
        &self,
        text: &str,
        game_type: Option<GameType>,
        limit: usize,
    ) -> Result<Vec<Game>> {
        let mut params = Params::default()
            .filter("title", "like", text)
            .filter("status", "equals", "enabled");
        if let Some(game_type) = game_type {
            params = params.filter("type", "equals", game_type);
        }
        self.docs(GAMES, params.sort_desc("popularityScore").limit(limit))
            .await
    }
}

#[async_trait]
impl PromotionSource for CmsClient {
    async fn live(&self, placement: Option<Placement>) -> Result<Vec<Promotion>> {
        let mut params = Params::default().filter("status", "equals", "live");
        if let Some(placement) = placement {
            params = params.filter("placement", "equals", placement);
        }
        let mut promotions: Vec<Promotion> = self
            .docs(
                PROMOTIONS,
                params.sort_desc("priority").limit(COLLECTION_LIMIT),
            )
            .await?;
        promotions.sort_by(Promotion::by_priority);
        Ok(promotions)
    }

    async fn by_ids(&self, ids: &[String]) -> Result<Vec<Promotion>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = Params::default().any_of("id", ids).limit(ids.len());
        self.docs(PROMOTIONS, params).await
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Promotion>> {
        self.first(PROMOTIONS, Params::default().filter("slug", "equals", slug))
            .await
    }
}

#[async_trait]
impl LayoutSource for CmsClient {
    async fn by_slug(&self, slug: &str) -> Result<Option<LobbyLayout>> {
        let params = Params::default()
            .filter("slug", "equals", slug)
            .depth(LAYOUT_DEPTH);
        self.first(LAYOUTS, params).await
    }

    async fn default_for(&self, platform: Platform) -> Result<Option<LobbyLayout>> {
        let params = Params::default()
            .filter("platform", "equals", platform)
            .filter("isDefault", "equals", true)
            .depth(LAYOUT_DEPTH);
        self.first(LAYOUTS, params).await
    }

    async fn any_for(&self, platform: Platform) -> Result<Option<LobbyLayout>> {
        let params = Params::default()
            .filter("platform", "equals", platform)
            .depth(LAYOUT_DEPTH);
        self.first(LAYOUTS, params).await
    }
}

#[async_trait]
impl ReviewSource for CmsClient {
    async fn published_for_game(&self, game_id: &str) -> Result<Vec<GameReview>> {
        let params = Params::default()
            .filter("game", "equals", game_id)
            .filter("status", "equals", "published")
            .sort_desc("createdAt")
            .limit(COLLECTION_LIMIT);
        self.docs(REVIEWS, params).await
    }

    async fn by_user(&self, user_id: &str, game_id: &str) -> Result<Option<GameReview>> {
        let params = Params::default()
            .filter("userId", "equals", user_id)
            .filter("game", "equals", game_id);
        self.first(REVIEWS, params).await
    }

    async fn submit(&self, input: &ReviewInput) -> Result<GameReview> {
        input.validate()?;
        if self.by_user(&input.user_id, &input.game).await?.is_some() {
            return Err(LobbyError::Conflict(format!(
                "user {} already reviewed game {}",
                input.user_id, input.game
            )));
        }
        let created: Created<GameReview> = self.upstream.post_json(REVIEWS, input).await?;
        Ok(created.into_inner())
    }
}
