//! Catalog entries and the query vocabulary used to select them.

use crate::{null_as_default, wire_enum, Identified};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Page size used when a caller does not ask for one.
pub const DEFAULT_GAME_LIMIT: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Slot,
    Table,
    Live,
    Instant,
}

wire_enum!(GameType, "game type", {
    Slot => "slot",
    Table => "table",
    Live => "live",
    Instant => "instant",
});

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    New,
    Exclusive,
    Hot,
    Jackpot,
    Featured,
}

wire_enum!(Badge, "badge", {
    New => "new",
    Exclusive => "exclusive",
    Hot => "hot",
    Jackpot => "jackpot",
    Featured => "featured",
});

/// A game as stored in the catalog.
///
/// Only the fields the lobby filters and sorts on are typed. Everything else
/// the CMS returns (media, descriptions, bet limits) is kept in `extra` and
/// handed to the presentation layer untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub provider: String,
    #[serde(rename = "type")]
    pub game_type: GameType,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub popularity_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jackpot_amount: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Game {
    pub fn new(id: impl Into<String>, slug: impl Into<String>, game_type: GameType) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: String::new(),
            provider: String::new(),
            game_type,
            tags: Vec::new(),
            popularity_score: 0.0,
            jackpot_amount: None,
            badges: Vec::new(),
            status: GameStatus::Enabled,
            created_at: None,
            extra: Map::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == GameStatus::Enabled
    }

    pub fn has_badge(&self, badge: Badge) -> bool {
        self.badges.contains(&badge)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    pub fn has_jackpot(&self) -> bool {
        self.jackpot_amount.is_some_and(|amount| amount > 0.0)
    }
}

impl Identified for Game {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Tags arrive either as plain strings or as the CMS array-field shape
/// `[{"tag": "..."}]`.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagEntry {
        Plain(String),
        Row { tag: String },
    }

    let entries: Vec<TagEntry> = null_as_default(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            TagEntry::Plain(tag) | TagEntry::Row { tag } => tag,
        })
        .collect())
}

/// Sort orders the catalog supports. Every order is descending on its key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSort {
    #[default]
    Popularity,
    Newest,
    Jackpot,
}

impl GameSort {
    /// Field name understood by the CMS `sort` parameter.
    pub fn field(&self) -> &'static str {
        match self {
            GameSort::Popularity => "popularityScore",
            GameSort::Newest => "createdAt",
            GameSort::Jackpot => "jackpotAmount",
        }
    }

    /// Total order over games: descending on the sort key, then ascending on
    /// `id` so equal keys never depend on storage order.
    pub fn compare(&self, a: &Game, b: &Game) -> Ordering {
        let primary = match self {
            GameSort::Popularity => b.popularity_score.total_cmp(&a.popularity_score),
            GameSort::Newest => b.created_at.cmp(&a.created_at),
            GameSort::Jackpot => b
                .jackpot_amount
                .unwrap_or(0.0)
                .total_cmp(&a.jackpot_amount.unwrap_or(0.0)),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// A catalog query. Only enabled games ever match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameQuery {
    pub game_type: Option<GameType>,
    pub tag: Option<String>,
    pub badge: Option<Badge>,
    pub jackpot_only: bool,
    pub sort: GameSort,
    pub limit: usize,
    /// One-based page index.
    pub page: usize,
}

impl Default for GameQuery {
    fn default() -> Self {
        Self {
            game_type: None,
            tag: None,
            badge: None,
            jackpot_only: false,
            sort: GameSort::Popularity,
            limit: DEFAULT_GAME_LIMIT,
            page: 1,
        }
    }
}

impl GameQuery {
    pub fn popular(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn by_type(game_type: GameType, limit: usize) -> Self {
        Self {
            game_type: Some(game_type),
            limit,
            ..Self::default()
        }
    }

    pub fn by_tag(tag: impl Into<String>, limit: usize) -> Self {
        Self {
            tag: Some(tag.into()),
            limit,
            ..Self::default()
        }
    }

    pub fn by_badge(badge: Badge, limit: usize) -> Self {
        Self {
            badge: Some(badge),
            limit,
            ..Self::default()
        }
    }

    pub fn newest(limit: usize) -> Self {
        Self {
            badge: Some(Badge::New),
            sort: GameSort::Newest,
            limit,
            ..Self::default()
        }
    }

    pub fn jackpots(limit: usize) -> Self {
        Self {
            jackpot_only: true,
            sort: GameSort::Jackpot,
            limit,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn matches(&self, game: &Game) -> bool {
        game.is_enabled()
            && self.game_type.map_or(true, |ty| game.game_type == ty)
            && self.tag.as_deref().map_or(true, |tag| game.has_tag(tag))
            && self.badge.map_or(true, |badge| game.has_badge(badge))
            && (!self.jackpot_only || game.has_jackpot())
    }

    /// Number of matches to skip before this page starts.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn game(id: &str, score: f64) -> Game {
        let mut game = Game::new(id, id, GameType::Slot);
        game.popularity_score = score;
        game
    }

    #[test]
    fn test_popularity_ties_break_on_id() {
        let mut games = vec![game("b", 10.0), game("c", 50.0), game("a", 10.0)];
        games.sort_by(|a, b| GameSort::Popularity.compare(a, b));
        let ids: Vec<_> = games.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_newest_puts_undated_games_last() {
        let mut dated = game("dated", 0.0);
        dated.created_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        let undated = game("undated", 0.0);
        let mut games = vec![undated, dated];
        games.sort_by(|a, b| GameSort::Newest.compare(a, b));
        assert_eq!(games[0].id, "dated");
    }

    #[test]
    fn test_query_matching() {
        let mut jackpot = game("j", 1.0);
        jackpot.jackpot_amount = Some(1_000.0);
        jackpot.tags = vec!["gold".to_string()];
        let mut disabled = jackpot.clone();
        disabled.status = GameStatus::Disabled;
        let plain = game("p", 1.0);

        let jackpots = GameQuery::jackpots(10);
        assert!(jackpots.matches(&jackpot));
        assert!(!jackpots.matches(&disabled));
        assert!(!jackpots.matches(&plain));

        assert!(GameQuery::by_tag("gold", 10).matches(&jackpot));
        assert!(!GameQuery::by_tag("gold", 10).matches(&plain));
        assert!(!GameQuery::by_type(GameType::Live, 10).matches(&plain));
        assert!(GameQuery::popular(10).matches(&plain));
    }

    #[test]
    fn test_tags_accept_plain_strings_and_rows() {
        let plain: Game = serde_json::from_value(serde_json::json!({
            "id": "g1", "slug": "g1", "type": "table", "tags": ["cards"]
        }))
        .unwrap();
        assert!(plain.has_tag("cards"));

        let rows: Game = serde_json::from_value(serde_json::json!({
            "id": "g2", "slug": "g2", "type": "table", "tags": null, "badges": null
        }))
        .unwrap();
        assert!(rows.tags.is_empty());
        assert!(rows.badges.is_empty());
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(GameQuery::popular(12).offset(), 0);
        assert_eq!(GameQuery::popular(12).with_page(3).offset(), 24);
        assert_eq!(GameQuery::popular(12).with_page(0).page, 1);
    }
}
