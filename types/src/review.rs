use crate::{wire_enum, Game, Identified, Ref};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rating out of range (got={got}, min={}, max={})", MIN_RATING, MAX_RATING)]
    RatingOutOfRange { got: u8 },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

fn check_rating(rating: u8) -> Result<(), ValidationError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ValidationError::RatingOutOfRange { got: rating })
    }
}

fn check_present(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Published,
    Hidden,
    Pending,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReview {
    pub id: String,
    /// The CMS collection names this field `visitorId`.
    #[serde(alias = "visitorId")]
    pub user_id: String,
    pub game: Ref<Game>,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_text: Option<String>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl GameReview {
    pub fn game_id(&self) -> &str {
        self.game.id()
    }
}

impl Identified for GameReview {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub user_id: String,
    /// Game identifier.
    pub game: String,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_text: Option<String>,
}

impl ReviewInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_present("userId", &self.user_id)?;
        check_present("game", &self.game)?;
        check_rating(self.rating)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingInput {
    pub user_id: String,
    pub game_slug: String,
    pub rating: u8,
}

impl RatingInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_present("userId", &self.user_id)?;
        check_present("gameSlug", &self.game_slug)?;
        check_rating(self.rating)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Impression,
    Click,
    GameTime,
}

wire_enum!(EventType, "event type", {
    Impression => "impression",
    Click => "click",
    GameTime => "game_time",
});

/// Behavioural signal forwarded to the recommendation service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    pub user_id: String,
    pub game_slug: String,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl UserEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_present("userId", &self.user_id)?;
        check_present("gameSlug", &self.game_slug)
    }
}
