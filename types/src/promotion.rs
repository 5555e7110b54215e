use crate::{wire_enum, Identified};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Hero,
    Banner,
    Featured,
}

wire_enum!(Placement, "placement", {
    Hero => "hero",
    Banner => "banner",
    Featured => "featured",
});

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    #[default]
    Draft,
    Live,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A marketing promotion shown in carousels and banners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    pub placement: Placement,
    #[serde(default)]
    pub status: PromotionStatus,
    #[serde(default)]
    pub priority: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<Countdown>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Promotion {
    pub fn new(id: impl Into<String>, slug: impl Into<String>, placement: Placement) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: String::new(),
            placement,
            status: PromotionStatus::Live,
            priority: 0.0,
            countdown: None,
            extra: Map::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == PromotionStatus::Live
    }

    /// Highest priority first, ties broken by ascending `id`.
    pub fn by_priority(a: &Promotion, b: &Promotion) -> Ordering {
        b.priority
            .total_cmp(&a.priority)
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl Identified for Promotion {
    fn id(&self) -> &str {
        &self.id
    }
}
