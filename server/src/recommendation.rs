use crate::upstream::{Error, Upstream};
use async_trait::async_trait;
use casino_lobby_engine::{RecommendationSource, Result};
use casino_lobby_types::{RatingInput, UserEvent};
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Client for the recommendation service.
#[derive(Clone, Debug)]
pub struct RecommendationClient {
    upstream: Upstream,
}

impl RecommendationClient {
    pub fn new(base_url: &str, timeout: Duration) -> std::result::Result<Self, Error> {
        Ok(Self {
            upstream: Upstream::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl RecommendationSource for RecommendationClient {
    async fn recommendations(
        &self,
        user_id: &str,
        placement: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let params = [
            ("userId".to_string(), user_id.to_string()),
            ("placement".to_string(), placement.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let response: RecommendationsResponse = self
            .upstream
            .get_json("v1/recommendations", &params)
            .await?;
        Ok(response.recommendations)
    }

    async fn track_event(&self, event: &UserEvent) -> Result<()> {
        event.validate()?;
        Ok(self.upstream.post("v1/events", event).await?)
    }

    async fn submit_rating(&self, rating: &RatingInput) -> Result<()> {
        rating.validate()?;
        Ok(self.upstream.post("v1/feedback/rating", rating).await?)
    }
}
