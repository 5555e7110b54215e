//! Recommendation fallback policy for personalized suggestion sections.
//!
//! The policy is a pure function of the configuration, the render context and
//! what the recommendation service produced. The resolver performs the I/O;
//! this module only decides.

use crate::Error;
use casino_lobby_types::{Game, SuggestedGamesConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub fallback_to_popular: bool,
    pub limit: usize,
}

/// What the personalization step produced.
#[derive(Debug)]
pub enum Recommendation {
    /// The service was not consulted.
    Skipped,
    /// Ranked games, already resolved against the catalog, in service order.
    Ranked(Vec<Game>),
    Failed(Error),
}

#[derive(Debug, PartialEq)]
pub enum Decision {
    /// Show the ranked list as-is.
    Personalized(Vec<Game>),
    /// Show the `n` most popular games.
    Popular(usize),
    /// Show nothing.
    Nothing,
}

impl FallbackPolicy {
    pub fn from_config(config: &SuggestedGamesConfig) -> Self {
        Self {
            fallback_to_popular: config.fallback_to_popular,
            limit: config.limit,
        }
    }

    /// Whether the recommendation service should be called at all.
    pub fn should_query(&self, user_id: Option<&str>) -> bool {
        self.limit > 0 && user_id.is_some_and(|id| !id.trim().is_empty())
    }

    pub fn decide(&self, recommendation: Recommendation) -> Decision {
        match recommendation {
            Recommendation::Ranked(games) if !games.is_empty() => Decision::Personalized(games),
            Recommendation::Ranked(_) | Recommendation::Skipped | Recommendation::Failed(_) => {
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> Decision {
        if self.fallback_to_popular && self.limit > 0 {
            Decision::Popular(self.limit)
        } else {
            Decision::Nothing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::game;

    fn policy(fallback_to_popular: bool) -> FallbackPolicy {
        FallbackPolicy {
            fallback_to_popular,
            limit: 10,
        }
    }

    #[test]
    fn test_ranked_list_is_kept_in_order() {
        let ranked = vec![game("g3", 1.0), game("g1", 99.0)];
        assert_eq!(
            policy(true).decide(Recommendation::Ranked(ranked.clone())),
            Decision::Personalized(ranked)
        );
    }

    #[test]
    fn test_empty_or_failed_falls_back() {
        for recommendation in [
            Recommendation::Ranked(Vec::new()),
            Recommendation::Skipped,
            Recommendation::Failed(Error::unavailable("boom")),
        ] {
            assert_eq!(policy(true).decide(recommendation), Decision::Popular(10));
        }
    }

    #[test]
    fn test_no_fallback_means_nothing() {
        assert_eq!(
            policy(false).decide(Recommendation::Ranked(Vec::new())),
            Decision::Nothing
        );
        assert_eq!(
            policy(false).decide(Recommendation::Failed(Error::Timeout(
                std::time::Duration::from_millis(5)
            ))),
            Decision::Nothing
        );
    }

    #[test]
    fn test_should_query_needs_user_and_limit() {
        let policy = policy(true);
        assert!(policy.should_query(Some("u1")));
        assert!(!policy.should_query(None));
        assert!(!policy.should_query(Some("  ")));
        let zero = FallbackPolicy { limit: 0, ..policy };
        assert!(!zero.should_query(Some("u1")));
        assert_eq!(zero.decide(Recommendation::Skipped), Decision::Nothing);
    }

    #[test]
    fn test_from_config_defaults() {
        let policy = FallbackPolicy::from_config(&SuggestedGamesConfig::default());
        assert!(policy.fallback_to_popular);
        assert_eq!(policy.limit, 10);
    }
}
