//! Common types for the casino lobby.
//!
//! Everything here mirrors the JSON documents the CMS serves (camelCase field
//! names, kebab-case enum values), so layouts, games and promotions can be
//! decoded straight from the REST API or from fixture files.

/// Implements `as_str`, `Display` and `FromStr` over a fixed set of wire names.
macro_rules! wire_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::ParseEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($name => Ok(Self::$variant),)+
                    _ => Err($crate::ParseEnumError {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }
    };
}
pub(crate) use wire_enum;

pub mod game;
pub mod lobby;
pub mod promotion;
pub mod reference;
pub mod render;
pub mod review;

pub use game::{Badge, Game, GameQuery, GameSort, GameStatus, GameType};
pub use lobby::{
    Alignment, BannerConfig, BannerSize, CardSize, CarouselConfig, CarouselHeight, Columns,
    DisplayStyle, FilterType, GameGridConfig, InvalidBlock, LobbyLayout, Platform, SectionBlock,
    SectionConfig, SectionKind, SuggestedGamesConfig, SuggestedMode,
};
pub use promotion::{Countdown, Placement, Promotion, PromotionStatus};
pub use reference::{Identified, Ref};
pub use render::{
    BannerSettings, CarouselSettings, DisplayModel, FeaturedPlacement, GridSettings,
    OmissionReason, OmittedSection, ResolvedLayout, ResolvedSection, SectionContent,
    SuggestedSettings, SuggestionSource,
};
pub use review::{
    EventType, GameReview, RatingInput, ReviewInput, ReviewStatus, UserEvent, ValidationError,
    MAX_RATING, MIN_RATING,
};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Failure to parse an enum from its wire name (query strings, CLI flags).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// The CMS emits `null` for unset arrays and relationship lists.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
