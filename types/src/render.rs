//! Render models handed to the presentation layer.
//!
//! These are the outputs of a resolution pass. They contain no timestamps or
//! request-scoped data, so resolving the same layout against the same catalog
//! snapshot always serializes to the same bytes.

use crate::{
    Alignment, BannerConfig, BannerSize, CardSize, CarouselConfig, CarouselHeight, Game,
    GameGridConfig, Platform, Promotion, SectionKind, SuggestedGamesConfig,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLayout {
    pub slug: String,
    pub name: String,
    pub platform: Platform,
    /// Sections with content, in authored order.
    pub sections: Vec<ResolvedSection>,
    /// Sections that resolved to nothing and take no space on the page.
    pub omitted: Vec<OmittedSection>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSection {
    /// Index of the block in the authored layout.
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub content: SectionContent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SectionContent {
    Carousel {
        promotions: Vec<Promotion>,
        settings: CarouselSettings,
    },
    SuggestedGames {
        games: Vec<Game>,
        source: SuggestionSource,
        settings: SuggestedSettings,
    },
    GameGrid {
        display: DisplayModel,
        settings: GridSettings,
    },
    Banner {
        promotion: Box<Promotion>,
        settings: BannerSettings,
    },
}

impl SectionContent {
    pub fn kind(&self) -> SectionKind {
        match self {
            SectionContent::Carousel { .. } => SectionKind::Carousel,
            SectionContent::SuggestedGames { .. } => SectionKind::SuggestedGames,
            SectionContent::GameGrid { .. } => SectionKind::GameGrid,
            SectionContent::Banner { .. } => SectionKind::Banner,
        }
    }
}

/// Where a suggested-games list came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Manual,
    Personalized,
    Popular,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeaturedPlacement {
    Left,
    Right,
    Top,
}

/// How a game list is laid out on the page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "kebab-case")]
pub enum DisplayModel {
    Horizontal {
        games: Vec<Game>,
    },
    Grid {
        games: Vec<Game>,
        rows: usize,
        columns: usize,
    },
    SingleRow {
        games: Vec<Game>,
        columns: usize,
    },
    Featured {
        placement: FeaturedPlacement,
        featured: Box<Game>,
        games: Vec<Game>,
    },
}

impl DisplayModel {
    /// Every game the model renders, featured slot first.
    pub fn games(&self) -> Vec<&Game> {
        match self {
            DisplayModel::Horizontal { games }
            | DisplayModel::Grid { games, .. }
            | DisplayModel::SingleRow { games, .. } => games.iter().collect(),
            DisplayModel::Featured {
                featured, games, ..
            } => std::iter::once(featured.as_ref()).chain(games.iter()).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OmissionReason {
    /// The section's query matched nothing.
    Empty,
    /// An external source failed or timed out.
    SourceUnavailable,
    /// The authored block could not be decoded.
    InvalidConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmittedSection {
    pub position: usize,
    /// Unset when the block's `blockType` is not one this service renders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SectionKind>,
    pub reason: OmissionReason,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselSettings {
    pub auto_play: bool,
    pub auto_play_interval: u64,
    pub show_dots: bool,
    pub show_arrows: bool,
    pub height: CarouselHeight,
}

impl From<&CarouselConfig> for CarouselSettings {
    fn from(config: &CarouselConfig) -> Self {
        Self {
            auto_play: config.auto_play,
            auto_play_interval: config.auto_play_interval,
            show_dots: config.show_dots,
            show_arrows: config.show_arrows,
            height: config.height,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedSettings {
    pub card_size: CardSize,
    pub show_scroll_buttons: bool,
}

impl From<&SuggestedGamesConfig> for SuggestedSettings {
    fn from(config: &SuggestedGamesConfig) -> Self {
        Self {
            card_size: config.card_size,
            show_scroll_buttons: config.show_scroll_buttons,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    pub card_size: CardSize,
    pub show_jackpot: bool,
    pub show_provider: bool,
    pub show_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_link: Option<String>,
}

impl From<&GameGridConfig> for GridSettings {
    fn from(config: &GameGridConfig) -> Self {
        Self {
            card_size: config.card_size,
            show_jackpot: config.show_jackpot,
            show_provider: config.show_provider,
            show_more: config.show_more,
            more_link: config.more_link.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerSettings {
    pub size: BannerSize,
    pub alignment: Alignment,
    pub show_countdown: bool,
    pub rounded: bool,
    pub show_overlay: bool,
    pub margin_top: u32,
    pub margin_bottom: u32,
}

impl From<&BannerConfig> for BannerSettings {
    fn from(config: &BannerConfig) -> Self {
        Self {
            size: config.size,
            alignment: config.alignment,
            show_countdown: config.show_countdown,
            rounded: config.rounded,
            show_overlay: config.show_overlay,
            margin_top: config.margin_top,
            margin_bottom: config.margin_bottom,
        }
    }
}
