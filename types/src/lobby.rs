//! Lobby layouts and the section blocks they are built from.
//!
//! A layout is an ordered list of [`SectionConfig`] blocks. Each block is one
//! of a closed set of variants, tagged on the wire by `blockType`. Fields that
//! do not belong to the active variant are ignored rather than rejected, which
//! matches how the CMS keeps stale values around when an editor switches a
//! block's filter or display style.

use crate::{null_as_default, wire_enum, Game, GameType, Promotion, Ref};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Web,
    Mobile,
}

wire_enum!(Platform, "platform", {
    Web => "web",
    Mobile => "mobile",
});

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarouselHeight {
    Small,
    Medium,
    #[default]
    Large,
    Full,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerSize {
    Small,
    Medium,
    #[default]
    Large,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Manual,
    Type,
    Tag,
    #[default]
    Popular,
    New,
    Jackpot,
    Featured,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedMode {
    Manual,
    #[default]
    Personalized,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayStyle {
    #[default]
    Horizontal,
    Grid,
    SingleRow,
    FeaturedLeft,
    FeaturedRight,
    FeaturedTop,
}

/// Grid column count. The CMS stores it as a select of `"4"`, `"5"` or `"6"`;
/// fixture files usually write a plain number. Both are accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Columns {
    Four,
    Five,
    #[default]
    Six,
}

impl Columns {
    pub fn get(self) -> usize {
        match self {
            Columns::Four => 4,
            Columns::Five => 5,
            Columns::Six => 6,
        }
    }

    fn from_count(count: u64) -> Option<Self> {
        match count {
            4 => Some(Columns::Four),
            5 => Some(Columns::Five),
            6 => Some(Columns::Six),
            _ => None,
        }
    }
}

impl Serialize for Columns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.get() as u64)
    }
}

impl<'de> Deserialize<'de> for Columns {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnsVisitor;

        impl de::Visitor<'_> for ColumnsVisitor {
            type Value = Columns;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a column count of 4, 5 or 6")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Columns, E> {
                Columns::from_count(value)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Columns, E> {
                u64::try_from(value)
                    .ok()
                    .and_then(Columns::from_count)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Signed(value), &self))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Columns, E> {
                value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .and_then(Columns::from_count)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_any(ColumnsVisitor)
    }
}

fn default_true() -> bool {
    true
}

fn default_auto_play_interval() -> u64 {
    5_000
}

fn default_suggested_placement() -> String {
    "suggested".to_string()
}

fn default_suggested_limit() -> usize {
    10
}

fn default_grid_limit() -> usize {
    12
}

fn default_rows() -> usize {
    2
}

fn default_margin() -> u32 {
    24
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Explicit promotions in display order. Empty means "query hero
    /// promotions".
    #[serde(default, deserialize_with = "null_as_default")]
    pub promotions: Vec<Ref<Promotion>>,
    #[serde(default = "default_true")]
    pub auto_play: bool,
    #[serde(default = "default_auto_play_interval")]
    pub auto_play_interval: u64,
    #[serde(default = "default_true")]
    pub show_dots: bool,
    #[serde(default = "default_true")]
    pub show_arrows: bool,
    #[serde(default)]
    pub height: CarouselHeight,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            title: None,
            promotions: Vec::new(),
            auto_play: true,
            auto_play_interval: default_auto_play_interval(),
            show_dots: true,
            show_arrows: true,
            height: CarouselHeight::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedGamesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub mode: SuggestedMode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub manual_games: Vec<Ref<Game>>,
    #[serde(default = "default_suggested_placement")]
    pub placement: String,
    #[serde(default = "default_suggested_limit")]
    pub limit: usize,
    #[serde(default = "default_true")]
    pub fallback_to_popular: bool,
    #[serde(default = "default_true")]
    pub show_scroll_buttons: bool,
    #[serde(default)]
    pub card_size: CardSize,
}

impl Default for SuggestedGamesConfig {
    fn default() -> Self {
        Self {
            title: None,
            subtitle: None,
            mode: SuggestedMode::default(),
            manual_games: Vec::new(),
            placement: default_suggested_placement(),
            limit: default_suggested_limit(),
            fallback_to_popular: true,
            show_scroll_buttons: true,
            card_size: CardSize::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameGridConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub filter_type: FilterType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub manual_games: Vec<Ref<Game>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<GameType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub display_style: DisplayStyle,
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_game: Option<Ref<Game>>,
    #[serde(default = "default_grid_limit")]
    pub limit: usize,
    #[serde(default)]
    pub columns: Columns,
    #[serde(default = "default_true")]
    pub show_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_link: Option<String>,
    #[serde(default)]
    pub card_size: CardSize,
    #[serde(default = "default_true")]
    pub show_jackpot: bool,
    #[serde(default = "default_true")]
    pub show_provider: bool,
}

impl Default for GameGridConfig {
    fn default() -> Self {
        Self {
            title: None,
            subtitle: None,
            filter_type: FilterType::default(),
            manual_games: Vec::new(),
            game_type: None,
            tag: None,
            display_style: DisplayStyle::default(),
            rows: default_rows(),
            featured_game: None,
            limit: default_grid_limit(),
            columns: Columns::default(),
            show_more: true,
            more_link: None,
            card_size: CardSize::default(),
            show_jackpot: true,
            show_provider: true,
        }
    }
}

impl GameGridConfig {
    /// The featured game's identifier, whether the CMS populated the
    /// relationship or not.
    pub fn featured_game_id(&self) -> Option<&str> {
        self.featured_game.as_ref().map(Ref::id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerConfig {
    /// Explicit promotion. When unset the highest-priority live banner
    /// promotion is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Ref<Promotion>>,
    #[serde(default)]
    pub size: BannerSize,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_true")]
    pub show_countdown: bool,
    #[serde(default = "default_true")]
    pub rounded: bool,
    #[serde(default = "default_true")]
    pub show_overlay: bool,
    #[serde(default = "default_margin")]
    pub margin_top: u32,
    #[serde(default = "default_margin")]
    pub margin_bottom: u32,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            promotion: None,
            size: BannerSize::default(),
            alignment: Alignment::default(),
            show_countdown: true,
            rounded: true,
            show_overlay: true,
            margin_top: default_margin(),
            margin_bottom: default_margin(),
        }
    }
}

/// One block of a lobby layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "blockType")]
pub enum SectionConfig {
    #[serde(rename = "carousel-section")]
    Carousel(CarouselConfig),
    #[serde(rename = "suggested-games-section")]
    SuggestedGames(SuggestedGamesConfig),
    #[serde(rename = "game-grid-section")]
    GameGrid(GameGridConfig),
    #[serde(rename = "banner-section")]
    Banner(BannerConfig),
}

impl SectionConfig {
    pub fn kind(&self) -> SectionKind {
        match self {
            SectionConfig::Carousel(_) => SectionKind::Carousel,
            SectionConfig::SuggestedGames(_) => SectionKind::SuggestedGames,
            SectionConfig::GameGrid(_) => SectionKind::GameGrid,
            SectionConfig::Banner(_) => SectionKind::Banner,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            SectionConfig::Carousel(config) => config.title.as_deref(),
            SectionConfig::SuggestedGames(config) => config.title.as_deref(),
            SectionConfig::GameGrid(config) => config.title.as_deref(),
            SectionConfig::Banner(_) => None,
        }
    }

    pub fn subtitle(&self) -> Option<&str> {
        match self {
            SectionConfig::SuggestedGames(config) => config.subtitle.as_deref(),
            SectionConfig::GameGrid(config) => config.subtitle.as_deref(),
            SectionConfig::Carousel(_) | SectionConfig::Banner(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Carousel,
    SuggestedGames,
    GameGrid,
    Banner,
}

wire_enum!(SectionKind, "section kind", {
    Carousel => "carousel",
    SuggestedGames => "suggested-games",
    GameGrid => "game-grid",
    Banner => "banner",
});

impl SectionKind {
    /// The kind named by a CMS `blockType` tag.
    pub fn from_block_type(block_type: &str) -> Option<Self> {
        match block_type {
            "carousel-section" => Some(SectionKind::Carousel),
            "suggested-games-section" => Some(SectionKind::SuggestedGames),
            "game-grid-section" => Some(SectionKind::GameGrid),
            "banner-section" => Some(SectionKind::Banner),
            _ => None,
        }
    }
}

/// A block that did not decode into a [`SectionConfig`].
///
/// The raw document is kept so the layout serializes back unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidBlock {
    pub block_type: Option<String>,
    pub error: String,
    raw: serde_json::Value,
}

impl InvalidBlock {
    pub fn kind(&self) -> Option<SectionKind> {
        self.block_type
            .as_deref()
            .and_then(SectionKind::from_block_type)
    }
}

/// One authored entry of a layout's `sections` array.
///
/// Blocks are decoded one at a time, so an unknown `blockType` or a malformed
/// field only invalidates its own entry.
#[derive(Clone, Debug, PartialEq)]
pub enum SectionBlock {
    Section(SectionConfig),
    Invalid(InvalidBlock),
}

impl SectionBlock {
    pub fn config(&self) -> Option<&SectionConfig> {
        match self {
            SectionBlock::Section(config) => Some(config),
            SectionBlock::Invalid(_) => None,
        }
    }

    pub fn kind(&self) -> Option<SectionKind> {
        match self {
            SectionBlock::Section(config) => Some(config.kind()),
            SectionBlock::Invalid(block) => block.kind(),
        }
    }
}

impl From<SectionConfig> for SectionBlock {
    fn from(config: SectionConfig) -> Self {
        SectionBlock::Section(config)
    }
}

impl Serialize for SectionBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SectionBlock::Section(config) => config.serialize(serializer),
            SectionBlock::Invalid(block) => block.raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SectionBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match SectionConfig::deserialize(&raw) {
            Ok(config) => Ok(SectionBlock::Section(config)),
            Err(err) => Ok(SectionBlock::Invalid(InvalidBlock {
                block_type: raw
                    .get("blockType")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string),
                error: err.to_string(),
                raw,
            })),
        }
    }
}

/// An ordered page of sections for one platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyLayout {
    #[serde(default)]
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub name: String,
    pub platform: Platform,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<SectionBlock>,
}
