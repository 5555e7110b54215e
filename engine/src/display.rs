//! Partitioning of resolved game lists by display style.

use casino_lobby_types::{DisplayModel, DisplayStyle, FeaturedPlacement, Game, GameGridConfig};

/// Grid slots beside a left/right featured tile.
pub const FEATURED_SIDE_WINDOW: usize = 8;

/// Lays `items` out according to `config.display_style`.
///
/// Returns `None` when there is nothing to show.
pub fn partition(mut items: Vec<Game>, config: &GameGridConfig) -> Option<DisplayModel> {
    if items.is_empty() {
        return None;
    }
    let columns = config.columns.get();

    let model = match config.display_style {
        DisplayStyle::Horizontal => DisplayModel::Horizontal { games: items },
        DisplayStyle::SingleRow => {
            items.truncate(columns);
            DisplayModel::SingleRow {
                games: items,
                columns,
            }
        }
        DisplayStyle::Grid => {
            let rows = config.rows.max(1);
            items.truncate(rows.saturating_mul(columns));
            DisplayModel::Grid {
                games: items,
                rows,
                columns,
            }
        }
        DisplayStyle::FeaturedLeft => {
            featured(items, config, FeaturedPlacement::Left, FEATURED_SIDE_WINDOW)
        }
        DisplayStyle::FeaturedRight => {
            featured(items, config, FeaturedPlacement::Right, FEATURED_SIDE_WINDOW)
        }
        DisplayStyle::FeaturedTop => featured(items, config, FeaturedPlacement::Top, columns),
    };
    Some(model)
}

/// The featured slot is the configured game when it is among `items`, else
/// the first item. Every copy of it is removed from the grid slot.
fn featured(
    items: Vec<Game>,
    config: &GameGridConfig,
    placement: FeaturedPlacement,
    window: usize,
) -> DisplayModel {
    let position = config
        .featured_game_id()
        .and_then(|id| items.iter().position(|game| game.id == id))
        .unwrap_or(0);
    let featured = items[position].clone();
    let games = items
        .into_iter()
        .filter(|game| game.id != featured.id)
        .take(window)
        .collect();

    DisplayModel::Featured {
        placement,
        featured: Box::new(featured),
        games,
    }
}
