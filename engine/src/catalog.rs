//! Shared catalog primitives used by several section variants.

use crate::{source::CatalogSource, Result};
use casino_lobby_types::{Game, GameQuery, Ref};
use std::collections::{HashMap, HashSet};

/// Most popular enabled games.
pub async fn popular(catalog: &dyn CatalogSource, limit: usize) -> Result<Vec<Game>> {
    query(catalog, &GameQuery::popular(limit)).await
}

/// Runs a catalog query and normalizes the result: non-matching entries are
/// dropped, the order is made total (`id` tie-break) and the page is capped.
pub async fn query(catalog: &dyn CatalogSource, query: &GameQuery) -> Result<Vec<Game>> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }
    let mut games = catalog.query(query).await?;
    games.retain(|game| query.matches(game));
    games.sort_by(|a, b| query.sort.compare(a, b));
    games.truncate(query.limit);
    Ok(games)
}

/// Enabled games for `ids`, in the order of `ids`.
///
/// Unknown or disabled ids are skipped. Duplicate ids yield duplicate games.
pub async fn resolve_by_ids(catalog: &dyn CatalogSource, ids: &[String]) -> Result<Vec<Game>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let found = catalog.by_ids(&unique(ids)).await?;
    Ok(arrange(ids, &found, |game| &game.id))
}

/// Enabled games for `slugs`, in the order of `slugs`. Same contract as
/// [`resolve_by_ids`].
pub async fn resolve_by_slugs(
    catalog: &dyn CatalogSource,
    slugs: &[String],
) -> Result<Vec<Game>> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }
    let found = catalog.by_slugs(&unique(slugs)).await?;
    Ok(arrange(slugs, &found, |game| &game.slug))
}

/// Resolves a relationship list. Inlined documents are used as-is (if
/// enabled); bare ids are looked up in a single batch.
pub async fn resolve_refs(catalog: &dyn CatalogSource, refs: &[Ref<Game>]) -> Result<Vec<Game>> {
    let ids: Vec<String> = refs
        .iter()
        .filter_map(|entry| match entry {
            Ref::Id(id) => Some(id.clone()),
            Ref::Doc(_) => None,
        })
        .collect();
    let found = if ids.is_empty() {
        Vec::new()
    } else {
        catalog.by_ids(&unique(&ids)).await?
    };
    let index = enabled_index(&found, |game| &game.id);

    Ok(refs
        .iter()
        .filter_map(|entry| match entry {
            Ref::Doc(game) => game.is_enabled().then(|| (**game).clone()),
            Ref::Id(id) => index.get(id.as_str()).map(|game| (*game).clone()),
        })
        .collect())
}

fn unique(keys: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}

fn enabled_index<'a>(
    games: &'a [Game],
    key: impl Fn(&'a Game) -> &'a String,
) -> HashMap<&'a str, &'a Game> {
    games
        .iter()
        .filter(|game| game.is_enabled())
        .map(|game| (key(game).as_str(), game))
        .collect()
}

fn arrange<'a>(
    keys: &[String],
    found: &'a [Game],
    key: impl Fn(&'a Game) -> &'a String,
) -> Vec<Game> {
    let index = enabled_index(found, key);
    keys.iter()
        .filter_map(|key| index.get(key.as_str()).map(|game| (*game).clone()))
        .collect()
}
