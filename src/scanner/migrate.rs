//! Migration engine.
//!
//! Handles an existing part whose file now lives under a different source
//! path than the item that owns it. Which of the four scenarios applies
//! depends on whether the old source path is still a live directory on
//! disk (`old_alive`) and whether an item already owns the new source path
//! (`new_exists`):
//!
//! | old_alive | new_exists | action |
//! |-----------|------------|--------|
//! | no        | no         | rename: move the owning root to the new source path |
//! | no        | yes        | merge: reparent the part onto the existing item, prune the old root if emptied |
//! | yes       | no         | split: create a new root for the new source path, reparent the part |
//! | yes       | yes        | move: reparent the part onto the existing item, retain the old root |
//!
//! Also hosts the intra-show reconciliation used when a file moved without
//! changing source path (e.g. from `Season 1/` into `Specials/`).

use chrono::{DateTime, Utc};
use mediashelf_common::{Error, IndexId, ItemId, ItemKind, Result};
use mediashelf_db::models::{VideoItem, VideoPart, VideoVersion};
use mediashelf_db::queries::{video_items, video_parts, video_versions};
use rusqlite::Connection;
use std::path::Path;

use super::classifier::Classification;

/// Which migration scenario was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationScenario {
    Rename,
    Merge,
    Split,
    Move,
}

/// Migrate a part whose classified source path differs from its owning
/// root's. Must run inside a caller transaction together with the part's
/// path update.
pub fn migrate_part(
    conn: &Connection,
    index_id: IndexId,
    part: &VideoPart,
    classification: &Classification,
    new_source_path: &Path,
    now: DateTime<Utc>,
) -> Result<MigrationScenario> {
    let owner = video_items::item_of_part(conn, part.id)?
        .ok_or_else(|| Error::not_found("owning item of part"))?;
    let old_root = video_items::root_ancestor(conn, owner.id)?;

    let old_alive = old_root
        .source_path
        .as_deref()
        .map(|p| Path::new(p).is_dir())
        .unwrap_or(false);

    let new_source_str = new_source_path.to_string_lossy().to_string();
    let new_owner = video_items::find_owner_by_source_path(conn, index_id, &new_source_str)?
        .filter(|item| item.id != old_root.id);

    let scenario = match (old_alive, new_owner) {
        (false, None) => {
            video_items::update_source_path(conn, old_root.id, &new_source_str)?;
            // The part stays under its root, but its placement inside the
            // root may have changed along with the move.
            reconcile_within_root(conn, index_id, &old_root, part, classification, now)?;
            MigrationScenario::Rename
        }
        (false, Some(dest_root)) => {
            let dest_leaf = resolve_leaf(conn, index_id, &dest_root, classification, now)?;
            reparent_part(conn, part, dest_leaf, now)?;
            video_items::delete_item_if_empty(conn, owner.id)?;
            MigrationScenario::Merge
        }
        (true, None) => {
            let dest_root = create_root(conn, index_id, classification, &new_source_str, now)?;
            let dest_leaf = resolve_leaf(conn, index_id, &dest_root, classification, now)?;
            reparent_part(conn, part, dest_leaf, now)?;
            video_items::delete_item_if_empty_below(conn, owner.id, old_root.id)?;
            MigrationScenario::Split
        }
        (true, Some(dest_root)) => {
            let dest_leaf = resolve_leaf(conn, index_id, &dest_root, classification, now)?;
            reparent_part(conn, part, dest_leaf, now)?;
            video_items::delete_item_if_empty_below(conn, owner.id, old_root.id)?;
            MigrationScenario::Move
        }
    };

    tracing::info!(
        "Migrated part {} to {:?} ({:?})",
        part.id,
        new_source_path,
        scenario
    );

    Ok(scenario)
}

/// Re-anchor a part inside its own root when the classified placement
/// (season/episode) no longer matches the owning item chain. Returns
/// whether anything moved.
pub fn reconcile_placement(
    conn: &Connection,
    index_id: IndexId,
    part: &VideoPart,
    classification: &Classification,
    now: DateTime<Utc>,
) -> Result<bool> {
    let owner = video_items::item_of_part(conn, part.id)?
        .ok_or_else(|| Error::not_found("owning item of part"))?;
    let root = video_items::root_ancestor(conn, owner.id)?;
    reconcile_within_root(conn, index_id, &root, part, classification, now)
}

fn reconcile_within_root(
    conn: &Connection,
    index_id: IndexId,
    root: &VideoItem,
    part: &VideoPart,
    classification: &Classification,
    now: DateTime<Utc>,
) -> Result<bool> {
    let tv = match classification {
        Classification::TvEpisode(tv) => tv,
        // Movies, generics and extras have no placement below their item.
        _ => return Ok(false),
    };

    let owner = video_items::item_of_part(conn, part.id)?
        .ok_or_else(|| Error::not_found("owning item of part"))?;

    if owner.kind == ItemKind::Episode && owner.number == Some(tv.episode) {
        if let Some(season_id) = owner.parent_id {
            let season = video_items::get_item(conn, season_id)?
                .ok_or_else(|| Error::not_found("season of episode"))?;
            if season.number == Some(tv.season) {
                return Ok(false);
            }
        }
    }

    let episode_id = video_items::ensure_season_episode(
        conn,
        index_id,
        root.id,
        tv.season,
        tv.episode,
        tv.title.as_deref(),
        now,
    )?;

    if episode_id == owner.id {
        return Ok(false);
    }

    reparent_part(conn, part, episode_id, now)?;
    video_items::delete_item_if_empty_below(conn, owner.id, root.id)?;

    Ok(true)
}

/// Resolve the destination leaf item for a migrating part: the episode
/// under a show root, or the root itself for everything else.
fn resolve_leaf(
    conn: &Connection,
    index_id: IndexId,
    dest_root: &VideoItem,
    classification: &Classification,
    now: DateTime<Utc>,
) -> Result<ItemId> {
    match classification {
        Classification::TvEpisode(tv) => video_items::ensure_season_episode(
            conn,
            index_id,
            dest_root.id,
            tv.season,
            tv.episode,
            tv.title.as_deref(),
            now,
        ),
        _ => Ok(dest_root.id),
    }
}

/// Create a fresh root item (show or movie) owning `source_path`.
fn create_root(
    conn: &Connection,
    index_id: IndexId,
    classification: &Classification,
    source_path: &str,
    now: DateTime<Utc>,
) -> Result<VideoItem> {
    let mut item = match classification {
        Classification::TvEpisode(tv) => {
            VideoItem::new(index_id, ItemKind::Show, tv.show_title.clone(), now)
        }
        Classification::Movie(movie) => {
            let mut movie_item = VideoItem::new(index_id, ItemKind::Movie, movie.title.clone(), now);
            movie_item.year = movie.year;
            movie_item
        }
        Classification::Extra(extra) => {
            VideoItem::new(index_id, ItemKind::Extra, extra.title.clone(), now)
        }
        Classification::Generic(generic) => {
            VideoItem::new(index_id, ItemKind::Video, generic.title.clone(), now)
        }
    };
    item.source_path = Some(source_path.to_string());
    video_items::insert_item(conn, &item)?;
    Ok(item)
}

/// Move a part onto another item.
///
/// If the destination already has a version with the part's edition, the
/// part joins it. Otherwise, a version with sibling parts is split (only
/// this part moves, onto a fresh version), while a single-part version
/// moves wholesale. The emptied source version is deleted.
pub fn reparent_part(
    conn: &Connection,
    part: &VideoPart,
    dest_item: ItemId,
    now: DateTime<Utc>,
) -> Result<()> {
    let src_version = video_versions::get_version(conn, part.version_id)?
        .ok_or_else(|| Error::not_found("version of part"))?;

    if src_version.item_id == dest_item {
        return Ok(());
    }

    let dest_version =
        video_versions::find_by_edition(conn, dest_item, src_version.edition.as_deref())?;

    match dest_version {
        Some(dest_version) => {
            video_parts::update_version(conn, part.id, dest_version.id)?;
        }
        None => {
            let sibling_parts = video_versions::part_count(conn, src_version.id)?;
            if sibling_parts > 1 {
                let mut version = VideoVersion::new(dest_item, src_version.edition.clone(), now);
                version.container = src_version.container.clone();
                version.resolution = src_version.resolution.clone();
                version.runtime_ms = src_version.runtime_ms;
                video_versions::insert_version(conn, &version)?;
                video_parts::update_version(conn, part.id, version.id)?;
            } else {
                video_versions::update_item(conn, src_version.id, dest_item)?;
            }
        }
    }

    video_versions::delete_version_if_empty(conn, src_version.id)?;

    Ok(())
}
