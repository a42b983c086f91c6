//! Video item database queries.
//!
//! CRUD and hierarchy operations for video items: lookups by source path,
//! parent/number navigation, the idempotent show→season→episode upsert, and
//! bottom-up pruning of emptied items.

use chrono::{DateTime, Utc};
use mediashelf_common::{Error, IndexId, ItemId, ItemKind, PartId, Result};
use rusqlite::Connection;

use crate::models::VideoItem;

const ITEM_COLUMNS: &str = "id, index_id, parent_id, kind, title, sort_title, year, number, \
                            source_path, metadata, added_at, latest_added_at";

fn map_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoItem> {
    let parent_id: Option<String> = row.get(2)?;
    let metadata_json: String = row.get(9)?;

    Ok(VideoItem {
        id: ItemId::parse(&row.get::<_, String>(0)?).unwrap(),
        index_id: IndexId::parse(&row.get::<_, String>(1)?).unwrap(),
        parent_id: parent_id.map(|p| ItemId::parse(&p).unwrap()),
        kind: row.get::<_, String>(3)?.parse().unwrap(),
        title: row.get(4)?,
        sort_title: row.get(5)?,
        year: row.get(6)?,
        number: row.get(7)?,
        source_path: row.get(8)?,
        metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
        added_at: DateTime::from_timestamp(row.get(10)?, 0).unwrap_or_default(),
        latest_added_at: DateTime::from_timestamp(row.get(11)?, 0).unwrap_or_default(),
    })
}

/// Insert a new item.
pub fn insert_item(conn: &Connection, item: &VideoItem) -> Result<()> {
    let metadata_json =
        serde_json::to_string(&item.metadata).map_err(|e| Error::internal(e.to_string()))?;

    conn.execute(
        "INSERT INTO video_items (
            id, index_id, parent_id, kind, title, sort_title, year, number,
            source_path, metadata, added_at, latest_added_at
         ) VALUES (
            :id, :index_id, :parent_id, :kind, :title, :sort_title, :year, :number,
            :source_path, :metadata, :added_at, :latest_added_at
         )",
        rusqlite::named_params! {
            ":id": item.id.to_string(),
            ":index_id": item.index_id.to_string(),
            ":parent_id": item.parent_id.map(|p| p.to_string()),
            ":kind": item.kind.to_string(),
            ":title": item.title,
            ":sort_title": item.sort_title,
            ":year": item.year,
            ":number": item.number,
            ":source_path": item.source_path,
            ":metadata": metadata_json,
            ":added_at": item.added_at.timestamp(),
            ":latest_added_at": item.latest_added_at.timestamp(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Get an item by ID.
pub fn get_item(conn: &Connection, id: ItemId) -> Result<Option<VideoItem>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM video_items WHERE id = :id", ITEM_COLUMNS),
        rusqlite::named_params! { ":id": id.to_string() },
        map_item,
    );

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get the direct children of an item, ordered by number then title.
pub fn children(conn: &Connection, parent_id: ItemId) -> Result<Vec<VideoItem>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM video_items WHERE parent_id = :parent
             ORDER BY number ASC, title ASC",
            ITEM_COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let items = stmt
        .query_map(
            rusqlite::named_params! { ":parent": parent_id.to_string() },
            map_item,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(items)
}

/// Find a child of `parent_id` with the given number. Used for both season
/// lookup (under a show) and episode lookup (under a season).
pub fn child_by_number(
    conn: &Connection,
    parent_id: ItemId,
    number: i64,
) -> Result<Option<VideoItem>> {
    let result = conn.query_row(
        &format!(
            "SELECT {} FROM video_items WHERE parent_id = :parent AND number = :number",
            ITEM_COLUMNS
        ),
        rusqlite::named_params! {
            ":parent": parent_id.to_string(),
            ":number": number,
        },
        map_item,
    );

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Find all items in an index with the given source path.
pub fn find_by_source_path(
    conn: &Connection,
    index_id: IndexId,
    source_path: &str,
) -> Result<Vec<VideoItem>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM video_items
             WHERE index_id = :index AND source_path = :source_path",
            ITEM_COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let items = stmt
        .query_map(
            rusqlite::named_params! {
                ":index": index_id.to_string(),
                ":source_path": source_path,
            },
            map_item,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(items)
}

/// Find the root item (show or movie, no parent) owning a source path.
pub fn find_owner_by_source_path(
    conn: &Connection,
    index_id: IndexId,
    source_path: &str,
) -> Result<Option<VideoItem>> {
    let result = conn.query_row(
        &format!(
            "SELECT {} FROM video_items
             WHERE index_id = :index AND source_path = :source_path AND parent_id IS NULL
             LIMIT 1",
            ITEM_COLUMNS
        ),
        rusqlite::named_params! {
            ":index": index_id.to_string(),
            ":source_path": source_path,
        },
        map_item,
    );

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Find a parentless item of the given kind by exact title.
pub fn find_root_by_title(
    conn: &Connection,
    index_id: IndexId,
    kind: ItemKind,
    title: &str,
) -> Result<Option<VideoItem>> {
    let result = conn.query_row(
        &format!(
            "SELECT {} FROM video_items
             WHERE index_id = :index AND kind = :kind AND parent_id IS NULL AND title = :title
             LIMIT 1",
            ITEM_COLUMNS
        ),
        rusqlite::named_params! {
            ":index": index_id.to_string(),
            ":kind": kind.to_string(),
            ":title": title,
        },
        map_item,
    );

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Find a movie item by title and year at index scope. `year IS :year`
/// compares NULLs equal, so year-less movies match each other.
pub fn find_movie_by_title_year(
    conn: &Connection,
    index_id: IndexId,
    title: &str,
    year: Option<i32>,
) -> Result<Option<VideoItem>> {
    let result = conn.query_row(
        &format!(
            "SELECT {} FROM video_items
             WHERE index_id = :index AND kind = 'movie' AND parent_id IS NULL
               AND title = :title AND year IS :year
             LIMIT 1",
            ITEM_COLUMNS
        ),
        rusqlite::named_params! {
            ":index": index_id.to_string(),
            ":title": title,
            ":year": year,
        },
        map_item,
    );

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Update the source path of an item.
pub fn update_source_path(conn: &Connection, id: ItemId, source_path: &str) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE video_items SET source_path = :source_path WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":source_path": source_path,
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("video item"));
    }

    Ok(())
}

/// Replace the metadata bag of an item.
pub fn update_metadata(conn: &Connection, id: ItemId, metadata: &serde_json::Value) -> Result<()> {
    let metadata_json =
        serde_json::to_string(metadata).map_err(|e| Error::internal(e.to_string()))?;

    let rows = conn
        .execute(
            "UPDATE video_items SET metadata = :metadata WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":metadata": metadata_json,
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("video item"));
    }

    Ok(())
}

/// Get the item directly owning a part (via its version).
pub fn item_of_part(conn: &Connection, part_id: PartId) -> Result<Option<VideoItem>> {
    let columns: String = ITEM_COLUMNS
        .split(", ")
        .map(|c| format!("i.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    let result = conn.query_row(
        &format!(
            "SELECT {} FROM video_items i
             JOIN video_versions v ON v.item_id = i.id
             JOIN video_parts p ON p.version_id = v.id
             WHERE p.id = :part",
            columns
        ),
        rusqlite::named_params! { ":part": part_id.to_string() },
        map_item,
    );

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Walk the parent chain of an item up to its root (the show for an
/// episode, the item itself for movies and generics).
pub fn root_ancestor(conn: &Connection, id: ItemId) -> Result<VideoItem> {
    let mut current = get_item(conn, id)?.ok_or_else(|| Error::not_found("video item"))?;
    // Bounded walk: the hierarchy is at most show -> season -> episode, but
    // guard against a corrupted parent cycle.
    for _ in 0..64 {
        match current.parent_id {
            Some(parent) => {
                current = get_item(conn, parent)?.ok_or_else(|| Error::not_found("parent item"))?;
            }
            None => return Ok(current),
        }
    }
    Err(Error::internal(format!(
        "parent chain of item {} did not terminate",
        id
    )))
}

/// Verify there is no parent cycle reachable from `id`. Debug aid.
pub fn is_ancestry_acyclic(conn: &Connection, id: ItemId) -> Result<bool> {
    let mut seen = std::collections::HashSet::new();
    let mut current = match get_item(conn, id)? {
        Some(item) => item,
        None => return Ok(true),
    };
    seen.insert(current.id);
    while let Some(parent) = current.parent_id {
        if !seen.insert(parent) {
            return Ok(false);
        }
        current = match get_item(conn, parent)? {
            Some(item) => item,
            None => return Ok(true),
        };
    }
    Ok(true)
}

/// Delete an item unconditionally.
pub fn delete_item(conn: &Connection, id: ItemId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM video_items WHERE id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows > 0)
}

fn is_empty(conn: &Connection, id: ItemId) -> Result<bool> {
    let child_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM video_items WHERE parent_id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if child_count > 0 {
        return Ok(false);
    }

    let version_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM video_versions WHERE item_id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(version_count == 0)
}

/// Delete an item if it has neither child items nor versions, then walk up
/// and prune any ancestors emptied by the deletion.
///
/// Returns whether the item itself was deleted.
pub fn delete_item_if_empty(conn: &Connection, id: ItemId) -> Result<bool> {
    delete_if_empty_inner(conn, id, None)
}

/// Like [`delete_item_if_empty`], but never deletes `stop` (used when a
/// still-live root item must be retained).
pub fn delete_item_if_empty_below(conn: &Connection, id: ItemId, stop: ItemId) -> Result<bool> {
    delete_if_empty_inner(conn, id, Some(stop))
}

fn delete_if_empty_inner(conn: &Connection, id: ItemId, stop: Option<ItemId>) -> Result<bool> {
    let mut deleted_requested = false;
    let mut current = id;

    loop {
        if Some(current) == stop {
            break;
        }
        let item = match get_item(conn, current)? {
            Some(item) => item,
            None => break,
        };
        if !is_empty(conn, current)? {
            break;
        }
        delete_item(conn, current)?;
        if current == id {
            deleted_requested = true;
        }
        match item.parent_id {
            Some(parent) => current = parent,
            None => break,
        }
    }

    Ok(deleted_requested)
}

/// Idempotent walk-or-create of a show → season → episode chain.
///
/// The show is matched by source path when one is given, falling back to a
/// title match; seasons and episodes are matched by number under their
/// parent, so re-running the same upsert never creates duplicate siblings.
/// Returns the episode's id.
#[allow(clippy::too_many_arguments)]
pub fn upsert_hierarchy(
    conn: &Connection,
    index_id: IndexId,
    show_title: &str,
    show_source_path: Option<&str>,
    season_number: i64,
    episode_number: i64,
    episode_title: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ItemId> {
    let show = match show_source_path {
        Some(source_path) => find_owner_by_source_path(conn, index_id, source_path)?,
        None => find_root_by_title(conn, index_id, ItemKind::Show, show_title)?,
    };

    let show_id = match show {
        Some(show) => show.id,
        None => {
            let mut show = VideoItem::new(index_id, ItemKind::Show, show_title, now);
            show.source_path = show_source_path.map(|s| s.to_string());
            insert_item(conn, &show)?;
            show.id
        }
    };

    let episode_id = ensure_season_episode(
        conn,
        index_id,
        show_id,
        season_number,
        episode_number,
        episode_title,
        now,
    )?;

    Ok(episode_id)
}

/// Walk-or-create a season/episode pair under an existing show.
pub fn ensure_season_episode(
    conn: &Connection,
    index_id: IndexId,
    show_id: ItemId,
    season_number: i64,
    episode_number: i64,
    episode_title: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ItemId> {
    let season_id = match child_by_number(conn, show_id, season_number)? {
        Some(season) => season.id,
        None => {
            let title = if season_number == 0 {
                "Specials".to_string()
            } else {
                format!("Season {}", season_number)
            };
            let mut season = VideoItem::new(index_id, ItemKind::Season, title, now);
            season.parent_id = Some(show_id);
            season.number = Some(season_number);
            insert_item(conn, &season)?;
            season.id
        }
    };

    let episode_id = match child_by_number(conn, season_id, episode_number)? {
        Some(episode) => episode.id,
        None => {
            let title = episode_title
                .map(|t| t.to_string())
                .unwrap_or_else(|| format!("Episode {}", episode_number));
            let mut episode = VideoItem::new(index_id, ItemKind::Episode, title, now);
            episode.parent_id = Some(season_id);
            episode.number = Some(episode_number);
            insert_item(conn, &episode)?;
            episode.id
        }
    };

    Ok(episode_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VideoPart, VideoVersion};
    use crate::pool::init_memory_pool;
    use crate::queries::{indexes, video_parts, video_versions};
    use mediashelf_common::MediaType;

    fn test_index(conn: &Connection) -> IndexId {
        indexes::create_index(conn, "Videos", MediaType::Videos, &[])
            .unwrap()
            .id
    }

    #[test]
    fn test_insert_and_get_item() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let mut item = VideoItem::new(index_id, ItemKind::Show, "Some Show", Utc::now());
        item.source_path = Some("/tv/Some Show".to_string());
        insert_item(&conn, &item).unwrap();

        let found = get_item(&conn, item.id).unwrap().unwrap();
        assert_eq!(found.title, "Some Show");
        assert_eq!(found.kind, ItemKind::Show);
        assert_eq!(found.source_path.as_deref(), Some("/tv/Some Show"));
    }

    #[test]
    fn test_upsert_hierarchy_creates_chain() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();

        let episode = get_item(&conn, episode_id).unwrap().unwrap();
        assert_eq!(episode.kind, ItemKind::Episode);
        assert_eq!(episode.number, Some(1));
        assert_eq!(episode.title, "Episode 1");

        let season = get_item(&conn, episode.parent_id.unwrap()).unwrap().unwrap();
        assert_eq!(season.kind, ItemKind::Season);
        assert_eq!(season.title, "Season 1");

        let show = get_item(&conn, season.parent_id.unwrap()).unwrap().unwrap();
        assert_eq!(show.kind, ItemKind::Show);
        assert_eq!(show.title, "Some Show");
        assert!(show.parent_id.is_none());
    }

    #[test]
    fn test_upsert_hierarchy_is_idempotent() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let first = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();
        let second = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(first, second);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM video_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3); // show + season + episode
    }

    #[test]
    fn test_upsert_hierarchy_specials_title() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            0,
            1,
            None,
            Utc::now(),
        )
        .unwrap();

        let episode = get_item(&conn, episode_id).unwrap().unwrap();
        let season = get_item(&conn, episode.parent_id.unwrap()).unwrap().unwrap();
        assert_eq!(season.title, "Specials");
        assert_eq!(season.number, Some(0));
    }

    #[test]
    fn test_child_by_number() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            None,
            2,
            5,
            Some("The One"),
            Utc::now(),
        )
        .unwrap();

        let episode = get_item(&conn, episode_id).unwrap().unwrap();
        let season_id = episode.parent_id.unwrap();

        let found = child_by_number(&conn, season_id, 5).unwrap().unwrap();
        assert_eq!(found.id, episode_id);
        assert_eq!(found.title, "The One");
        assert!(child_by_number(&conn, season_id, 6).unwrap().is_none());
    }

    #[test]
    fn test_find_owner_by_source_path() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();

        let owner = find_owner_by_source_path(&conn, index_id, "/tv/Some Show")
            .unwrap()
            .unwrap();
        assert_eq!(owner.kind, ItemKind::Show);
        assert!(find_owner_by_source_path(&conn, index_id, "/tv/Other")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_movie_by_title_year() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let mut movie = VideoItem::new(index_id, ItemKind::Movie, "Avatar", Utc::now());
        movie.year = Some(2009);
        insert_item(&conn, &movie).unwrap();

        let found = find_movie_by_title_year(&conn, index_id, "Avatar", Some(2009))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, movie.id);
        assert!(find_movie_by_title_year(&conn, index_id, "Avatar", Some(2010))
            .unwrap()
            .is_none());
        assert!(find_movie_by_title_year(&conn, index_id, "Avatar", None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_item_if_empty_prunes_ancestors() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();

        assert!(delete_item_if_empty(&conn, episode_id).unwrap());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM video_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_delete_item_if_empty_keeps_occupied() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();

        let version = VideoVersion::new(episode_id, None, Utc::now());
        video_versions::insert_version(&conn, &version).unwrap();

        assert!(!delete_item_if_empty(&conn, episode_id).unwrap());
        assert!(get_item(&conn, episode_id).unwrap().is_some());
    }

    #[test]
    fn test_delete_item_if_empty_below_retains_stop() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();
        let episode = get_item(&conn, episode_id).unwrap().unwrap();
        let season_id = episode.parent_id.unwrap();
        let show_id = get_item(&conn, season_id).unwrap().unwrap().parent_id.unwrap();

        assert!(delete_item_if_empty_below(&conn, episode_id, show_id).unwrap());
        assert!(get_item(&conn, season_id).unwrap().is_none());
        assert!(get_item(&conn, show_id).unwrap().is_some());
    }

    #[test]
    fn test_root_ancestor_and_acyclicity() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();

        let root = root_ancestor(&conn, episode_id).unwrap();
        assert_eq!(root.kind, ItemKind::Show);
        assert!(is_ancestry_acyclic(&conn, episode_id).unwrap());
    }

    #[test]
    fn test_item_of_part() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            Utc::now(),
        )
        .unwrap();
        let version = VideoVersion::new(episode_id, None, Utc::now());
        video_versions::insert_version(&conn, &version).unwrap();
        let part = VideoPart::new(version.id, "/tv/e1.mkv", 10, 0, "h", 0, Utc::now());
        video_parts::insert_part(&conn, &part).unwrap();

        let item = item_of_part(&conn, part.id).unwrap().unwrap();
        assert_eq!(item.id, episode_id);
    }

    #[test]
    fn test_latest_added_at_bubbles_to_ancestors() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let index_id = test_index(&conn);

        let early = DateTime::from_timestamp(1_000, 0).unwrap();
        let episode_id = upsert_hierarchy(
            &conn,
            index_id,
            "Some Show",
            Some("/tv/Some Show"),
            1,
            1,
            None,
            early,
        )
        .unwrap();

        // Insert a later episode; its timestamp must bubble to season and show.
        let late = DateTime::from_timestamp(2_000, 0).unwrap();
        let episode = get_item(&conn, episode_id).unwrap().unwrap();
        let season_id = episode.parent_id.unwrap();
        let show_id = get_item(&conn, season_id).unwrap().unwrap().parent_id.unwrap();

        let mut second = VideoItem::new(index_id, ItemKind::Episode, "Episode 2", late);
        second.parent_id = Some(season_id);
        second.number = Some(2);
        insert_item(&conn, &second).unwrap();

        let season = get_item(&conn, season_id).unwrap().unwrap();
        let show = get_item(&conn, show_id).unwrap().unwrap();
        assert_eq!(season.latest_added_at.timestamp(), 2_000);
        assert_eq!(show.latest_added_at.timestamp(), 2_000);
        // added_at is untouched
        assert_eq!(show.added_at.timestamp(), 1_000);
    }
}
