//! Video version database queries.

use chrono::DateTime;
use mediashelf_common::{Error, ItemId, Result, VersionId};
use rusqlite::Connection;

use crate::models::VideoVersion;

const VERSION_COLUMNS: &str = "id, item_id, edition, container, resolution, runtime_ms, created_at";

fn map_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoVersion> {
    Ok(VideoVersion {
        id: VersionId::parse(&row.get::<_, String>(0)?).unwrap(),
        item_id: ItemId::parse(&row.get::<_, String>(1)?).unwrap(),
        edition: row.get(2)?,
        container: row.get(3)?,
        resolution: row.get(4)?,
        runtime_ms: row.get(5)?,
        created_at: DateTime::from_timestamp(row.get(6)?, 0).unwrap_or_default(),
    })
}

/// Insert a new version.
pub fn insert_version(conn: &Connection, version: &VideoVersion) -> Result<()> {
    conn.execute(
        "INSERT INTO video_versions (id, item_id, edition, container, resolution, runtime_ms, created_at)
         VALUES (:id, :item_id, :edition, :container, :resolution, :runtime_ms, :created_at)",
        rusqlite::named_params! {
            ":id": version.id.to_string(),
            ":item_id": version.item_id.to_string(),
            ":edition": version.edition,
            ":container": version.container,
            ":resolution": version.resolution,
            ":runtime_ms": version.runtime_ms,
            ":created_at": version.created_at.timestamp(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Get a version by ID.
pub fn get_version(conn: &Connection, id: VersionId) -> Result<Option<VideoVersion>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM video_versions WHERE id = :id", VERSION_COLUMNS),
        rusqlite::named_params! { ":id": id.to_string() },
        map_version,
    );

    match result {
        Ok(version) => Ok(Some(version)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get all versions of an item, oldest first.
pub fn versions_of_item(conn: &Connection, item_id: ItemId) -> Result<Vec<VideoVersion>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM video_versions WHERE item_id = :item ORDER BY created_at ASC, id ASC",
            VERSION_COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let versions = stmt
        .query_map(
            rusqlite::named_params! { ":item": item_id.to_string() },
            map_version,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(versions)
}

/// Find a version of an item by edition label. `edition IS :edition`
/// compares NULLs equal, so the default (label-less) version matches itself.
pub fn find_by_edition(
    conn: &Connection,
    item_id: ItemId,
    edition: Option<&str>,
) -> Result<Option<VideoVersion>> {
    let result = conn.query_row(
        &format!(
            "SELECT {} FROM video_versions
             WHERE item_id = :item AND edition IS :edition
             LIMIT 1",
            VERSION_COLUMNS
        ),
        rusqlite::named_params! {
            ":item": item_id.to_string(),
            ":edition": edition,
        },
        map_version,
    );

    match result {
        Ok(version) => Ok(Some(version)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Move a version to another item.
pub fn update_item(conn: &Connection, id: VersionId, item_id: ItemId) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE video_versions SET item_id = :item WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":item": item_id.to_string(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("video version"));
    }

    Ok(())
}

/// Count the parts backing a version.
pub fn part_count(conn: &Connection, id: VersionId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM video_parts WHERE version_id = :id",
        rusqlite::named_params! { ":id": id.to_string() },
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Delete a version unconditionally.
pub fn delete_version(conn: &Connection, id: VersionId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM video_versions WHERE id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows > 0)
}

/// Delete a version if it no longer has any parts.
pub fn delete_version_if_empty(conn: &Connection, id: VersionId) -> Result<bool> {
    if part_count(conn, id)? > 0 {
        return Ok(false);
    }
    delete_version(conn, id)
}
