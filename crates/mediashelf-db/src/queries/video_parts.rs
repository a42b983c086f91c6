//! Video part database queries.
//!
//! Parts are unique by path; `(size, fast_hash)` is the identity key the
//! scanner uses to recognise a file across renames and moves.

use chrono::{DateTime, Utc};
use mediashelf_common::{Error, IndexId, PartId, Result, VersionId};
use rusqlite::Connection;

use crate::models::VideoPart;

const PART_COLUMNS: &str =
    "id, version_id, path, size, mtime, part_index, fast_hash, created_at, updated_at";

fn map_part(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoPart> {
    Ok(VideoPart {
        id: PartId::parse(&row.get::<_, String>(0)?).unwrap(),
        version_id: VersionId::parse(&row.get::<_, String>(1)?).unwrap(),
        path: row.get(2)?,
        size: row.get(3)?,
        mtime: row.get(4)?,
        part_index: row.get(5)?,
        fast_hash: row.get(6)?,
        created_at: DateTime::from_timestamp(row.get(7)?, 0).unwrap_or_default(),
        updated_at: DateTime::from_timestamp(row.get(8)?, 0).unwrap_or_default(),
    })
}

/// Insert a new part. Violating path uniqueness is a programmer error
/// upstream (the classifier and tracker must have prevented it) and
/// surfaces as a database error.
pub fn insert_part(conn: &Connection, part: &VideoPart) -> Result<()> {
    conn.execute(
        "INSERT INTO video_parts (id, version_id, path, size, mtime, part_index, fast_hash, created_at, updated_at)
         VALUES (:id, :version_id, :path, :size, :mtime, :part_index, :fast_hash, :created_at, :updated_at)",
        rusqlite::named_params! {
            ":id": part.id.to_string(),
            ":version_id": part.version_id.to_string(),
            ":path": part.path,
            ":size": part.size,
            ":mtime": part.mtime,
            ":part_index": part.part_index,
            ":fast_hash": part.fast_hash,
            ":created_at": part.created_at.timestamp(),
            ":updated_at": part.updated_at.timestamp(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Get a part by ID.
pub fn get_part(conn: &Connection, id: PartId) -> Result<Option<VideoPart>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM video_parts WHERE id = :id", PART_COLUMNS),
        rusqlite::named_params! { ":id": id.to_string() },
        map_part,
    );

    match result {
        Ok(part) => Ok(Some(part)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a part by its (unique) path.
pub fn find_by_path(conn: &Connection, path: &str) -> Result<Option<VideoPart>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM video_parts WHERE path = :path", PART_COLUMNS),
        rusqlite::named_params! { ":path": path },
        map_part,
    );

    match result {
        Ok(part) => Ok(Some(part)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Look up parts matching an identity key within one index. Uses the
/// composite `(size, fast_hash)` index and joins up the ownership chain to
/// scope by index.
pub fn find_by_identity(
    conn: &Connection,
    index_id: IndexId,
    size: i64,
    fast_hash: &str,
) -> Result<Vec<VideoPart>> {
    let columns: String = PART_COLUMNS
        .split(", ")
        .map(|c| format!("p.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM video_parts p
             JOIN video_versions v ON v.id = p.version_id
             JOIN video_items i ON i.id = v.item_id
             WHERE p.size = :size AND p.fast_hash = :fast_hash AND i.index_id = :index
             ORDER BY p.created_at ASC",
            columns
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let parts = stmt
        .query_map(
            rusqlite::named_params! {
                ":size": size,
                ":fast_hash": fast_hash,
                ":index": index_id.to_string(),
            },
            map_part,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(parts)
}

/// Get all parts of a version, ordered by part index.
pub fn parts_of_version(conn: &Connection, version_id: VersionId) -> Result<Vec<VideoPart>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM video_parts WHERE version_id = :version ORDER BY part_index ASC",
            PART_COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let parts = stmt
        .query_map(
            rusqlite::named_params! { ":version": version_id.to_string() },
            map_part,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(parts)
}

/// Update a part's path and mtime after the backing file moved. Also
/// touches `updated_at` so the part survives the cleanup pass.
pub fn update_path(
    conn: &Connection,
    id: PartId,
    new_path: &str,
    new_mtime: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE video_parts SET path = :path, mtime = :mtime, updated_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":path": new_path,
                ":mtime": new_mtime,
                ":now": now.timestamp(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("video part"));
    }

    Ok(())
}

/// Update a part's mtime (path unchanged). Touches `updated_at`.
pub fn update_mtime(conn: &Connection, id: PartId, mtime: i64, now: DateTime<Utc>) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE video_parts SET mtime = :mtime, updated_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":mtime": mtime,
                ":now": now.timestamp(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("video part"));
    }

    Ok(())
}

/// Refresh a part's identity fields after the file at its path was
/// replaced with different content. Touches `updated_at`.
pub fn update_identity(
    conn: &Connection,
    id: PartId,
    size: i64,
    mtime: i64,
    fast_hash: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE video_parts SET size = :size, mtime = :mtime, fast_hash = :fast_hash, updated_at = :now
             WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":size": size,
                ":mtime": mtime,
                ":fast_hash": fast_hash,
                ":now": now.timestamp(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("video part"));
    }

    Ok(())
}

/// Touch a part's `updated_at`, marking it as observed by the current scan.
pub fn touch(conn: &Connection, id: PartId, now: DateTime<Utc>) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE video_parts SET updated_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":now": now.timestamp(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("video part"));
    }

    Ok(())
}

/// Move a part to another version.
pub fn update_version(conn: &Connection, id: PartId, version_id: VersionId) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE video_parts SET version_id = :version WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":version": version_id.to_string(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("video part"));
    }

    Ok(())
}

/// Delete a part unconditionally.
pub fn delete_part(conn: &Connection, id: PartId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM video_parts WHERE id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows > 0)
}

/// Parts of an index whose `updated_at` predates `cutoff`: candidates for
/// deleted-file cleanup after a fully successful walk.
pub fn stale_parts(
    conn: &Connection,
    index_id: IndexId,
    cutoff: DateTime<Utc>,
) -> Result<Vec<VideoPart>> {
    let columns: String = PART_COLUMNS
        .split(", ")
        .map(|c| format!("p.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM video_parts p
             JOIN video_versions v ON v.id = p.version_id
             JOIN video_items i ON i.id = v.item_id
             WHERE i.index_id = :index AND p.updated_at < :cutoff",
            columns
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let parts = stmt
        .query_map(
            rusqlite::named_params! {
                ":index": index_id.to_string(),
                ":cutoff": cutoff.timestamp(),
            },
            map_part,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(parts)
}
