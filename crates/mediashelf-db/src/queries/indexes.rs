//! Index database queries.
//!
//! CRUD operations for media indexes (named collections of root folders)
//! plus the persisted scan-status lifecycle.

use chrono::{DateTime, Utc};
use mediashelf_common::{Error, IndexId, MediaType, Result, ScanStatus};
use rusqlite::Connection;

use crate::models::Index;

fn map_index(row: &rusqlite::Row<'_>) -> rusqlite::Result<Index> {
    let folders_json: String = row.get(3)?;
    let folders: Vec<String> = serde_json::from_str(&folders_json).unwrap_or_default();
    let last_scanned_at: Option<i64> = row.get(5)?;

    Ok(Index {
        id: IndexId::parse(&row.get::<_, String>(0)?).unwrap(),
        name: row.get(1)?,
        media_type: row.get::<_, String>(2)?.parse().unwrap(),
        folders,
        scan_status: row.get::<_, String>(4)?.parse().unwrap(),
        last_scanned_at: last_scanned_at.and_then(|s| DateTime::from_timestamp(s, 0)),
        created_at: DateTime::from_timestamp(row.get(6)?, 0).unwrap_or_default(),
    })
}

const INDEX_COLUMNS: &str =
    "id, name, media_type, folders, scan_status, last_scanned_at, created_at";

/// Create a new index.
pub fn create_index(
    conn: &Connection,
    name: &str,
    media_type: MediaType,
    folders: &[String],
) -> Result<Index> {
    let id = IndexId::new();
    let created_at = Utc::now();
    let folders_json =
        serde_json::to_string(folders).map_err(|e| Error::internal(e.to_string()))?;

    conn.execute(
        "INSERT INTO indexes (id, name, media_type, folders, scan_status, created_at)
         VALUES (:id, :name, :media_type, :folders, :scan_status, :created_at)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":name": name,
            ":media_type": media_type.to_string(),
            ":folders": folders_json,
            ":scan_status": ScanStatus::Idle.to_string(),
            ":created_at": created_at.timestamp(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Index {
        id,
        name: name.to_string(),
        media_type,
        folders: folders.to_vec(),
        scan_status: ScanStatus::Idle,
        last_scanned_at: None,
        created_at: DateTime::from_timestamp(created_at.timestamp(), 0).unwrap_or_default(),
    })
}

/// Get an index by ID.
pub fn get_index(conn: &Connection, id: IndexId) -> Result<Option<Index>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM indexes WHERE id = :id", INDEX_COLUMNS),
        rusqlite::named_params! { ":id": id.to_string() },
        map_index,
    );

    match result {
        Ok(index) => Ok(Some(index)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get an index by name.
pub fn get_index_by_name(conn: &Connection, name: &str) -> Result<Option<Index>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM indexes WHERE name = :name", INDEX_COLUMNS),
        rusqlite::named_params! { ":name": name },
        map_index,
    );

    match result {
        Ok(index) => Ok(Some(index)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all indexes, sorted by name.
pub fn list_indexes(conn: &Connection) -> Result<Vec<Index>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM indexes ORDER BY name",
            INDEX_COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let indexes = stmt
        .query_map([], map_index)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(indexes)
}

/// Update the root folders of an index.
pub fn update_folders(conn: &Connection, id: IndexId, folders: &[String]) -> Result<()> {
    let folders_json =
        serde_json::to_string(folders).map_err(|e| Error::internal(e.to_string()))?;

    let rows = conn
        .execute(
            "UPDATE indexes SET folders = :folders WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":folders": folders_json,
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("index"));
    }

    Ok(())
}

/// Update the persisted scan status of an index.
pub fn update_scan_status(conn: &Connection, id: IndexId, status: ScanStatus) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE indexes SET scan_status = :status WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":status": status.to_string(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("index"));
    }

    Ok(())
}

/// Return the index to idle and stamp its last successful scan time.
pub fn mark_scanned(conn: &Connection, id: IndexId, at: DateTime<Utc>) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE indexes SET scan_status = 'idle', last_scanned_at = :at WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":at": at.timestamp(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("index"));
    }

    Ok(())
}

/// Coerce any index left in `scanning` by a crashed process back to `queued`.
///
/// Returns the number of indexes reset.
pub fn reset_interrupted(conn: &Connection) -> Result<usize> {
    conn.execute(
        "UPDATE indexes SET scan_status = 'queued' WHERE scan_status = 'scanning'",
        [],
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Delete an index (cascades to its items, versions and parts).
pub fn delete_index(conn: &Connection, id: IndexId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM indexes WHERE id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    #[test]
    fn test_create_and_get_index() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let folders = vec!["/media/tv".to_string(), "/media/movies".to_string()];
        let index = create_index(&conn, "Videos", MediaType::Videos, &folders).unwrap();

        assert_eq!(index.name, "Videos");
        assert_eq!(index.media_type, MediaType::Videos);
        assert_eq!(index.scan_status, ScanStatus::Idle);
        assert!(index.last_scanned_at.is_none());

        let found = get_index(&conn, index.id).unwrap().unwrap();
        assert_eq!(found, index);
    }

    #[test]
    fn test_get_index_not_found() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        assert!(get_index(&conn, IndexId::new()).unwrap().is_none());
        assert!(get_index_by_name(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_list_indexes_sorted() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        create_index(&conn, "Videos", MediaType::Videos, &[]).unwrap();
        create_index(&conn, "Audio", MediaType::Audio, &[]).unwrap();
        create_index(&conn, "Photos", MediaType::Photos, &[]).unwrap();

        let names: Vec<_> = list_indexes(&conn)
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Audio", "Photos", "Videos"]);
    }

    #[test]
    fn test_update_folders() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let index = create_index(&conn, "Videos", MediaType::Videos, &[]).unwrap();
        let folders = vec!["/new/root".to_string()];
        update_folders(&conn, index.id, &folders).unwrap();

        let updated = get_index(&conn, index.id).unwrap().unwrap();
        assert_eq!(updated.folders, folders);
    }

    #[test]
    fn test_scan_status_lifecycle() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let index = create_index(&conn, "Videos", MediaType::Videos, &[]).unwrap();

        update_scan_status(&conn, index.id, ScanStatus::Queued).unwrap();
        update_scan_status(&conn, index.id, ScanStatus::Scanning).unwrap();
        assert_eq!(
            get_index(&conn, index.id).unwrap().unwrap().scan_status,
            ScanStatus::Scanning
        );

        let at = Utc::now();
        mark_scanned(&conn, index.id, at).unwrap();
        let done = get_index(&conn, index.id).unwrap().unwrap();
        assert_eq!(done.scan_status, ScanStatus::Idle);
        assert_eq!(done.last_scanned_at.unwrap().timestamp(), at.timestamp());
    }

    #[test]
    fn test_reset_interrupted() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let a = create_index(&conn, "A", MediaType::Videos, &[]).unwrap();
        let b = create_index(&conn, "B", MediaType::Videos, &[]).unwrap();
        update_scan_status(&conn, a.id, ScanStatus::Scanning).unwrap();

        assert_eq!(reset_interrupted(&conn).unwrap(), 1);
        assert_eq!(
            get_index(&conn, a.id).unwrap().unwrap().scan_status,
            ScanStatus::Queued
        );
        assert_eq!(
            get_index(&conn, b.id).unwrap().unwrap().scan_status,
            ScanStatus::Idle
        );
    }

    #[test]
    fn test_delete_index() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let index = create_index(&conn, "Videos", MediaType::Videos, &[]).unwrap();
        assert!(delete_index(&conn, index.id).unwrap());
        assert!(!delete_index(&conn, index.id).unwrap());
        assert!(get_index(&conn, index.id).unwrap().is_none());
    }
}
