//! Scan job database queries.
//!
//! Jobs only exist while queued or scanning; completed jobs are removed.
//! A process restart coerces any `scanning` job back to `queued`.

use chrono::{DateTime, Utc};
use mediashelf_common::{Error, IndexId, Result, ScanJobId};
use rusqlite::Connection;

use crate::models::{ScanJob, ScanJobStatus};

const JOB_COLUMNS: &str = "id, index_id, status, created_at, started_at";

fn map_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanJob> {
    let started_at: Option<i64> = row.get(4)?;

    Ok(ScanJob {
        id: ScanJobId::parse(&row.get::<_, String>(0)?).unwrap(),
        index_id: IndexId::parse(&row.get::<_, String>(1)?).unwrap(),
        status: row.get::<_, String>(2)?.parse().unwrap(),
        created_at: DateTime::from_timestamp(row.get(3)?, 0).unwrap_or_default(),
        started_at: started_at.and_then(|s| DateTime::from_timestamp(s, 0)),
    })
}

/// Enqueue a scan for an index. Idempotent: if a job for the index is
/// already queued or scanning, that job is returned instead.
pub fn enqueue(conn: &Connection, index_id: IndexId, now: DateTime<Utc>) -> Result<ScanJob> {
    if let Some(existing) = active_job_for_index(conn, index_id)? {
        return Ok(existing);
    }

    let job = ScanJob {
        id: ScanJobId::new(),
        index_id,
        status: ScanJobStatus::Queued,
        created_at: DateTime::from_timestamp(now.timestamp(), 0).unwrap_or_default(),
        started_at: None,
    };

    conn.execute(
        "INSERT INTO scan_jobs (id, index_id, status, created_at) VALUES (:id, :index, :status, :created_at)",
        rusqlite::named_params! {
            ":id": job.id.to_string(),
            ":index": index_id.to_string(),
            ":status": job.status.to_string(),
            ":created_at": job.created_at.timestamp(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(job)
}

/// Get the queued or scanning job for an index, if any.
pub fn active_job_for_index(conn: &Connection, index_id: IndexId) -> Result<Option<ScanJob>> {
    let result = conn.query_row(
        &format!(
            "SELECT {} FROM scan_jobs WHERE index_id = :index LIMIT 1",
            JOB_COLUMNS
        ),
        rusqlite::named_params! { ":index": index_id.to_string() },
        map_job,
    );

    match result {
        Ok(job) => Ok(Some(job)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Pop the oldest queued job, if any.
pub fn next_queued(conn: &Connection) -> Result<Option<ScanJob>> {
    let result = conn.query_row(
        &format!(
            "SELECT {} FROM scan_jobs WHERE status = 'queued' ORDER BY created_at ASC LIMIT 1",
            JOB_COLUMNS
        ),
        [],
        map_job,
    );

    match result {
        Ok(job) => Ok(Some(job)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Mark a job as scanning and stamp its start time.
pub fn mark_scanning(conn: &Connection, id: ScanJobId, now: DateTime<Utc>) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE scan_jobs SET status = 'scanning', started_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":now": now.timestamp(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("scan job"));
    }

    Ok(())
}

/// Remove a finished (or abandoned) job.
pub fn remove(conn: &Connection, id: ScanJobId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM scan_jobs WHERE id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows > 0)
}

/// Coerce jobs left in `scanning` by a crashed process back to `queued`.
///
/// Returns the number of jobs reset.
pub fn reset_orphaned(conn: &Connection) -> Result<usize> {
    conn.execute(
        "UPDATE scan_jobs SET status = 'queued', started_at = NULL WHERE status = 'scanning'",
        [],
    )
    .map_err(|e| Error::database(e.to_string()))
}
