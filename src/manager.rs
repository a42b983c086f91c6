//! Scan control interface.
//!
//! The [`ScanManager`] is the surface a host (tray app, web UI, CLI) uses
//! to drive scanning: request a scan, cancel one, and read status. Requests
//! are persisted as scan jobs, so a crash mid-scan is recovered on restart;
//! cancel tokens and live progress exist only for scans currently running
//! in this process.

use chrono::Utc;
use mediashelf_common::{Error, IndexId, MediaType, Result, ScanStatus};
use mediashelf_db::models::ScanJob;
use mediashelf_db::queries::{indexes, scan_jobs};
use mediashelf_db::{get_conn, DbPool};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::scanner::{CancelToken, ScanProgress};

struct ActiveScan {
    cancel: CancelToken,
    progress: ScanProgress,
}

/// Status report for one index.
#[derive(Debug, Clone)]
pub struct IndexScanStatus {
    pub status: ScanStatus,
    /// Live progress, present while a scan is running in this process.
    pub progress: Option<ScanProgress>,
}

/// Per-index scan control: request, cancel, status.
pub struct ScanManager {
    pool: DbPool,
    active: Mutex<HashMap<IndexId, ActiveScan>>,
}

impl ScanManager {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a scan for an index. Idempotent: an index that is already
    /// queued or scanning keeps its existing job.
    pub fn request_scan(&self, index_id: IndexId) -> Result<ScanJob> {
        let conn = get_conn(&self.pool)?;
        let index =
            indexes::get_index(&conn, index_id)?.ok_or_else(|| Error::not_found("index"))?;

        if index.media_type != MediaType::Videos {
            return Err(Error::invalid_input(format!(
                "index '{}' has type {}; only videos indexes can be scanned",
                index.name, index.media_type
            )));
        }

        let job = scan_jobs::enqueue(&conn, index_id, Utc::now())?;
        if index.scan_status == ScanStatus::Idle {
            indexes::update_scan_status(&conn, index_id, ScanStatus::Queued)?;
        }

        tracing::info!("Queued scan for index '{}' ({})", index.name, index.id);
        Ok(job)
    }

    /// Cancel the scan of an index, if one is running in this process.
    /// Returns whether a running scan was signalled.
    pub fn cancel(&self, index_id: IndexId) -> bool {
        let active = self.active.lock();
        match active.get(&index_id) {
            Some(scan) => {
                scan.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Read the persisted status plus live progress for an index.
    pub fn status(&self, index_id: IndexId) -> Result<IndexScanStatus> {
        let conn = get_conn(&self.pool)?;
        let index =
            indexes::get_index(&conn, index_id)?.ok_or_else(|| Error::not_found("index"))?;

        let progress = self
            .active
            .lock()
            .get(&index_id)
            .map(|scan| scan.progress.clone());

        Ok(IndexScanStatus {
            status: index.scan_status,
            progress,
        })
    }

    /// Register a scan as running and hand out its cancel token. Called by
    /// the scan processor just before starting the walk.
    pub fn begin(&self, index_id: IndexId) -> CancelToken {
        let cancel = CancelToken::new();
        self.active.lock().insert(
            index_id,
            ActiveScan {
                cancel: cancel.clone(),
                progress: ScanProgress {
                    files_seen: 0,
                    files_added: 0,
                    current_file: None,
                },
            },
        );
        cancel
    }

    /// Update live progress for a running scan.
    pub fn update_progress(&self, index_id: IndexId, progress: ScanProgress) {
        if let Some(scan) = self.active.lock().get_mut(&index_id) {
            scan.progress = progress;
        }
    }

    /// Deregister a scan after it finished (successfully or not).
    pub fn finish(&self, index_id: IndexId) {
        self.active.lock().remove(&index_id);
    }
}
