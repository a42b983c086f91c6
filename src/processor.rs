//! Background scan processor.
//!
//! A long-running loop that recovers crashed scans at startup, pops the
//! oldest queued scan job, and runs the scanner for it on a blocking
//! thread. Per-index scans are serialised by construction: the processor
//! runs one job at a time and job enqueueing is idempotent per index.

use chrono::Utc;
use mediashelf::manager::ScanManager;
use mediashelf::scanner::{ScanError, ScanProgress, Scanner};
use mediashelf::state::{AppEvent, AppState};
use mediashelf_common::ScanStatus;
use mediashelf_db::models::ScanJob;
use mediashelf_db::queries::{indexes, scan_jobs};
use mediashelf_db::DbPool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct ScanProcessor {
    pool: DbPool,
    spool_root: PathBuf,
    manager: Arc<ScanManager>,
    state: Arc<AppState>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ScanProcessor {
    pub fn new(
        pool: DbPool,
        spool_root: PathBuf,
        manager: Arc<ScanManager>,
        state: Arc<AppState>,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            pool,
            spool_root,
            manager,
            state,
            shutdown_rx,
        }
    }

    /// Recover crashed scans, then process jobs until shutdown.
    pub async fn run(mut self) {
        tracing::info!("Scan processor started");

        self.recover_orphans();

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    tracing::info!("Scan processor shutting down");
                    break;
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => {}
            }

            self.process_next_job().await;
        }
    }

    /// A scan interrupted by a crash is still marked `scanning` in the
    /// store; coerce it back to `queued` so it reruns from the start (its
    /// staging was already crash-safe to discard).
    fn recover_orphans(&self) {
        let conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Failed to get connection for crash recovery: {}", e);
                return;
            }
        };

        match scan_jobs::reset_orphaned(&conn) {
            Ok(count) if count > 0 => {
                tracing::info!("Re-queued {} scan(s) interrupted by a previous session", count);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to reset orphaned scan jobs: {}", e),
        }

        if let Err(e) = indexes::reset_interrupted(&conn) {
            tracing::warn!("Failed to reset interrupted index statuses: {}", e);
        }
    }

    async fn process_next_job(&self) {
        let job = match self.next_job() {
            Some(job) => job,
            None => {
                tokio::time::sleep(tokio::time::Duration::from_millis(900)).await;
                return;
            }
        };

        let index_id = job.index_id;
        tracing::info!("Starting scan job {} for index {}", job.id, index_id);

        let cancel = self.manager.begin(index_id);
        let manager = self.manager.clone();
        let progress_manager = self.manager.clone();
        let scanner = Scanner::new(self.pool.clone(), self.spool_root.clone())
            .with_events(self.state.event_sender())
            .with_progress(Box::new(move |progress: ScanProgress| {
                progress_manager.update_progress(index_id, progress);
            }));

        let result =
            tokio::task::spawn_blocking(move || scanner.scan_index(index_id, &cancel)).await;

        manager.finish(index_id);

        let conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Failed to get connection after scan: {}", e);
                return;
            }
        };

        match result {
            Ok(Ok(summary)) => {
                if let Err(e) = indexes::mark_scanned(&conn, index_id, Utc::now()) {
                    tracing::error!("Failed to mark index scanned: {}", e);
                }
                tracing::info!(
                    "Scan job {} done: {} seen, {} added, {} removed",
                    job.id,
                    summary.files_seen,
                    summary.files_added,
                    summary.parts_removed
                );
            }
            Ok(Err(ScanError::Cancelled)) => {
                tracing::info!("Scan job {} cancelled", job.id);
                if let Err(e) = indexes::update_scan_status(&conn, index_id, ScanStatus::Idle) {
                    tracing::error!("Failed to reset index status: {}", e);
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Scan job {} failed: {}", job.id, e);
                self.state
                    .broadcast(AppEvent::scan_failed(index_id.to_string(), e.to_string()));
                if let Err(e) = indexes::update_scan_status(&conn, index_id, ScanStatus::Idle) {
                    tracing::error!("Failed to reset index status: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Scan job {} panicked: {}", job.id, e);
                if let Err(e) = indexes::update_scan_status(&conn, index_id, ScanStatus::Idle) {
                    tracing::error!("Failed to reset index status: {}", e);
                }
            }
        }

        if let Err(e) = scan_jobs::remove(&conn, job.id) {
            tracing::warn!("Failed to remove finished scan job: {}", e);
        }
    }

    /// Pop the oldest queued job and flip it (and its index) to scanning.
    fn next_job(&self) -> Option<ScanJob> {
        let conn = self.pool.get().ok()?;
        let job = scan_jobs::next_queued(&conn).ok()??;

        if let Err(e) = scan_jobs::mark_scanning(&conn, job.id, Utc::now()) {
            tracing::error!("Failed to mark scan job scanning: {}", e);
            return None;
        }
        if let Err(e) = indexes::update_scan_status(&conn, job.index_id, ScanStatus::Scanning) {
            tracing::error!("Failed to mark index scanning: {}", e);
        }

        Some(job)
    }
}
