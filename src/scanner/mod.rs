//! Video library scanner.
//!
//! A stateful, crash-recoverable pipeline that walks an index's root
//! folders, classifies every video file, and materialises the result into
//! the items / versions / parts schema. Files already known to the store
//! (by `(size, fast_hash)` identity) are reconciled in place — path
//! updates, intra-show moves, or full migrations between source paths —
//! while new files are staged per source path and flushed atomically when
//! the walk leaves their folder window.

pub mod classifier;
pub mod migrate;
pub mod prober;
pub mod staging;
pub mod tracker;

pub use classifier::{classify, Classification};
pub use migrate::MigrationScenario;
pub use prober::{probe, FileProbe};
pub use staging::{ScanStaging, StagedExtra, StagedFile};
pub use tracker::SourcePathTracker;

use chrono::Utc;
use mediashelf_common::{Error, IndexId, ItemId, ItemKind, MediaType};
use mediashelf_db::models::{Index, VideoItem, VideoPart, VideoVersion};
use mediashelf_db::queries::{indexes, video_items, video_parts, video_versions};
use mediashelf_db::{get_conn, DbPool};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::state::AppEvent;

/// Errors surfaced by the scan control interface.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Two different content roots appeared inside one tracked folder
    /// window (e.g. a show nested inside another show's folder).
    #[error("Source path conflict: {first:?} is still open but {second:?} appeared inside it")]
    SourcePathConflict { first: PathBuf, second: PathBuf },

    /// A configured root folder does not exist.
    #[error("Root folder unavailable: {path:?}")]
    RootUnavailable { path: PathBuf },

    /// The scan was cancelled cooperatively. Not a failure.
    #[error("Scan cancelled")]
    Cancelled,

    /// The index exists but is not a videos index.
    #[error("Index {index_id} has type {media_type}; only videos indexes are scanned")]
    UnsupportedIndex {
        index_id: IndexId,
        media_type: MediaType,
    },

    #[error("Index not found: {0}")]
    IndexNotFound(IndexId),

    #[error("Storage error: {0}")]
    Storage(#[from] Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cooperative cancellation token, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress callback for scan operations.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Scan progress information.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    pub files_seen: u64,
    pub files_added: u64,
    pub current_file: Option<PathBuf>,
}

/// Outcome of walking one configured root folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootStatus {
    Completed,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct RootOutcome {
    pub path: PathBuf,
    pub status: RootStatus,
    pub files_seen: u64,
}

/// Summary of a completed scan.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub index_id: IndexId,
    pub roots: Vec<RootOutcome>,
    pub files_seen: u64,
    pub files_added: u64,
    pub files_skipped: u64,
    pub parts_relocated: u64,
    pub parts_migrated: u64,
    pub parts_removed: u64,
}

impl ScanSummary {
    fn new(index_id: IndexId) -> Self {
        Self {
            index_id,
            roots: Vec::new(),
            files_seen: 0,
            files_added: 0,
            files_skipped: 0,
            parts_relocated: 0,
            parts_migrated: 0,
            parts_removed: 0,
        }
    }

    pub fn all_roots_completed(&self) -> bool {
        self.roots.iter().all(|r| r.status == RootStatus::Completed)
    }
}

/// Scanner for one store, reusable across indexes.
pub struct Scanner {
    pool: DbPool,
    spool_root: PathBuf,
    event_tx: Option<broadcast::Sender<AppEvent>>,
    progress: Option<ProgressCallback>,
}

/// Per-scan mutable state threaded through the walk.
struct ScanPass<'a> {
    index: &'a Index,
    staging: ScanStaging,
    tracker: SourcePathTracker,
    summary: ScanSummary,
    cancel: &'a CancelToken,
}

/// One directory on the explicit walk stack: its own files have already
/// been processed, its subdirectories are visited lazily.
struct DirFrame {
    path: PathBuf,
    subdirs: std::vec::IntoIter<PathBuf>,
}

impl Scanner {
    pub fn new(pool: DbPool, spool_root: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            spool_root: spool_root.into(),
            event_tx: None,
            progress: None,
        }
    }

    /// Attach an event broadcast channel.
    pub fn with_events(mut self, event_tx: broadcast::Sender<AppEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn emit(&self, event: AppEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn report_progress(&self, pass: &ScanPass<'_>, current_file: Option<&Path>) {
        let progress = ScanProgress {
            files_seen: pass.summary.files_seen,
            files_added: pass.summary.files_added,
            current_file: current_file.map(|p| p.to_path_buf()),
        };
        if let Some(ref callback) = self.progress {
            callback(progress.clone());
        }
        self.emit(AppEvent::scan_progress(
            pass.index.id.to_string(),
            progress.files_seen,
            progress.files_added,
            progress.current_file,
        ));
    }

    /// Scan one index: walk its roots, reconcile known files, flush staged
    /// new content per source path, and clean up parts whose files are
    /// gone. Returns the summary, or the first fatal error.
    pub fn scan_index(
        &self,
        index_id: IndexId,
        cancel: &CancelToken,
    ) -> Result<ScanSummary, ScanError> {
        let conn = get_conn(&self.pool)?;
        let index = indexes::get_index(&conn, index_id)?
            .ok_or(ScanError::IndexNotFound(index_id))?;

        if index.media_type != MediaType::Videos {
            return Err(ScanError::UnsupportedIndex {
                index_id,
                media_type: index.media_type,
            });
        }

        tracing::info!("Scanning index '{}' ({})", index.name, index.id);
        self.emit(AppEvent::scan_started(index.id.to_string()));

        let scan_started = Utc::now();
        let staging = ScanStaging::new(&self.spool_root, &index.id.to_string())?;
        let mut pass = ScanPass {
            index: &index,
            staging,
            tracker: SourcePathTracker::new(),
            summary: ScanSummary::new(index_id),
            cancel,
        };

        let result = self.run_walk(&conn, &mut pass, scan_started);

        if let Err(e) = pass.staging.cleanup() {
            tracing::warn!("Failed to remove scan spool directory: {}", e);
        }

        let summary = match result {
            Ok(()) => pass.summary,
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Scan of '{}' complete: {} files seen, {} added, {} relocated, {} removed",
            index.name,
            summary.files_seen,
            summary.files_added,
            summary.parts_relocated,
            summary.parts_removed
        );
        self.emit(AppEvent::scan_completed(
            index.id.to_string(),
            summary.files_added,
            summary.parts_removed,
        ));

        Ok(summary)
    }

    fn run_walk(
        &self,
        conn: &Connection,
        pass: &mut ScanPass<'_>,
        scan_started: chrono::DateTime<Utc>,
    ) -> Result<(), ScanError> {
        let folders = pass.index.folders.clone();
        for folder in &folders {
            let root = PathBuf::from(folder);
            // An unreadable root must not complete "empty", or the cleanup
            // pass would conclude its entire content is gone.
            if !root.is_dir() || std::fs::read_dir(&root).is_err() {
                tracing::warn!("Root folder unavailable: {:?}", root);
                pass.summary.roots.push(RootOutcome {
                    path: root,
                    status: RootStatus::Unavailable,
                    files_seen: 0,
                });
                continue;
            }

            let seen_before = pass.summary.files_seen;
            pass.tracker = SourcePathTracker::new();
            self.scan_root(conn, pass, &root)?;
            pass.summary.roots.push(RootOutcome {
                path: root,
                status: RootStatus::Completed,
                files_seen: pass.summary.files_seen - seen_before,
            });
        }

        // Anything still staged belongs to no closed window: loose movies,
        // generics, unanchored extras.
        self.flush_remaining(conn, pass)?;

        // Only a complete, uncancelled walk may conclude that unseen parts
        // are gone from disk.
        if pass.summary.all_roots_completed() && !pass.cancel.is_cancelled() {
            let roots: Vec<PathBuf> = pass.summary.roots.iter().map(|r| r.path.clone()).collect();
            self.cleanup_deleted(conn, pass, &roots, scan_started)?;
        }

        Ok(())
    }

    /// Depth-first walk of one root with an explicit stack. All files of a
    /// directory are processed before its subdirectories, and a source
    /// path flush is attempted both after a directory's files and when the
    /// walk finally leaves its subtree.
    fn scan_root(
        &self,
        conn: &Connection,
        pass: &mut ScanPass<'_>,
        root: &Path,
    ) -> Result<(), ScanError> {
        let mut stack = vec![self.enter_dir(conn, pass, root)?];

        loop {
            let next_subdir = match stack.last_mut() {
                Some(frame) => frame.subdirs.next(),
                None => break,
            };
            match next_subdir {
                Some(subdir) => {
                    let child = self.enter_dir(conn, pass, &subdir)?;
                    stack.push(child);
                }
                None => {
                    let frame = stack.pop().unwrap();
                    self.maybe_flush(conn, pass, &frame.path)?;
                }
            }
        }

        Ok(())
    }

    /// Read a directory, process its files, attempt a flush for it, and
    /// return the frame holding its pending subdirectories.
    fn enter_dir(
        &self,
        conn: &Connection,
        pass: &mut ScanPass<'_>,
        dir: &Path,
    ) -> Result<DirFrame, ScanError> {
        let mut files: Vec<PathBuf> = Vec::new();
        let mut subdirs: Vec<PathBuf> = Vec::new();

        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(e) => {
                            tracing::warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                            continue;
                        }
                    };
                    let path = entry.path();
                    if path.is_dir() {
                        subdirs.push(path);
                    } else if path.is_file() {
                        files.push(path);
                    }
                }
            }
            Err(e) => {
                // Transient I/O: skip this directory, keep scanning.
                tracing::warn!("Skipping unreadable directory {:?}: {}", dir, e);
            }
        }

        files.sort();
        subdirs.sort();

        for file in &files {
            if pass.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            self.process_file(conn, pass, file)?;
        }

        self.maybe_flush(conn, pass, dir)?;

        Ok(DirFrame {
            path: dir.to_path_buf(),
            subdirs: subdirs.into_iter(),
        })
    }

    /// Flush the staging window for `dir` if it is the tracked source path.
    fn maybe_flush(
        &self,
        conn: &Connection,
        pass: &mut ScanPass<'_>,
        dir: &Path,
    ) -> Result<(), ScanError> {
        if pass.tracker.remove(dir) {
            let files = pass.staging.take_content(Some(dir));
            let extras = pass.staging.take_extras(Some(dir));
            self.flush_batch(conn, pass, Some(dir.to_path_buf()), files, extras)?;
        }
        Ok(())
    }

    fn flush_remaining(&self, conn: &Connection, pass: &mut ScanPass<'_>) -> Result<(), ScanError> {
        let (content, extras) = pass.staging.drain_remaining();
        let mut extras = extras;
        for (key, files) in content {
            let matching_extras = extras
                .iter()
                .position(|(k, _)| *k == key)
                .map(|i| extras.remove(i).1)
                .unwrap_or_default();
            self.flush_batch(conn, pass, key, files, matching_extras)?;
        }
        for (key, leftover) in extras {
            self.flush_batch(conn, pass, key, Vec::new(), leftover)?;
        }
        Ok(())
    }

    /// Process one file of the walk: classify, look up by identity, then
    /// reconcile (known file) or stage (new file).
    fn process_file(
        &self,
        conn: &Connection,
        pass: &mut ScanPass<'_>,
        path: &Path,
    ) -> Result<(), ScanError> {
        if !mediashelf_common::paths::is_video_file(path) {
            return Ok(());
        }

        pass.summary.files_seen += 1;
        self.report_progress(pass, Some(path));

        let probe = match prober::probe(path) {
            Ok(probe) => probe,
            Err(e) => {
                // Transient I/O: log, skip the file, keep scanning.
                tracing::warn!("Skipping unreadable file {:?}: {}", path, e);
                pass.summary.files_skipped += 1;
                return Ok(());
            }
        };

        let classification = classify(path);
        let path_str = path.to_string_lossy().to_string();
        let now = Utc::now();

        let hits = video_parts::find_by_identity(conn, pass.index.id, probe.size, &probe.fast_hash)
            .map_err(ScanError::Storage)?;

        if let Some(part) = hits.iter().find(|p| p.path == path_str) {
            if part.mtime != probe.mtime {
                video_parts::update_mtime(conn, part.id, probe.mtime, now)
                    .map_err(ScanError::Storage)?;
            } else {
                video_parts::touch(conn, part.id, now).map_err(ScanError::Storage)?;
            }
            return Ok(());
        }

        // A hit whose old location is gone from disk is this file, moved.
        // Hits whose files still exist are byte-identical copies; those
        // fall through and are treated as new content.
        if let Some(part) = hits.iter().find(|p| !Path::new(&p.path).exists()) {
            return self.reconcile_moved_part(conn, pass, part, path, &classification, &probe);
        }

        // New file.
        match &classification {
            Classification::Extra(info) => {
                let key = info.owner_path.clone();
                pass.staging.stage_extra(
                    key.as_deref(),
                    StagedExtra {
                        path: path.to_path_buf(),
                        info: info.clone(),
                        probe,
                    },
                );
            }
            Classification::TvEpisode(tv) => {
                pass.tracker.track(&tv.source_path)?;
                let source_path = tv.source_path.clone();
                pass.staging.stage_content(
                    Some(&source_path),
                    StagedFile {
                        path: path.to_path_buf(),
                        classification: classification.clone(),
                        probe,
                    },
                );
            }
            Classification::Movie(movie) => match movie.source_path.clone() {
                Some(source_path) => {
                    pass.tracker.track(&source_path)?;
                    pass.staging.stage_content(
                        Some(&source_path),
                        StagedFile {
                            path: path.to_path_buf(),
                            classification: classification.clone(),
                            probe,
                        },
                    );
                }
                None => {
                    let staged = StagedFile {
                        path: path.to_path_buf(),
                        classification: classification.clone(),
                        probe,
                    };
                    if pass.tracker.active().is_none() {
                        // Loose movie at library root with no open window:
                        // insert immediately.
                        self.flush_batch(conn, pass, None, vec![staged], Vec::new())?;
                    } else {
                        pass.staging.stage_content(None, staged);
                    }
                }
            },
            Classification::Generic(_) => {
                pass.staging.stage_content(
                    None,
                    StagedFile {
                        path: path.to_path_buf(),
                        classification: classification.clone(),
                        probe,
                    },
                );
            }
        }

        Ok(())
    }

    /// A known part was found at a new path: update the path, then either
    /// fix its placement inside the owning root, or migrate it between
    /// roots if the source path changed. One transaction per part.
    fn reconcile_moved_part(
        &self,
        conn: &Connection,
        pass: &mut ScanPass<'_>,
        part: &VideoPart,
        new_path: &Path,
        classification: &Classification,
        probe: &FileProbe,
    ) -> Result<(), ScanError> {
        let now = Utc::now();
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        video_parts::update_path(
            &tx,
            part.id,
            &new_path.to_string_lossy(),
            probe.mtime,
            now,
        )
        .map_err(ScanError::Storage)?;

        let owner = video_items::item_of_part(&tx, part.id)
            .map_err(ScanError::Storage)?
            .ok_or_else(|| ScanError::Storage(Error::not_found("owning item of part")))?;
        let root = video_items::root_ancestor(&tx, owner.id).map_err(ScanError::Storage)?;

        let old_source = root.source_path.as_deref().map(Path::new);
        match classification.source_path() {
            Some(new_source) if old_source != Some(new_source) => {
                migrate::migrate_part(&tx, pass.index.id, part, classification, new_source, now)
                    .map_err(ScanError::Storage)?;
                pass.summary.parts_migrated += 1;
            }
            _ => {
                // Same source path (or none involved): the move may still
                // have changed the placement inside the root.
                if migrate::reconcile_placement(&tx, pass.index.id, part, classification, now)
                    .map_err(ScanError::Storage)?
                {
                    pass.summary.parts_migrated += 1;
                }
            }
        }

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        pass.summary.parts_relocated += 1;

        tracing::debug!("Relocated part {} to {:?}", part.id, new_path);
        Ok(())
    }

    /// Atomically materialise one staging window into the store.
    fn flush_batch(
        &self,
        conn: &Connection,
        pass: &mut ScanPass<'_>,
        key: Option<PathBuf>,
        files: Vec<StagedFile>,
        extras: Vec<StagedExtra>,
    ) -> Result<(), ScanError> {
        if files.is_empty() && extras.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            "Flushing {} files and {} extras for window {:?}",
            files.len(),
            extras.len(),
            key
        );

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        let mut touched_items: Vec<ItemId> = Vec::new();
        let mut added = 0u64;

        for staged in &files {
            let (item_id, created) =
                self.flush_one_content(&tx, pass.index, staged).map_err(ScanError::Storage)?;
            touched_items.push(item_id);
            if created {
                added += 1;
            }
        }

        for staged in &extras {
            let (item_id, created) = self
                .flush_one_extra(&tx, pass.index, key.as_deref(), staged)
                .map_err(ScanError::Storage)?;
            touched_items.push(item_id);
            if created {
                added += 1;
            }
        }

        #[cfg(debug_assertions)]
        for item_id in &touched_items {
            debug_assert!(
                video_items::is_ancestry_acyclic(&tx, *item_id).map_err(ScanError::Storage)?,
                "flush created a parent cycle at item {}",
                item_id
            );
        }

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        pass.summary.files_added += added;

        if self.event_tx.is_some() {
            for item_id in touched_items {
                if let Ok(Some(item)) = video_items::get_item(conn, item_id) {
                    self.emit(AppEvent::item_added(item));
                }
            }
        }

        Ok(())
    }

    /// Materialise one staged movie / episode / generic into the store.
    /// Returns the leaf item id and whether a new part was created.
    fn flush_one_content(
        &self,
        conn: &Connection,
        index: &Index,
        staged: &StagedFile,
    ) -> Result<(ItemId, bool), Error> {
        let now = Utc::now();

        match &staged.classification {
            Classification::TvEpisode(tv) => {
                let source_str = tv.source_path.to_string_lossy();
                let episode_id = video_items::upsert_hierarchy(
                    conn,
                    index.id,
                    &tv.show_title,
                    Some(source_str.as_ref()),
                    tv.season,
                    tv.episode,
                    tv.title.as_deref(),
                    now,
                )?;

                self.write_owned_metadata(conn, episode_id, &tv.external_ids, |bag| {
                    if let Some(air_date) = &tv.air_date {
                        bag.insert("air_date".to_string(), serde_json::json!(air_date));
                    }
                    if let Some(end) = tv.episode_end {
                        bag.insert("episode_end".to_string(), serde_json::json!(end));
                    }
                })?;

                let created = self.attach_part(
                    conn,
                    episode_id,
                    tv.edition.as_deref(),
                    staged,
                    tv.part_index,
                    now,
                )?;
                Ok((episode_id, created))
            }
            Classification::Movie(movie) => {
                let item_id = match &movie.source_path {
                    Some(source_path) => {
                        let source_str = source_path.to_string_lossy().to_string();
                        match video_items::find_owner_by_source_path(conn, index.id, &source_str)? {
                            Some(item) => item.id,
                            None => {
                                let mut item =
                                    VideoItem::new(index.id, ItemKind::Movie, movie.title.clone(), now);
                                item.year = movie.year;
                                item.sort_title = Some(movie.title.clone());
                                item.source_path = Some(source_str);
                                video_items::insert_item(conn, &item)?;
                                item.id
                            }
                        }
                    }
                    None => {
                        match video_items::find_movie_by_title_year(
                            conn,
                            index.id,
                            &movie.title,
                            movie.year,
                        )? {
                            Some(item) => item.id,
                            None => {
                                let mut item =
                                    VideoItem::new(index.id, ItemKind::Movie, movie.title.clone(), now);
                                item.year = movie.year;
                                item.sort_title = Some(movie.title.clone());
                                video_items::insert_item(conn, &item)?;
                                item.id
                            }
                        }
                    }
                };

                self.write_owned_metadata(conn, item_id, &movie.external_ids, |_| {})?;

                let created = self.attach_part(
                    conn,
                    item_id,
                    movie.edition.as_deref(),
                    staged,
                    movie.part_index,
                    now,
                )?;
                Ok((item_id, created))
            }
            Classification::Generic(generic) => {
                let item_id = match video_items::find_root_by_title(
                    conn,
                    index.id,
                    ItemKind::Video,
                    &generic.title,
                )? {
                    Some(item) => item.id,
                    None => {
                        let item =
                            VideoItem::new(index.id, ItemKind::Video, generic.title.clone(), now);
                        video_items::insert_item(conn, &item)?;
                        item.id
                    }
                };

                let created = self.attach_part(conn, item_id, None, staged, None, now)?;
                Ok((item_id, created))
            }
            Classification::Extra(info) => {
                // Extras are normally staged into the extras buffer; treat
                // a stray one as an unanchored extra.
                let staged_extra = StagedExtra {
                    path: staged.path.clone(),
                    info: info.clone(),
                    probe: staged.probe.clone(),
                };
                self.flush_one_extra(conn, index, None, &staged_extra)
            }
        }
    }

    /// Materialise one staged extra as a flat item under the index,
    /// addressable by its ancestor source path for future linkage.
    fn flush_one_extra(
        &self,
        conn: &Connection,
        index: &Index,
        key: Option<&Path>,
        staged: &StagedExtra,
    ) -> Result<(ItemId, bool), Error> {
        let now = Utc::now();
        let source_str = key.map(|p| p.to_string_lossy().to_string());

        let existing = match &source_str {
            Some(source_path) => video_items::find_by_source_path(conn, index.id, source_path)?
                .into_iter()
                .find(|item| item.kind == ItemKind::Extra && item.title == staged.info.title),
            None => video_items::find_root_by_title(
                conn,
                index.id,
                ItemKind::Extra,
                &staged.info.title,
            )?,
        };

        let item_id = match existing {
            Some(item) => item.id,
            None => {
                let mut item =
                    VideoItem::new(index.id, ItemKind::Extra, staged.info.title.clone(), now);
                item.source_path = source_str;
                item.metadata = serde_json::json!({ "extra_type": staged.info.extra_type });
                video_items::insert_item(conn, &item)?;
                item.id
            }
        };

        let staged_file = StagedFile {
            path: staged.path.clone(),
            classification: Classification::Extra(staged.info.clone()),
            probe: staged.probe.clone(),
        };
        let created = self.attach_part(conn, item_id, None, &staged_file, None, now)?;
        Ok((item_id, created))
    }

    /// Merge scanner-owned metadata keys (provider ids plus whatever
    /// `extend` adds) into an item's bag, preserving everything else.
    fn write_owned_metadata<F>(
        &self,
        conn: &Connection,
        item_id: ItemId,
        external_ids: &std::collections::HashMap<String, String>,
        extend: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut serde_json::Map<String, serde_json::Value>),
    {
        let mut item = match video_items::get_item(conn, item_id)? {
            Some(item) => item,
            None => return Ok(()),
        };

        let mut changed = false;
        if let Some(bag) = item.metadata.as_object_mut() {
            let before = bag.clone();
            for (key, value) in external_ids {
                bag.insert(key.clone(), serde_json::Value::String(value.clone()));
            }
            extend(bag);
            changed = *bag != before;
        }

        if changed {
            video_items::update_metadata(conn, item_id, &item.metadata)?;
        }

        Ok(())
    }

    /// Attach a staged file as a part of `item_id`, reusing the version
    /// with the same edition when one exists. A part already at this path
    /// (same file, replaced content) has its identity refreshed instead.
    /// Returns whether a new part was created.
    fn attach_part(
        &self,
        conn: &Connection,
        item_id: ItemId,
        edition: Option<&str>,
        staged: &StagedFile,
        part_index: Option<i64>,
        now: chrono::DateTime<Utc>,
    ) -> Result<bool, Error> {
        let path_str = staged.path.to_string_lossy().to_string();

        if let Some(existing) = video_parts::find_by_path(conn, &path_str)? {
            video_parts::update_identity(
                conn,
                existing.id,
                staged.probe.size,
                staged.probe.mtime,
                &staged.probe.fast_hash,
                now,
            )?;
            return Ok(false);
        }

        let version = match video_versions::find_by_edition(conn, item_id, edition)? {
            Some(version) => version,
            None => {
                let version =
                    VideoVersion::new(item_id, edition.map(|e| e.to_string()), now);
                video_versions::insert_version(conn, &version)?;
                version
            }
        };

        let part = VideoPart::new(
            version.id,
            path_str,
            staged.probe.size,
            staged.probe.mtime,
            staged.probe.fast_hash.clone(),
            part_index.unwrap_or(0),
            now,
        );
        video_parts::insert_part(conn, &part)?;

        Ok(true)
    }

    /// Remove parts whose files were not observed by this (complete,
    /// uncancelled) walk and prune emptied versions and items.
    fn cleanup_deleted(
        &self,
        conn: &Connection,
        pass: &mut ScanPass<'_>,
        roots: &[PathBuf],
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<(), ScanError> {
        let stale = video_parts::stale_parts(conn, pass.index.id, cutoff).map_err(ScanError::Storage)?;

        for part in stale {
            // Never touch parts outside the scanned roots; they may live
            // on a folder the index no longer covers.
            if !roots.iter().any(|root| Path::new(&part.path).starts_with(root)) {
                continue;
            }

            let tx = conn
                .unchecked_transaction()
                .map_err(|e| Error::database(e.to_string()))?;

            let owner = video_items::item_of_part(&tx, part.id).map_err(ScanError::Storage)?;
            video_parts::delete_part(&tx, part.id).map_err(ScanError::Storage)?;
            video_versions::delete_version_if_empty(&tx, part.version_id)
                .map_err(ScanError::Storage)?;
            if let Some(owner) = owner {
                video_items::delete_item_if_empty(&tx, owner.id).map_err(ScanError::Storage)?;
            }

            tx.commit().map_err(|e| Error::database(e.to_string()))?;
            pass.summary.parts_removed += 1;
            tracing::info!("Removed vanished part {:?}", part.path);
        }

        Ok(())
    }
}
