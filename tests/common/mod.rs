//! Shared test harness for scanner integration tests.
//!
//! Provides [`TestHarness`] which builds an in-memory database, a temp
//! library tree with one configured videos index, and helpers for writing,
//! moving and deleting files plus querying the resulting item graph.

use mediashelf::scanner::{CancelToken, ScanError, ScanSummary, Scanner};
use mediashelf_common::{IndexId, ItemKind, MediaType};
use mediashelf_db::models::{VideoItem, VideoPart, VideoVersion};
use mediashelf_db::pool::PooledConnection;
use mediashelf_db::queries::{indexes, video_items, video_parts, video_versions};
use mediashelf_db::{init_memory_pool, DbPool};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestHarness {
    pub pool: DbPool,
    pub index_id: IndexId,
    pub library: TempDir,
    spool: TempDir,
}

impl TestHarness {
    /// Build a harness with one videos index rooted at a fresh temp dir.
    pub fn new() -> Self {
        let pool = init_memory_pool().expect("failed to create in-memory pool");
        let library = TempDir::new().expect("failed to create library dir");
        let spool = TempDir::new().expect("failed to create spool dir");

        let conn = pool.get().unwrap();
        let index = indexes::create_index(
            &conn,
            "Videos",
            MediaType::Videos,
            &[library.path().to_string_lossy().to_string()],
        )
        .unwrap();
        drop(conn);

        Self {
            pool,
            index_id: index.id,
            library,
            spool,
        }
    }

    pub fn conn(&self) -> PooledConnection {
        self.pool.get().unwrap()
    }

    /// Absolute path of a file inside the library.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.library.path().join(rel)
    }

    /// Write a file into the library. Content is derived from the relative
    /// path so every file carries a distinct identity.
    pub fn write_file(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("video-bytes:{}", rel)).unwrap();
        path
    }

    /// Move a file within the library, creating destination folders and
    /// pruning the emptied source folder.
    pub fn move_file(&self, from: &str, to: &str) {
        let from = self.path(from);
        let to = self.path(to);
        std::fs::create_dir_all(to.parent().unwrap()).unwrap();
        std::fs::rename(&from, &to).unwrap();

        let mut dir = from.parent().map(|p| p.to_path_buf());
        while let Some(current) = dir {
            if current == self.library.path() || std::fs::remove_dir(&current).is_err() {
                break;
            }
            dir = current.parent().map(|p| p.to_path_buf());
        }
    }

    /// Move a directory within the library.
    pub fn move_dir(&self, from: &str, to: &str) {
        let from = self.path(from);
        let to = self.path(to);
        std::fs::create_dir_all(to.parent().unwrap()).unwrap();
        std::fs::rename(&from, &to).unwrap();
    }

    pub fn remove_file(&self, rel: &str) {
        std::fs::remove_file(self.path(rel)).unwrap();
    }

    pub fn scan(&self) -> Result<ScanSummary, ScanError> {
        self.scan_with_cancel(&CancelToken::new())
    }

    pub fn scan_with_cancel(&self, cancel: &CancelToken) -> Result<ScanSummary, ScanError> {
        Scanner::new(self.pool.clone(), self.spool.path()).scan_index(self.index_id, cancel)
    }

    // ---------- Query helpers ----------

    pub fn items(&self) -> Vec<VideoItem> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id FROM video_items WHERE index_id = ? ORDER BY added_at ASC, title ASC",
            )
            .unwrap();
        let ids: Vec<String> = stmt
            .query_map([self.index_id.to_string()], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        ids.iter()
            .map(|id| {
                video_items::get_item(&conn, mediashelf_common::ItemId::parse(id).unwrap())
                    .unwrap()
                    .unwrap()
            })
            .collect()
    }

    pub fn items_of_kind(&self, kind: ItemKind) -> Vec<VideoItem> {
        self.items().into_iter().filter(|i| i.kind == kind).collect()
    }

    pub fn item_by_title(&self, kind: ItemKind, title: &str) -> Option<VideoItem> {
        self.items()
            .into_iter()
            .find(|i| i.kind == kind && i.title == title)
    }

    pub fn children_of(&self, item: &VideoItem) -> Vec<VideoItem> {
        video_items::children(&self.conn(), item.id).unwrap()
    }

    pub fn versions_of(&self, item: &VideoItem) -> Vec<VideoVersion> {
        video_versions::versions_of_item(&self.conn(), item.id).unwrap()
    }

    pub fn parts_of(&self, version: &VideoVersion) -> Vec<VideoPart> {
        video_parts::parts_of_version(&self.conn(), version.id).unwrap()
    }

    pub fn all_part_paths(&self) -> Vec<String> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT path FROM video_parts ORDER BY path ASC")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    pub fn count(&self, table: &str) -> i64 {
        self.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    /// Assert the schema-wide invariant that no two parts share a path.
    pub fn assert_part_paths_unique(&self) {
        let dup: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM (SELECT path FROM video_parts GROUP BY path HAVING COUNT(*) > 1)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(dup, 0, "duplicate part paths found");
    }

    /// A stable fingerprint of the item graph, comparing by natural keys
    /// rather than ids. Connections are scoped per lookup: the test pool
    /// holds a single connection.
    pub fn graph_fingerprint(&self) -> Vec<String> {
        let items = self.items();
        let mut lines: Vec<String> = Vec::new();

        for item in &items {
            let parent_title = item
                .parent_id
                .and_then(|p| {
                    let conn = self.conn();
                    video_items::get_item(&conn, p).unwrap()
                })
                .map(|p| p.title)
                .unwrap_or_default();

            let versions = self.versions_of(item);
            let mut version_bits: Vec<String> = versions
                .iter()
                .map(|v| {
                    let mut paths: Vec<String> =
                        self.parts_of(v).iter().map(|p| p.path.clone()).collect();
                    paths.sort();
                    format!("{}:{}", v.edition.clone().unwrap_or_default(), paths.join(","))
                })
                .collect();
            version_bits.sort();

            lines.push(format!(
                "{}|{}|{:?}|{}|{:?}|{}",
                item.kind,
                item.title,
                item.number,
                parent_title,
                item.source_path,
                version_bits.join(";")
            ));
        }

        lines.sort();
        lines
    }
}

/// Keep the library path helper usable in assertions.
pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
