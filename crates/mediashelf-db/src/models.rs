//! Internal Rust models matching the database schema.
//!
//! Strongly-typed structures mapping to the tables in `001_initial.sql`.
//! Timestamps are `DateTime<Utc>` in Rust and unix seconds in SQLite.

use chrono::{DateTime, Utc};
use mediashelf_common::{IndexId, ItemId, ItemKind, MediaType, PartId, ScanJobId, ScanStatus, VersionId};
use serde::{Deserialize, Serialize};

/// Media index model: a named collection of root folders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Index {
    pub id: IndexId,
    pub name: String,
    pub media_type: MediaType,
    pub folders: Vec<String>,
    pub scan_status: ScanStatus,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Video item model: a node in the semantic hierarchy
/// (show → season → episode, movie, generic video, extra).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoItem {
    pub id: ItemId,
    pub index_id: IndexId,
    pub parent_id: Option<ItemId>,
    pub kind: ItemKind,
    pub title: String,
    pub sort_title: Option<String>,
    pub year: Option<i32>,
    /// Season number when kind = season, episode number when kind = episode.
    pub number: Option<i64>,
    /// Canonical folder owning this show or movie; the migration key.
    pub source_path: Option<String>,
    /// Opaque metadata bag. The scanner writes only keys it owns (provider
    /// ids, parsed aliases) and preserves everything else verbatim.
    pub metadata: serde_json::Value,
    pub added_at: DateTime<Utc>,
    pub latest_added_at: DateTime<Utc>,
}

impl VideoItem {
    /// Construct a fresh item with a new id and both timestamps set to `at`.
    pub fn new(index_id: IndexId, kind: ItemKind, title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::new(),
            index_id,
            parent_id: None,
            kind,
            title: title.into(),
            sort_title: None,
            year: None,
            number: None,
            source_path: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            added_at: at,
            latest_added_at: at,
        }
    }
}

/// Video version model: a specific encoded release of an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoVersion {
    pub id: VersionId,
    pub item_id: ItemId,
    pub edition: Option<String>,
    pub container: Option<String>,
    pub resolution: Option<String>,
    pub runtime_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl VideoVersion {
    /// Construct a fresh version for `item_id`.
    pub fn new(item_id: ItemId, edition: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: VersionId::new(),
            item_id,
            edition,
            container: None,
            resolution: None,
            runtime_ms: None,
            created_at: at,
        }
    }
}

/// Video part model: a physical file backing a version. Unique by path;
/// `(size, fast_hash)` is the identity key across moves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoPart {
    pub id: PartId,
    pub version_id: VersionId,
    pub path: String,
    pub size: i64,
    /// File modification time, unix seconds.
    pub mtime: i64,
    pub part_index: i64,
    pub fast_hash: String,
    pub created_at: DateTime<Utc>,
    /// Touched on every scan that observes the file; parts left untouched
    /// by a complete scan are candidates for cleanup.
    pub updated_at: DateTime<Utc>,
}

impl VideoPart {
    /// Construct a fresh part for `version_id`.
    pub fn new(
        version_id: VersionId,
        path: impl Into<String>,
        size: i64,
        mtime: i64,
        fast_hash: impl Into<String>,
        part_index: i64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PartId::new(),
            version_id,
            path: path.into(),
            size,
            mtime,
            part_index,
            fast_hash: fast_hash.into(),
            created_at: at,
            updated_at: at,
        }
    }
}

/// Status of a persisted scan job. Completed jobs are removed, so only the
/// two in-flight states exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanJobStatus {
    Queued,
    Scanning,
}

impl std::fmt::Display for ScanJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Scanning => write!(f, "scanning"),
        }
    }
}

impl std::str::FromStr for ScanJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "scanning" => Ok(Self::Scanning),
            _ => Err(format!("Invalid scan job status: {}", s)),
        }
    }
}

/// Scan job model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanJob {
    pub id: ScanJobId,
    pub index_id: IndexId,
    pub status: ScanJobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}
