//! Temporary staging for a scan in progress.
//!
//! New content and extras are buffered per source path while the walk is
//! inside their folder window, then flushed together when the window
//! closes. The buffers live in memory for the duration of one scan; the
//! per-index spool directory is wiped on scan start so residue from a
//! crashed scan can never leak into a new one (its files get re-discovered
//! by the new walk anyway).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::classifier::{Classification, ExtraInfo};
use super::prober::FileProbe;

/// A staged movie, episode or generic video awaiting flush.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub classification: Classification,
    pub probe: FileProbe,
}

/// A staged extra awaiting flush.
#[derive(Debug, Clone)]
pub struct StagedExtra {
    pub path: PathBuf,
    pub info: ExtraInfo,
    pub probe: FileProbe,
}

/// Per-scan staging buffers keyed by source path (`None` for loose movies,
/// generics and unanchored extras).
pub struct ScanStaging {
    spool_dir: PathBuf,
    new_content: HashMap<Option<PathBuf>, Vec<StagedFile>>,
    extras: HashMap<Option<PathBuf>, Vec<StagedExtra>>,
}

impl ScanStaging {
    /// Create staging for one scan, wiping any spool residue left behind by
    /// a crashed previous scan of the same index.
    pub fn new(spool_root: &Path, index_key: &str) -> std::io::Result<Self> {
        let spool_dir = spool_root.join(format!("scan_{}", index_key));
        if spool_dir.exists() {
            std::fs::remove_dir_all(&spool_dir)?;
        }
        std::fs::create_dir_all(&spool_dir)?;

        Ok(Self {
            spool_dir,
            new_content: HashMap::new(),
            extras: HashMap::new(),
        })
    }

    /// Buffer a new movie, episode or generic video.
    pub fn stage_content(&mut self, key: Option<&Path>, file: StagedFile) {
        self.new_content
            .entry(key.map(|p| p.to_path_buf()))
            .or_default()
            .push(file);
    }

    /// Buffer an extra.
    pub fn stage_extra(&mut self, key: Option<&Path>, extra: StagedExtra) {
        self.extras
            .entry(key.map(|p| p.to_path_buf()))
            .or_default()
            .push(extra);
    }

    /// Release the buffered content for one source path.
    pub fn take_content(&mut self, key: Option<&Path>) -> Vec<StagedFile> {
        self.new_content
            .remove(&key.map(|p| p.to_path_buf()))
            .unwrap_or_default()
    }

    /// Release the buffered extras for one source path.
    pub fn take_extras(&mut self, key: Option<&Path>) -> Vec<StagedExtra> {
        self.extras
            .remove(&key.map(|p| p.to_path_buf()))
            .unwrap_or_default()
    }

    /// Drain every remaining buffer (end of walk).
    pub fn drain_remaining(
        &mut self,
    ) -> (
        Vec<(Option<PathBuf>, Vec<StagedFile>)>,
        Vec<(Option<PathBuf>, Vec<StagedExtra>)>,
    ) {
        let content = self.new_content.drain().collect();
        let extras = self.extras.drain().collect();
        (content, extras)
    }

    pub fn is_empty(&self) -> bool {
        self.new_content.is_empty() && self.extras.is_empty()
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    /// Remove the spool directory after a completed scan.
    pub fn cleanup(&self) -> std::io::Result<()> {
        if self.spool_dir.exists() {
            std::fs::remove_dir_all(&self.spool_dir)?;
        }
        Ok(())
    }
}
