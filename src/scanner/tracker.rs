//! Single-slot source-path tracker.
//!
//! While walking, at most one source path may be "active". Tracking a
//! different path while one is active means two content roots are nested
//! inside a single tracked folder (a user filed one show inside another),
//! which fails the scan.

use std::path::{Path, PathBuf};

use super::ScanError;

/// Invariant enforcer for the active source path of the current walk window.
#[derive(Debug, Default)]
pub struct SourcePathTracker {
    active: Option<PathBuf>,
}

impl SourcePathTracker {
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Track a source path. Setting an empty slot or re-tracking the active
    /// path succeeds; tracking a different path is a conflict.
    pub fn track(&mut self, source_path: &Path) -> Result<(), ScanError> {
        match &self.active {
            None => {
                self.active = Some(source_path.to_path_buf());
                Ok(())
            }
            Some(active) if active == source_path => Ok(()),
            Some(active) => Err(ScanError::SourcePathConflict {
                first: active.clone(),
                second: source_path.to_path_buf(),
            }),
        }
    }

    /// Clear the slot if it holds `source_path`. Returns whether it did;
    /// the caller flushes staged content exactly when this returns true.
    pub fn remove(&mut self, source_path: &Path) -> bool {
        if self.active.as_deref() == Some(source_path) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// The currently active source path, if any.
    pub fn active(&self) -> Option<&Path> {
        self.active.as_deref()
    }
}
