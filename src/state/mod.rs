//! Application state and event broadcasting.
//!
//! Hosts (tray app, web UI) subscribe to [`AppEvent`]s to follow scan
//! lifecycles and library changes in real time.

use mediashelf_db::models::VideoItem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Application-wide event for host consumption (SSE, tray notifications).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A scan has started for an index.
    ScanStarted { index_id: String },
    /// Scan progress update.
    ScanProgress {
        index_id: String,
        files_seen: u64,
        files_added: u64,
        current_file: Option<PathBuf>,
    },
    /// A scan finished successfully.
    ScanCompleted {
        index_id: String,
        files_added: u64,
        parts_removed: u64,
    },
    /// A scan failed.
    ScanFailed { index_id: String, error: String },
    /// A new item was materialised into the library.
    ItemAdded {
        #[serde(flatten)]
        item: VideoItem,
    },
}

impl AppEvent {
    pub fn scan_started(index_id: String) -> Self {
        AppEvent::ScanStarted { index_id }
    }

    pub fn scan_progress(
        index_id: String,
        files_seen: u64,
        files_added: u64,
        current_file: Option<PathBuf>,
    ) -> Self {
        AppEvent::ScanProgress {
            index_id,
            files_seen,
            files_added,
            current_file,
        }
    }

    pub fn scan_completed(index_id: String, files_added: u64, parts_removed: u64) -> Self {
        AppEvent::ScanCompleted {
            index_id,
            files_added,
            parts_removed,
        }
    }

    pub fn scan_failed(index_id: String, error: String) -> Self {
        AppEvent::ScanFailed { index_id, error }
    }

    pub fn item_added(item: VideoItem) -> Self {
        AppEvent::ItemAdded { item }
    }
}

/// Shared application state: the event channel.
pub struct AppState {
    event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);
        Arc::new(Self { event_tx })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Get a clone of the event sender for use in other components.
    pub fn event_sender(&self) -> broadcast::Sender<AppEvent> {
        self.event_tx.clone()
    }

    /// Broadcast an event to all subscribers.
    pub fn broadcast(&self, event: AppEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("No subscribers for event");
        }
    }
}
