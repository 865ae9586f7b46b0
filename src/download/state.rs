// ChatVault - Archived Chat Media Console
// Copyright (C) 2026 ChatVault contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Per-item download state
//!
//! One `MediaDownloadState` exists per visible media attachment. It is created
//! lazily when the item mounts, seeded from the message record's persisted
//! flag, and dropped when the item unmounts. While a download session is in
//! flight the controller owns this state; the record flag only re-enters
//! through the reconciler.

use crate::download::metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable identity of one downloadable attachment: (group, message)
///
/// Never reused across different underlying files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaItemKey {
    pub group_id: i64,
    pub message_id: i64,
}

impl MediaItemKey {
    pub fn new(group_id: i64, message_id: i64) -> Self {
        Self { group_id, message_id }
    }
}

impl fmt::Display for MediaItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_id, self.message_id)
    }
}

/// Persisted is-on-disk fact carried by the message record
///
/// Refreshed independently of any download session whenever the surrounding
/// list reloads. Authoritative only when no session is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFlag {
    pub is_downloaded: bool,
    pub stored_path: Option<String>,
}

impl MediaFlag {
    /// Flag for a file the record says is already on disk
    pub fn downloaded<S: Into<String>>(stored_path: S) -> Self {
        Self {
            is_downloaded: true,
            stored_path: Some(stored_path.into()),
        }
    }

    /// Flag for a remote-only file
    pub fn missing() -> Self {
        Self {
            is_downloaded: false,
            stored_path: None,
        }
    }
}

/// Lifecycle status of one media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    NotDownloaded,
    Downloading,
    Downloaded,
    Failed,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::NotDownloaded => "not_downloaded",
            MediaStatus::Downloading => "downloading",
            MediaStatus::Downloaded => "downloaded",
            MediaStatus::Failed => "failed",
        }
    }

    /// Terminal statuses never poll
    pub fn is_terminal(&self) -> bool {
        matches!(self, MediaStatus::Downloaded | MediaStatus::Failed)
    }
}

/// Full download state snapshot for one media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDownloadState {
    pub status: MediaStatus,

    /// 0-100; meaningful while Downloading, pinned to 100 once Downloaded
    pub progress_percent: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_bytes_per_sec: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,

    /// Present once the file is fetchable, newly downloaded or pre-existing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,

    /// Present only when status is Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Timestamp of the last progress sample, feeds local speed estimation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sample_at: Option<DateTime<Utc>>,
}

impl MediaDownloadState {
    /// State for a remote-only file with no session in flight
    pub fn not_downloaded() -> Self {
        Self {
            status: MediaStatus::NotDownloaded,
            progress_percent: 0.0,
            downloaded_bytes: None,
            total_bytes: None,
            speed_bytes_per_sec: None,
            eta_seconds: None,
            resolved_url: None,
            error: None,
            last_sample_at: None,
        }
    }

    /// State for a file that is on disk (pre-existing or just fetched)
    pub fn downloaded(resolved_url: Option<String>) -> Self {
        Self {
            status: MediaStatus::Downloaded,
            progress_percent: 100.0,
            resolved_url,
            ..Self::not_downloaded()
        }
    }

    /// Seed a fresh state from the message record's persisted flag
    pub fn from_flag(flag: &MediaFlag) -> Self {
        if flag.is_downloaded {
            Self::downloaded(flag.stored_path.clone())
        } else {
            Self::not_downloaded()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Format progress as a display string for list rows and the CLI
    pub fn display_string(&self) -> String {
        match self.status {
            MediaStatus::NotDownloaded => "Not downloaded".to_string(),
            MediaStatus::Downloading => format!(
                "{:.1}% ({} / {}) - {} - {}",
                self.progress_percent,
                metrics::bytes_string(self.downloaded_bytes.unwrap_or(0)),
                self.total_bytes
                    .map(metrics::bytes_string)
                    .unwrap_or_else(|| "?".to_string()),
                metrics::speed_string(self.speed_bytes_per_sec),
                metrics::eta_string(self.eta_seconds),
            ),
            MediaStatus::Downloaded => "Downloaded".to_string(),
            MediaStatus::Failed => format!(
                "Failed - {}",
                self.error.as_deref().unwrap_or("Unknown error")
            ),
        }
    }
}

/// Where a state update originated
///
/// Controller updates are authoritative for the duration of a session; record
/// refreshes go through the reconciler and may be deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    /// Emitted by a download session transition
    Controller,
    /// Result of applying a refreshed message record flag
    RecordRefresh,
}

/// Callback type for state change notifications
pub type StateCallback = Arc<dyn Fn(&MediaItemKey, &MediaDownloadState, UpdateOrigin) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_from_downloaded_flag() {
        let state = MediaDownloadState::from_flag(&MediaFlag::downloaded("media/photos/42.jpg"));
        assert_eq!(state.status, MediaStatus::Downloaded);
        assert_eq!(state.progress_percent, 100.0);
        assert_eq!(state.resolved_url.as_deref(), Some("media/photos/42.jpg"));
        assert!(state.is_terminal());
    }

    #[test]
    fn test_seed_from_missing_flag() {
        let state = MediaDownloadState::from_flag(&MediaFlag::missing());
        assert_eq!(state.status, MediaStatus::NotDownloaded);
        assert_eq!(state.progress_percent, 0.0);
        assert!(state.resolved_url.is_none());
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_key_display() {
        let key = MediaItemKey::new(17, 20488);
        assert_eq!(key.to_string(), "17/20488");
    }

    #[test]
    fn test_failed_display_includes_message() {
        let mut state = MediaDownloadState::not_downloaded();
        state.status = MediaStatus::Failed;
        state.error = Some("engine out of disk".to_string());
        assert!(state.display_string().contains("engine out of disk"));
    }
}
