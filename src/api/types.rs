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


//! Wire payloads of the download service
//!
//! Every response is a tagged union keyed by its `status` field and validated
//! at the network boundary: a payload that does not match one of the known
//! shapes fails deserialization in the client instead of flowing through the
//! controllers as untyped data.

use serde::{Deserialize, Serialize};

/// Answer to `POST /download/{message_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartDownloadResponse {
    /// The engine already holds the file; nothing was started
    AlreadyDownloaded { download_url: String },
    /// The engine accepted the request and is fetching
    DownloadStarted,
}

/// Answer to `GET /download-status/{message_id}`
///
/// The size and metrics fields of a `downloading` answer are all optional:
/// the engine reports them once its own fetch has learned them, which for a
/// slow source can be several polls in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadStatusResponse {
    Downloading {
        /// Percent complete, 0-100
        progress: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        downloaded_size: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_size: Option<u64>,
        /// Engine-side throughput in bytes per second, when it tracks one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_speed: Option<f64>,
        /// Engine-side ETA in seconds, when it tracks one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        estimated_time_remaining: Option<u64>,
    },
    Downloaded {
        download_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_size: Option<u64>,
    },
    DownloadFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Answer to `POST /cancel-download/{message_id}`
///
/// The engine answers a bare status word; anything other than "cancelled"
/// means it declined or had nothing to abort. The controller honors the
/// cancellation locally either way, so this stays a passthrough rather than
/// an enum of engine moods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelDownloadResponse {
    pub status: String,
}

impl CancelDownloadResponse {
    pub fn is_cancelled(&self) -> bool {
        self.status == "cancelled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downloading_payload_with_sparse_fields() {
        // early polls carry only the status and a progress guess
        let response: DownloadStatusResponse =
            serde_json::from_str(r#"{"status": "downloading", "progress": 0.0}"#).unwrap();

        match response {
            DownloadStatusResponse::Downloading {
                progress,
                downloaded_size,
                total_size,
                download_speed,
                estimated_time_remaining,
            } => {
                assert_eq!(progress, 0.0);
                assert_eq!(downloaded_size, None);
                assert_eq!(total_size, None);
                assert_eq!(download_speed, None);
                assert_eq!(estimated_time_remaining, None);
            }
            other => panic!("expected Downloading, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status_tag_is_rejected() {
        let result = serde_json::from_str::<DownloadStatusResponse>(
            r#"{"status": "paused", "progress": 10.0}"#,
        );
        assert!(result.is_err());

        let result =
            serde_json::from_str::<StartDownloadResponse>(r#"{"status": "queued"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_cancel_answer_classification() {
        let cancelled = CancelDownloadResponse {
            status: "cancelled".to_string(),
        };
        assert!(cancelled.is_cancelled());

        let declined: CancelDownloadResponse =
            serde_json::from_str(r#"{"status": "not_active"}"#).unwrap();
        assert!(!declined.is_cancelled());
    }
}
