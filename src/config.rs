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


//! Download lifecycle configuration
//!
//! One `DownloadConfig` is shared by every controller a coordinator owns.
//! The polling cadence and the wall-clock session budget are deliberately
//! independent knobs: a slow poll interval must not extend how long a stuck
//! download is allowed to occupy the screen.

use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Configuration for media download controllers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base origin of the download service (e.g. "http://127.0.0.1:8900")
    pub api_base: String,

    /// Fixed interval between status polls
    pub poll_interval: Duration,

    /// Wall-clock budget per download session; expiry fails the download
    /// even if the poller itself is healthy
    pub session_timeout: Duration,

    /// How many consecutive transient poll failures to absorb before the
    /// session fails. 0 means fail-fast on the first transport error.
    pub poll_retry_limit: u32,

    /// Per-request timeout for the HTTP client
    pub request_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8900".to_string(),
            poll_interval: Duration::from_secs(1),
            session_timeout: Duration::from_secs(60),
            poll_retry_limit: 0,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl DownloadConfig {
    /// Create a config for the given service base, keeping default timings
    pub fn new<S: Into<String>>(api_base: S) -> Self {
        Self {
            api_base: api_base.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_base).map_err(|e| {
            VaultError::InvalidConfiguration(format!("api_base is not a URL: {}", e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(VaultError::InvalidConfiguration(format!(
                "api_base must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(VaultError::InvalidConfiguration(
                "poll_interval must be non-zero".to_string(),
            ));
        }

        if self.session_timeout < self.poll_interval {
            return Err(VaultError::InvalidConfiguration(
                "session_timeout must be at least one poll_interval".to_string(),
            ));
        }

        Ok(())
    }

    /// Origin of the service base ("scheme://host:port", no trailing slash)
    ///
    /// Used when resolving stored media paths that are absolute but outside
    /// the media mount.
    pub fn api_origin(&self) -> String {
        match Url::parse(&self.api_base) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.api_base.trim_end_matches('/').to_string(),
        }
    }
}
