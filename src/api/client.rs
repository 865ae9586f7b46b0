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


//! HTTP client for the download service
//!
//! Controllers talk to the engine through the `DownloadService` trait so
//! tests can substitute a scripted implementation; `HttpDownloadService` is
//! the real one, a thin wrapper over a shared `reqwest::Client` with a
//! per-request timeout.
//!
//! Error mapping: failures while initiating a download become
//! `RequestFailed`, failures while checking one become `PollFailed`, both
//! carrying the HTTP status when the service answered at all. Malformed
//! payloads are reported the same way; they never leave this module as data.

use crate::api::types::{CancelDownloadResponse, DownloadStatusResponse, StartDownloadResponse};
use crate::config::DownloadConfig;
use crate::download::state::MediaItemKey;
use crate::error::{Result, VaultError};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Boundary to the backend download engine
#[async_trait::async_trait]
pub trait DownloadService: Send + Sync {
    /// Ask the engine to materialize the file for one message
    async fn request_download(&self, key: &MediaItemKey) -> Result<StartDownloadResponse>;

    /// Check the engine's progress on one message
    async fn download_status(&self, key: &MediaItemKey) -> Result<DownloadStatusResponse>;

    /// Ask the engine to abort its fetch for one message
    async fn cancel_download(&self, key: &MediaItemKey) -> Result<CancelDownloadResponse>;
}

pub type SharedDownloadService = Arc<dyn DownloadService>;

/// reqwest-backed implementation of `DownloadService`
pub struct HttpDownloadService {
    client: Client,
    base: String,
}

impl HttpDownloadService {
    /// Create a client for the configured service base
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(VaultError::ReqwestError)?;

        Ok(Self {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, route: &str, key: &MediaItemKey) -> String {
        format!("{}/{}/{}", self.base, route, key.message_id)
    }

    /// Decode a response body, folding transport and shape errors into one
    /// lifecycle error built by `make_err`
    async fn decode<T, F>(response: Response, make_err: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(String, Option<u16>) -> VaultError,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(make_err(
                format!("service answered HTTP {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let code = status.as_u16();
        response
            .json::<T>()
            .await
            .map_err(|e| make_err(format!("unexpected payload: {}", e), Some(code)))
    }
}

#[async_trait::async_trait]
impl DownloadService for HttpDownloadService {
    async fn request_download(&self, key: &MediaItemKey) -> Result<StartDownloadResponse> {
        let url = self.endpoint("download", key);
        log::debug!("requesting download for {} via {}", key, url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| VaultError::request_failed(e.to_string(), None))?;

        Self::decode(response, |message, code| {
            VaultError::request_failed(message, code)
        })
        .await
    }

    async fn download_status(&self, key: &MediaItemKey) -> Result<DownloadStatusResponse> {
        let url = self.endpoint("download-status", key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VaultError::poll_failed(e.to_string(), None))?;

        Self::decode(response, |message, code| {
            VaultError::poll_failed(message, code)
        })
        .await
    }

    async fn cancel_download(&self, key: &MediaItemKey) -> Result<CancelDownloadResponse> {
        let url = self.endpoint("cancel-download", key);
        log::debug!("cancelling download for {} via {}", key, url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| VaultError::request_failed(e.to_string(), None))?;

        Self::decode(response, |message, code| {
            VaultError::request_failed(message, code)
        })
        .await
    }
}
