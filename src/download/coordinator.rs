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


//! Coordinator for the visible media list
//!
//! Owns one `DownloadController` per mounted item plus the state map the
//! console renders from. The same map backs the full-screen gallery, so a
//! file fetched from a compact thumbnail is immediately viewable full-screen
//! without a second download.
//!
//! Mounting is idempotent: the surrounding list calls `mount` for every
//! visible item on every re-render, and for an already-mounted item that call
//! is exactly the record-refresh path the reconciler guards.

use crate::api::client::{HttpDownloadService, SharedDownloadService};
use crate::config::DownloadConfig;
use crate::download::controller::DownloadController;
use crate::download::state::{
    MediaDownloadState, MediaFlag, MediaItemKey, StateCallback, UpdateOrigin,
};
use crate::error::{Result, VaultError};
use crate::media::paths::resolve_media_url;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Owns the per-item controllers and the renderable state map
pub struct MediaListCoordinator {
    service: SharedDownloadService,
    config: DownloadConfig,
    api_origin: String,
    controllers: Mutex<HashMap<MediaItemKey, Arc<DownloadController>>>,
    states: Arc<Mutex<HashMap<MediaItemKey, MediaDownloadState>>>,
    subscribers: Arc<Mutex<Vec<StateCallback>>>,
}

impl MediaListCoordinator {
    /// Create a coordinator over an explicit service implementation
    pub fn new(service: SharedDownloadService, config: DownloadConfig) -> Result<Self> {
        config.validate()?;
        let api_origin = config.api_origin();

        Ok(Self {
            service,
            config,
            api_origin,
            controllers: Mutex::new(HashMap::new()),
            states: Arc::new(Mutex::new(HashMap::new())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Create a coordinator talking HTTP to the configured service base
    pub fn over_http(config: DownloadConfig) -> Result<Self> {
        let service = Arc::new(HttpDownloadService::new(&config)?);
        Self::new(service, config)
    }

    /// Register a callback fired on every state change of any mounted item
    pub fn subscribe(&self, callback: StateCallback) {
        self.lock_subscribers().push(callback);
    }

    /// Mount a visible item, or deliver a refreshed record flag to one that
    /// is already mounted
    pub fn mount(&self, key: MediaItemKey, flag: &MediaFlag) {
        let existing = self.lock_controllers().get(&key).cloned();
        if let Some(controller) = existing {
            controller.sync_record_flag(flag.clone());
            return;
        }

        let controller = Arc::new(DownloadController::new(
            key,
            flag,
            Arc::clone(&self.service),
            self.config.clone(),
            self.make_notify(),
        ));

        // Seed the state slot before the controller can emit anything;
        // notifications only update slots that exist
        self.lock_states().insert(key, controller.state());
        self.lock_controllers().insert(key, controller);
        log::debug!("mounted media item {}", key);
    }

    /// Drop an item that scrolled out of the mounted set
    ///
    /// Any active polling stops; its state snapshot is discarded with it.
    pub fn unmount(&self, key: &MediaItemKey) {
        let controller = self.lock_controllers().remove(key);
        if let Some(controller) = controller {
            drop(controller.detach());
            self.lock_states().remove(key);
            log::debug!("unmounted media item {}", key);
        }
    }

    /// Start a download for a mounted item
    pub fn start(&self, key: &MediaItemKey) -> Result<()> {
        self.controller(key)?.start();
        Ok(())
    }

    /// Cancel the download of a mounted item
    pub fn cancel(&self, key: &MediaItemKey) -> Result<()> {
        self.controller(key)?.cancel();
        Ok(())
    }

    /// Current state of one mounted item
    pub fn state_of(&self, key: &MediaItemKey) -> Option<MediaDownloadState> {
        self.lock_states().get(key).cloned()
    }

    /// Snapshot of every mounted item, for list rendering and the gallery
    pub fn snapshot(&self) -> HashMap<MediaItemKey, MediaDownloadState> {
        self.lock_states().clone()
    }

    /// Absolute fetchable URL for a mounted item, when one exists
    pub fn resolved_url(&self, key: &MediaItemKey) -> Option<String> {
        self.state_of(key)
            .and_then(|state| state.resolved_url)
            .map(|raw| resolve_media_url(&raw, &self.api_origin))
    }

    /// Number of currently mounted items
    pub fn mounted_count(&self) -> usize {
        self.lock_controllers().len()
    }

    /// Detach every controller and wait for their session tasks to wind down
    pub async fn shutdown(&self) {
        let controllers: Vec<Arc<DownloadController>> = {
            let mut map = self.lock_controllers();
            map.drain().map(|(_, c)| c).collect()
        };
        self.lock_states().clear();

        let handles: Vec<_> = controllers
            .iter()
            .filter_map(|controller| controller.detach())
            .collect();
        let _ = futures_util::future::join_all(handles).await;
        log::debug!("coordinator shut down, {} controllers detached", controllers.len());
    }

    fn controller(&self, key: &MediaItemKey) -> Result<Arc<DownloadController>> {
        self.lock_controllers()
            .get(key)
            .cloned()
            .ok_or_else(|| VaultError::InvalidState(format!("item {} is not mounted", key)))
    }

    /// Callback handed to every controller: update the shared map, fan out
    fn make_notify(&self) -> StateCallback {
        let states = Arc::clone(&self.states);
        let subscribers = Arc::clone(&self.subscribers);

        Arc::new(move |key: &MediaItemKey, state: &MediaDownloadState, origin: UpdateOrigin| {
            {
                let mut map = states.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                // An emission racing an unmount finds no slot and is dropped
                if let Some(slot) = map.get_mut(key) {
                    *slot = state.clone();
                } else {
                    return;
                }
            }

            let callbacks: Vec<StateCallback> = subscribers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone();
            for callback in &callbacks {
                callback(key, state, origin);
            }
        })
    }

    fn lock_controllers(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<MediaItemKey, Arc<DownloadController>>> {
        self.controllers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<MediaItemKey, MediaDownloadState>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<StateCallback>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{
        CancelDownloadResponse, DownloadStatusResponse, StartDownloadResponse,
    };
    use crate::api::client::DownloadService;
    use crate::download::state::MediaStatus;

    /// Service stub for tests that never reach the network
    struct UnreachableService;

    #[async_trait::async_trait]
    impl DownloadService for UnreachableService {
        async fn request_download(&self, _key: &MediaItemKey) -> crate::Result<StartDownloadResponse> {
            Err(VaultError::request_failed("test stub", None))
        }

        async fn download_status(&self, _key: &MediaItemKey) -> crate::Result<DownloadStatusResponse> {
            Err(VaultError::poll_failed("test stub", None))
        }

        async fn cancel_download(&self, _key: &MediaItemKey) -> crate::Result<CancelDownloadResponse> {
            Err(VaultError::request_failed("test stub", None))
        }
    }

    fn coordinator() -> MediaListCoordinator {
        let config = DownloadConfig::new("http://127.0.0.1:8900");
        MediaListCoordinator::new(Arc::new(UnreachableService), config).unwrap()
    }

    #[test]
    fn test_mount_seeds_from_record_flag() {
        let coordinator = coordinator();
        let key = MediaItemKey::new(1, 100);

        coordinator.mount(key, &MediaFlag::downloaded("media/x.jpg"));

        let state = coordinator.state_of(&key).unwrap();
        assert_eq!(state.status, MediaStatus::Downloaded);
        assert_eq!(coordinator.mounted_count(), 1);
    }

    #[test]
    fn test_remount_delivers_refreshed_flag() {
        let coordinator = coordinator();
        let key = MediaItemKey::new(1, 100);

        coordinator.mount(key, &MediaFlag::missing());
        assert_eq!(
            coordinator.state_of(&key).unwrap().status,
            MediaStatus::NotDownloaded
        );

        // the list re-rendered after the file landed through another path
        coordinator.mount(key, &MediaFlag::downloaded("media/x.jpg"));
        assert_eq!(
            coordinator.state_of(&key).unwrap().status,
            MediaStatus::Downloaded
        );
        assert_eq!(coordinator.mounted_count(), 1);
    }

    #[test]
    fn test_unmount_drops_state() {
        let coordinator = coordinator();
        let key = MediaItemKey::new(1, 100);

        coordinator.mount(key, &MediaFlag::missing());
        coordinator.unmount(&key);

        assert!(coordinator.state_of(&key).is_none());
        assert_eq!(coordinator.mounted_count(), 0);
        assert!(coordinator.snapshot().is_empty());
    }

    #[test]
    fn test_resolved_url_goes_through_path_resolution() {
        let coordinator = coordinator();
        let key = MediaItemKey::new(1, 100);

        coordinator.mount(key, &MediaFlag::downloaded("media/photos/42.jpg"));
        assert_eq!(
            coordinator.resolved_url(&key).as_deref(),
            Some("/media/photos/42.jpg")
        );

        let bare = MediaItemKey::new(1, 101);
        coordinator.mount(bare, &MediaFlag::missing());
        assert_eq!(coordinator.resolved_url(&bare), None);
    }

    #[test]
    fn test_commands_require_a_mounted_item() {
        let coordinator = coordinator();
        let key = MediaItemKey::new(9, 999);

        assert!(coordinator.start(&key).is_err());
        assert!(coordinator.cancel(&key).is_err());
    }
}
