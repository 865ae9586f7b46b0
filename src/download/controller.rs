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


//! Per-item download lifecycle controller
//!
//! One controller per visible media attachment. It owns the item's state
//! machine (NotDownloaded -> Downloading -> Downloaded/Failed), the polling
//! session against the download service, and the start/cancel operations the
//! console exposes.
//!
//! # Sessions
//! Every `start()` opens a session identified by a fresh token. The session
//! task carries its token and re-checks it under the state lock before
//! applying anything, so a response that arrives after cancellation or after
//! a terminal transition is provably inert. `cancel()` and `detach()` abort
//! the task as well; the token check is what makes already-in-flight
//! responses harmless.
//!
//! # Timeout
//! Each session has a wall-clock budget independent of the poll cadence.
//! Expiry forces a Failed transition even when every individual poll is
//! answering happily with "downloading".
//!
//! # Record flags
//! Refreshed message records enter through `sync_record_flag`, which applies
//! the reconciler's merge policy: never while Downloading, deferred to the
//! session's end instead.

use crate::api::client::SharedDownloadService;
use crate::api::types::{DownloadStatusResponse, StartDownloadResponse};
use crate::config::DownloadConfig;
use crate::download::metrics::{self, ProgressSample};
use crate::download::reconcile::{self, ReconcileOutcome};
use crate::download::state::{
    MediaDownloadState, MediaFlag, MediaItemKey, MediaStatus, StateCallback, UpdateOrigin,
};
use crate::error::VaultError;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Handle to the task of one download session
struct ActiveSession {
    token: Uuid,
    cancel_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct ControllerInner {
    state: MediaDownloadState,
    session: Option<ActiveSession>,
    /// Record flag held back while a session is in flight
    deferred_flag: Option<MediaFlag>,
}

/// Download lifecycle controller for one media item
pub struct DownloadController {
    key: MediaItemKey,
    service: SharedDownloadService,
    config: DownloadConfig,
    notify: StateCallback,
    inner: Arc<Mutex<ControllerInner>>,
}

impl DownloadController {
    /// Create a controller seeded from the message record's persisted flag
    pub fn new(
        key: MediaItemKey,
        flag: &MediaFlag,
        service: SharedDownloadService,
        config: DownloadConfig,
        notify: StateCallback,
    ) -> Self {
        Self {
            key,
            service,
            config,
            notify,
            inner: Arc::new(Mutex::new(ControllerInner {
                state: MediaDownloadState::from_flag(flag),
                session: None,
                deferred_flag: None,
            })),
        }
    }

    pub fn key(&self) -> MediaItemKey {
        self.key
    }

    /// Current state snapshot
    pub fn state(&self) -> MediaDownloadState {
        self.lock().state.clone()
    }

    /// Start a download session. Must be called within a tokio runtime.
    ///
    /// Idempotent: while a session is in flight this does nothing, so a
    /// double-clicked button never produces a second polling loop. A no-op
    /// as well once the file is Downloaded.
    pub fn start(&self) {
        let started;
        {
            let mut inner = self.lock();
            match inner.state.status {
                MediaStatus::Downloading => {
                    log::debug!("start for {} ignored, session already active", self.key);
                    return;
                }
                MediaStatus::Downloaded => {
                    log::debug!("start for {} ignored, already on disk", self.key);
                    return;
                }
                MediaStatus::NotDownloaded | MediaStatus::Failed => {}
            }

            let token = Uuid::new_v4();
            inner.state = MediaDownloadState {
                status: MediaStatus::Downloading,
                ..MediaDownloadState::not_downloaded()
            };

            let (cancel_tx, cancel_rx) = oneshot::channel();
            let handle = tokio::spawn(Self::run_session(
                self.key,
                token,
                Arc::clone(&self.service),
                self.config.clone(),
                Arc::clone(&self.inner),
                Arc::clone(&self.notify),
                cancel_rx,
            ));
            inner.session = Some(ActiveSession {
                token,
                cancel_tx,
                handle,
            });

            started = inner.state.clone();
        }

        log::info!("download session started for {}", self.key);
        (self.notify)(&self.key, &started, UpdateOrigin::Controller);
    }

    /// Cancel the active session and reset to NotDownloaded
    ///
    /// The local reset is unconditional and immediate; the backend is told to
    /// abort afterwards, best-effort, and its answer changes nothing here.
    pub fn cancel(&self) {
        let mut emissions: Vec<(MediaDownloadState, UpdateOrigin)> = Vec::new();
        {
            let mut inner = self.lock();
            if inner.state.status != MediaStatus::Downloading {
                return;
            }

            if let Some(session) = inner.session.take() {
                let _ = session.cancel_tx.send(());
                session.handle.abort();
            }

            inner.state = MediaDownloadState::not_downloaded();
            emissions.push((inner.state.clone(), UpdateOrigin::Controller));

            if let Some(flag) = inner.deferred_flag.take() {
                if let Some(settled) = reconcile::resolve_deferred(&inner.state, &flag) {
                    inner.state = settled;
                    emissions.push((inner.state.clone(), UpdateOrigin::RecordRefresh));
                }
            }
        }

        log::info!("download for {} cancelled", self.key);
        for (state, origin) in &emissions {
            (self.notify)(&self.key, state, *origin);
        }

        let service = Arc::clone(&self.service);
        let key = self.key;
        tokio::spawn(async move {
            match service.cancel_download(&key).await {
                Ok(response) if !response.is_cancelled() => {
                    log::warn!("backend answered '{}' to cancel for {}", response.status, key);
                }
                Ok(_) => {}
                Err(e) => log::warn!("backend cancel for {} failed: {}", key, e),
            }
        });
    }

    /// Merge a refreshed record flag from the surrounding list
    pub fn sync_record_flag(&self, flag: MediaFlag) {
        let update;
        {
            let mut inner = self.lock();
            match reconcile::reconcile(&inner.state, &flag) {
                ReconcileOutcome::Defer => {
                    log::debug!("record flag for {} deferred, session active", self.key);
                    inner.deferred_flag = Some(flag);
                    return;
                }
                ReconcileOutcome::Unchanged => return,
                ReconcileOutcome::Apply(state) => {
                    inner.state = state;
                    update = inner.state.clone();
                }
            }
        }

        (self.notify)(&self.key, &update, UpdateOrigin::RecordRefresh);
    }

    /// Stop polling because the item left the mounted set
    ///
    /// Local teardown only: no backend abort, no state transition, no
    /// notification. The engine keeps fetching; a remount will pick the
    /// result up from the record flag. Returns the session task's handle so
    /// a caller that wants to wait for the wind-down can.
    pub fn detach(&self) -> Option<JoinHandle<()>> {
        let session = self.lock().session.take();
        session.map(|session| {
            let _ = session.cancel_tx.send(());
            session.handle.abort();
            log::debug!("controller for {} detached with session active", self.key);
            session.handle
        })
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Session task
    // ========================================================================

    async fn run_session(
        key: MediaItemKey,
        token: Uuid,
        service: SharedDownloadService,
        config: DownloadConfig,
        inner: Arc<Mutex<ControllerInner>>,
        notify: StateCallback,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let deadline = tokio::time::Instant::now() + config.session_timeout;

        let request = tokio::select! {
            _ = &mut cancel_rx => return,
            result = service.request_download(&key) => result,
        };

        match request {
            Ok(StartDownloadResponse::AlreadyDownloaded { download_url }) => {
                // Materialized before we ever asked; skip polling entirely
                Self::settle(
                    &inner,
                    &notify,
                    key,
                    token,
                    MediaDownloadState::downloaded(Some(download_url)),
                );
                return;
            }
            Ok(StartDownloadResponse::DownloadStarted) => {}
            Err(e) => {
                Self::settle_failed(&inner, &notify, key, token, e);
                return;
            }
        }

        let mut interval = tokio::time::interval(config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut prev_sample: Option<ProgressSample> = None;
        let mut transient_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = &mut cancel_rx => return,
                _ = tokio::time::sleep_until(deadline) => {
                    Self::settle_failed(
                        &inner,
                        &notify,
                        key,
                        token,
                        VaultError::Timeout(config.session_timeout.as_secs()),
                    );
                    return;
                }
                _ = interval.tick() => {}
            }

            let poll = tokio::select! {
                _ = &mut cancel_rx => return,
                _ = tokio::time::sleep_until(deadline) => {
                    Self::settle_failed(
                        &inner,
                        &notify,
                        key,
                        token,
                        VaultError::Timeout(config.session_timeout.as_secs()),
                    );
                    return;
                }
                result = service.download_status(&key) => result,
            };

            match poll {
                Ok(DownloadStatusResponse::Downloading {
                    progress,
                    downloaded_size,
                    total_size,
                    download_speed,
                    estimated_time_remaining,
                }) => {
                    transient_failures = 0;

                    let now = Utc::now();
                    let sample = downloaded_size.map(|bytes| ProgressSample::new(bytes, now));
                    let estimate = match &sample {
                        Some(s) => metrics::estimate_with_report(
                            download_speed,
                            estimated_time_remaining,
                            prev_sample.as_ref(),
                            s,
                            total_size,
                        ),
                        None => metrics::estimate_with_report(
                            download_speed,
                            estimated_time_remaining,
                            None,
                            &ProgressSample::new(0, now),
                            None,
                        ),
                    };

                    let applied = Self::apply_progress(&inner, &notify, key, token, |state| {
                        let pct = progress.clamp(0.0, 100.0);
                        if pct > state.progress_percent {
                            state.progress_percent = pct;
                        }
                        if let Some(bytes) = downloaded_size {
                            let floor = state.downloaded_bytes.unwrap_or(0);
                            state.downloaded_bytes = Some(bytes.max(floor));
                        }
                        if total_size.is_some() {
                            state.total_bytes = total_size;
                        }
                        state.speed_bytes_per_sec = estimate.speed_bytes_per_sec;
                        state.eta_seconds = estimate.eta_seconds;
                        state.last_sample_at = Some(now);
                    });
                    if !applied {
                        return;
                    }

                    if sample.is_some() {
                        prev_sample = sample;
                    }
                }
                Ok(DownloadStatusResponse::Downloaded {
                    download_url,
                    file_size,
                }) => {
                    let mut done = MediaDownloadState::downloaded(Some(download_url));
                    done.downloaded_bytes = file_size;
                    done.total_bytes = file_size;
                    Self::settle(&inner, &notify, key, token, done);
                    return;
                }
                Ok(DownloadStatusResponse::DownloadFailed { error }) => {
                    let reason = error.unwrap_or_else(|| "no reason reported".to_string());
                    Self::settle_failed(
                        &inner,
                        &notify,
                        key,
                        token,
                        VaultError::RemoteFailure(reason),
                    );
                    return;
                }
                Err(e) => {
                    transient_failures += 1;
                    if transient_failures > config.poll_retry_limit {
                        Self::settle_failed(&inner, &notify, key, token, e);
                        return;
                    }

                    // Exponential backoff between retries, still under the
                    // session deadline and still cancellable
                    let backoff =
                        Duration::from_secs(2u64.pow(transient_failures.min(5)));
                    log::warn!(
                        "poll {}/{} for {} failed ({}), retrying in {:?}",
                        transient_failures,
                        config.poll_retry_limit,
                        key,
                        e,
                        backoff
                    );
                    tokio::select! {
                        _ = &mut cancel_rx => return,
                        _ = tokio::time::sleep_until(deadline) => {
                            Self::settle_failed(
                                &inner,
                                &notify,
                                key,
                                token,
                                VaultError::Timeout(config.session_timeout.as_secs()),
                            );
                            return;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }

    /// Mutate the Downloading state under the session guard
    ///
    /// Returns false when the session is no longer the live one; the caller
    /// must stop polling.
    fn apply_progress<F>(
        inner: &Arc<Mutex<ControllerInner>>,
        notify: &StateCallback,
        key: MediaItemKey,
        token: Uuid,
        mutate: F,
    ) -> bool
    where
        F: FnOnce(&mut MediaDownloadState),
    {
        let update;
        {
            let mut guard = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let live = matches!(&guard.session, Some(s) if s.token == token)
                && guard.state.status == MediaStatus::Downloading;
            if !live {
                log::debug!("discarding stale poll response for {}", key);
                return false;
            }
            mutate(&mut guard.state);
            update = guard.state.clone();
        }
        notify(&key, &update, UpdateOrigin::Controller);
        true
    }

    /// Terminal transition: apply, close the session, settle deferred flags
    fn settle(
        inner: &Arc<Mutex<ControllerInner>>,
        notify: &StateCallback,
        key: MediaItemKey,
        token: Uuid,
        terminal: MediaDownloadState,
    ) {
        let mut emissions: Vec<(MediaDownloadState, UpdateOrigin)> = Vec::new();
        {
            let mut guard = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let live = matches!(&guard.session, Some(s) if s.token == token);
            if !live {
                log::debug!("discarding stale terminal transition for {}", key);
                return;
            }
            guard.session = None;
            guard.state = terminal;
            emissions.push((guard.state.clone(), UpdateOrigin::Controller));

            if let Some(flag) = guard.deferred_flag.take() {
                if let Some(settled) = reconcile::resolve_deferred(&guard.state, &flag) {
                    guard.state = settled;
                    emissions.push((guard.state.clone(), UpdateOrigin::RecordRefresh));
                }
            }
        }

        for (state, origin) in &emissions {
            notify(&key, state, *origin);
        }
    }

    fn settle_failed(
        inner: &Arc<Mutex<ControllerInner>>,
        notify: &StateCallback,
        key: MediaItemKey,
        token: Uuid,
        error: VaultError,
    ) {
        log::warn!("download for {} failed: {}", key, error);
        let mut failed = MediaDownloadState::not_downloaded();
        failed.status = MediaStatus::Failed;
        failed.error = Some(error.user_message());
        Self::settle(inner, notify, key, token, failed);
    }
}

impl Drop for DownloadController {
    fn drop(&mut self) {
        // A dropped controller must not leave a polling task behind
        drop(self.detach());
    }
}
